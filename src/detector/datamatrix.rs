/// Data Matrix detection over connected dark regions
///
/// The solid L of a symbol connects its top-left, bottom-left and
/// bottom-right corners, so the region containing it spans the whole
/// symbol. Each large enough region is tested against every symbol size
/// in all four orientations by sampling the expected finder and timing
/// modules along its border.
use log::debug;

use super::suppress_overlaps;
use crate::config::DecodeOptions;
use crate::decoder::datamatrix::tables::{SYMBOL_SIZES, SymbolSize};
use crate::models::{BitMatrix, Candidate, Point, Quad, SymbologyFamily};
use crate::utils::geometry::PerspectiveTransform;

/// Smallest region side worth testing (8 modules of 1.5 px)
const MIN_REGION_SIDE: usize = 12;

/// Largest side ratio of a region (16x48 and 8x32 are the flattest sizes)
const MAX_ASPECT: f32 = 4.5;

/// Largest fraction of border modules allowed to disagree
const MAX_BORDER_MISMATCH: f32 = 0.08;

/// Smallest module size in pixels that sampling can resolve
const MIN_MODULE_SIZE: f32 = 1.5;

/// Overlap above which two candidates are the same symbol
const CANDIDATE_OVERLAP: f32 = 0.2;

/// Union-Find over provisional labels
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        // Label 0 is background
        Self { parent: vec![0] }
    }

    pub fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x.max(root_y) as usize] = root_x.min(root_y);
        }
    }
}

/// Extent of one 8-connected dark region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    pub pixels: usize,
    /// Extreme pixels along the diagonals: min x+y, max x-y, max x+y, min x-y
    extremes: [(usize, usize); 4],
    /// Topmost, rightmost, bottommost and leftmost pixels
    axis_extremes: [(usize, usize); 4],
}

impl Region {
    fn new(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixels: 0,
            extremes: [(x, y); 4],
            axis_extremes: [(x, y); 4],
        }
    }

    fn add(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixels += 1;

        let sum = |p: (usize, usize)| p.0 + p.1;
        let diff = |p: (usize, usize)| p.0 as isize - p.1 as isize;
        if x + y < sum(self.extremes[0]) {
            self.extremes[0] = (x, y);
        }
        if diff((x, y)) > diff(self.extremes[1]) {
            self.extremes[1] = (x, y);
        }
        if x + y > sum(self.extremes[2]) {
            self.extremes[2] = (x, y);
        }
        if diff((x, y)) < diff(self.extremes[3]) {
            self.extremes[3] = (x, y);
        }

        let [top, right, bottom, left] = &mut self.axis_extremes;
        if y < top.1 {
            *top = (x, y);
        }
        if x > right.0 {
            *right = (x, y);
        }
        if y > bottom.1 {
            *bottom = (x, y);
        }
        if x < left.0 {
            *left = (x, y);
        }
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Axis-aligned outline of the region
    fn bounding_quad(&self) -> Quad {
        Quad::from_rect(
            self.min_x as f32,
            self.min_y as f32,
            (self.max_x + 1) as f32,
            (self.max_y + 1) as f32,
        )
    }

    /// Outline through the diagonal extremes, for rotated symbols
    fn extreme_quad(&self) -> Quad {
        let [tl, tr, br, bl] = self.extremes;
        Quad::new(
            Point::new(tl.0 as f32, tl.1 as f32),
            Point::new((tr.0 + 1) as f32, tr.1 as f32),
            Point::new((br.0 + 1) as f32, (br.1 + 1) as f32),
            Point::new(bl.0 as f32, (bl.1 + 1) as f32),
        )
    }

    /// Outline through the axis extremes, for symbols turned near 45 degrees
    ///
    /// Diagonal extremes tie along whole edges of a diamond; the topmost,
    /// rightmost, bottommost and leftmost pixels are its corners.
    fn axis_quad(&self) -> Quad {
        let [top, right, bottom, left] = self.axis_extremes;
        Quad::new(
            Point::new(top.0 as f32 + 0.5, top.1 as f32),
            Point::new((right.0 + 1) as f32, right.1 as f32 + 0.5),
            Point::new(bottom.0 as f32 + 0.5, (bottom.1 + 1) as f32),
            Point::new(left.0 as f32, left.1 as f32 + 0.5),
        )
    }
}

/// Find 8-connected dark regions
pub fn find_dark_regions(matrix: &BitMatrix) -> Vec<Region> {
    let width = matrix.width();
    let height = matrix.height();
    let mut labels = vec![0u32; width * height];
    let mut uf = UnionFind::new();

    // First pass: provisional labels
    for y in 0..height {
        for x in 0..width {
            if !matrix.get(x, y) {
                continue;
            }
            let mut neighbors = [0u32; 4];
            if x > 0 {
                neighbors[0] = labels[y * width + x - 1];
            }
            if y > 0 {
                neighbors[1] = labels[(y - 1) * width + x];
                if x > 0 {
                    neighbors[2] = labels[(y - 1) * width + x - 1];
                }
                if x + 1 < width {
                    neighbors[3] = labels[(y - 1) * width + x + 1];
                }
            }
            let label = match neighbors.iter().copied().filter(|&l| l != 0).min() {
                Some(min_label) => {
                    for &l in neighbors.iter().filter(|&&l| l != 0 && l != min_label) {
                        uf.union(min_label, l);
                    }
                    min_label
                }
                None => uf.make_set(),
            };
            labels[y * width + x] = label;
        }
    }

    // Second pass: accumulate extents per root
    let mut slots: Vec<Option<usize>> = vec![None; uf.parent.len()];
    let mut regions: Vec<Region> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            if label == 0 {
                continue;
            }
            let root = uf.find(label) as usize;
            let slot = *slots[root].get_or_insert_with(|| {
                regions.push(Region::new(x, y));
                regions.len() - 1
            });
            regions[slot].add(x, y);
        }
    }
    regions
}

/// Rotate quad corners so that corner `k` becomes the top-left
fn rotated(quad: &Quad, k: usize) -> Quad {
    let c = quad.corners;
    let tl = c[k % 4];
    let bl = c[(k + 3) % 4];
    let br = c[(k + 2) % 4];
    // The symbol's top-right module is light; place that corner from the other three
    let tr = Point::new(tl.x + br.x - bl.x, tl.y + br.y - bl.y);
    Quad::new(tl, tr, br, bl)
}

/// Fraction of border modules of `size` that disagree when sampled through `quad`
///
/// Stops early once the mismatch budget is exceeded.
fn border_mismatch(matrix: &BitMatrix, quad: &Quad, size: &SymbolSize) -> Option<f32> {
    let transform = PerspectiveTransform::grid_to_quad(size.cols as f32, size.rows as f32, quad)?;
    let (rows, cols) = (size.rows, size.cols);
    let total = 2 * (rows + cols);
    let budget = (total as f32 * MAX_BORDER_MISMATCH).floor() as usize;

    // Solid L first, then the timing edges
    let left = (0..rows).map(|r| (r, 0));
    let bottom = (0..cols).map(|c| (rows - 1, c));
    let top = (0..cols).map(|c| (0, c));
    let right = (0..rows).map(|r| (r, cols - 1));

    let mut mismatches = 0usize;
    for (row, col) in left.chain(bottom).chain(top).chain(right) {
        let expected = size.border_module(row, col).unwrap_or(false);
        let p = transform.transform(&Point::new(col as f32 + 0.5, row as f32 + 0.5));
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        if matrix.get_signed(p.x.floor() as i32, p.y.floor() as i32) != expected {
            mismatches += 1;
            if mismatches > budget {
                return None;
            }
        }
    }
    Some(mismatches as f32 / total as f32)
}

fn best_fit(matrix: &BitMatrix, region: &Region) -> Option<Candidate> {
    let mut best: Option<(f32, Candidate)> = None;
    for base in [region.bounding_quad(), region.extreme_quad(), region.axis_quad()] {
        for k in 0..4 {
            let quad = rotated(&base, k);
            let width = quad.top_left().distance(&quad.top_right());
            let height = quad.top_left().distance(&quad.bottom_left());
            if width < 1.0 || height < 1.0 {
                continue;
            }
            for size in &SYMBOL_SIZES {
                let module_w = width / size.cols as f32;
                let module_h = height / size.rows as f32;
                if module_w.min(module_h) < MIN_MODULE_SIZE {
                    continue;
                }
                // Module shape must stay roughly square
                if module_w.max(module_h) / module_w.min(module_h) > 1.3 {
                    continue;
                }
                let Some(mismatch) = border_mismatch(matrix, &quad, size) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(m, _)| mismatch < *m) {
                    best = Some((
                        mismatch,
                        Candidate {
                            family: SymbologyFamily::DataMatrix,
                            quad,
                            module_size: (module_w + module_h) / 2.0,
                            confidence: 1.0 - mismatch,
                            grid: Some((size.rows, size.cols)),
                        },
                    ));
                }
            }
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Locate Data Matrix candidates, best first
pub fn locate(matrix: &BitMatrix, _options: &DecodeOptions) -> Vec<Candidate> {
    let regions: Vec<Region> = find_dark_regions(matrix)
        .into_iter()
        .filter(|r| {
            let (w, h) = (r.width(), r.height());
            let aspect = w.max(h) as f32 / w.min(h) as f32;
            w.min(h) >= MIN_REGION_SIDE && aspect <= MAX_ASPECT
        })
        .collect();

    let mut candidates: Vec<Candidate> =
        regions.iter().filter_map(|r| best_fit(matrix, r)).collect();
    debug!(
        "datamatrix: {} regions, {} candidates",
        regions.len(),
        candidates.len()
    );
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suppress_overlaps(candidates, CANDIDATE_OVERLAP)
}
