//! Aztec bullseye detection
//!
//! Rows are scanned for nine equal dark/light runs centred on a dark run,
//! the innermost rings of the bullseye; a hit is confirmed along its column.
//! The light ring three modules out is enclosed by dark rings on both sides,
//! so a flood fill from it yields a square annulus whose moments give the
//! centre, module size and rotation at any angle. The orientation marks pick
//! the quarter turn and the mode message gives the symbol size.

use log::debug;

use super::suppress_overlaps;
use crate::config::DecodeOptions;
use crate::decoder::aztec::{AztecLayout, core_quality, read_mode_message};
use crate::models::{BitMatrix, Candidate, Point, Quad, SymbologyFamily};

/// Runs from the outer bullseye ring through the centre and out again
const BULLSEYE_RUNS: usize = 9;

/// Allowed deviation of a run from the mean run width
const RUN_TOLERANCE: f32 = 0.5;

/// Bullseye hits considered per image
const MAX_CENTRES: usize = 16;

/// Minimum fraction of core modules matching for a candidate
const MIN_CORE_QUALITY: f32 = 0.85;

/// Overlap above which two Aztec candidates cover the same symbol
const CANDIDATE_OVERLAP: f32 = 0.3;

/// A confirmed bullseye crossing
#[derive(Debug, Clone, Copy)]
struct BullseyeHit {
    x: f32,
    y: f32,
    module: f32,
    /// A pixel of the light ring three modules out
    seed: (usize, usize),
    count: u32,
}

/// Bullseye position and module axes in pixels
#[derive(Debug, Clone, Copy)]
struct Frame {
    center: Point,
    /// One module along the symbol's x axis
    ex: (f32, f32),
    /// One module along the symbol's y axis
    ey: (f32, f32),
}

impl Frame {
    fn new(center: Point, module: f32, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            center,
            ex: (module * cos, module * sin),
            ey: (-module * sin, module * cos),
        }
    }

    /// Pixel position of the point `(u, v)` modules from the centre
    fn at(&self, u: f32, v: f32) -> Point {
        Point::new(
            self.center.x + u * self.ex.0 + v * self.ey.0,
            self.center.y + u * self.ex.1 + v * self.ey.1,
        )
    }

    /// Same frame turned a quarter turn clockwise `turns` times
    fn turned(&self, turns: usize) -> Self {
        let mut frame = *self;
        for _ in 0..turns {
            frame = Self {
                center: frame.center,
                ex: frame.ey,
                ey: (-frame.ex.0, -frame.ex.1),
            };
        }
        frame
    }

    fn module(&self, matrix: &BitMatrix, dx: i32, dy: i32) -> bool {
        let p = self.at(dx as f32, dy as f32);
        matrix.get_signed(p.x.floor() as i32, p.y.floor() as i32)
    }
}

/// Runs of one row or column as `(start, length, dark)`
fn runs_along(matrix: &BitMatrix, horizontal: bool, line: usize) -> Vec<(usize, usize, bool)> {
    let len = if horizontal { matrix.width() } else { matrix.height() };
    let get = |i: usize| {
        if horizontal {
            matrix.get(i, line)
        } else {
            matrix.get(line, i)
        }
    };
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=len {
        if i == len || get(i) != get(start) {
            runs.push((start, i - start, get(start)));
            start = i;
        }
    }
    runs
}

/// Mean run width when `window` looks like the bullseye core
fn bullseye_module(window: &[(usize, usize, bool)]) -> Option<f32> {
    if window.len() != BULLSEYE_RUNS
        || window.iter().enumerate().any(|(i, r)| r.2 != (i % 2 == 0))
    {
        return None;
    }
    let mean = window.iter().map(|r| r.1).sum::<usize>() as f32 / BULLSEYE_RUNS as f32;
    let fits = window
        .iter()
        .all(|r| (r.1 as f32 - mean).abs() <= RUN_TOLERANCE * mean);
    fits.then_some(mean)
}

/// Column check through `x`: the run containing `y` must be the centre of a bullseye
fn confirm_vertical(matrix: &BitMatrix, x: usize, y: usize, module: f32) -> Option<(f32, f32)> {
    let runs = runs_along(matrix, false, x);
    let at = runs.iter().position(|r| (r.0..r.0 + r.1).contains(&y))?;
    let first = at.checked_sub(BULLSEYE_RUNS / 2)?;
    let window = runs.get(first..first + BULLSEYE_RUNS)?;
    let vertical = bullseye_module(window)?;
    if (vertical - module).abs() > RUN_TOLERANCE * module {
        return None;
    }
    let centre = window[BULLSEYE_RUNS / 2];
    Some((centre.0 as f32 + centre.1 as f32 / 2.0, vertical))
}

fn find_bullseyes(matrix: &BitMatrix) -> Vec<BullseyeHit> {
    let mut hits: Vec<BullseyeHit> = Vec::new();
    for y in 0..matrix.height() {
        let runs = runs_along(matrix, true, y);
        for window in runs.windows(BULLSEYE_RUNS) {
            let Some(module) = bullseye_module(window) else {
                continue;
            };
            let centre = window[BULLSEYE_RUNS / 2];
            let x = centre.0 as f32 + centre.1 as f32 / 2.0;
            let Some((cy, vertical)) = confirm_vertical(matrix, x as usize, y, module) else {
                continue;
            };
            let ring = window[1];
            let hit = BullseyeHit {
                x,
                y: cy,
                module: (module + vertical) / 2.0,
                seed: (ring.0 + ring.1 / 2, y),
                count: 1,
            };
            match hits
                .iter_mut()
                .find(|h| {
                    (h.x - hit.x).abs() <= 2.0 * h.module
                        && (h.y - hit.y).abs() <= 2.0 * h.module
                })
            {
                Some(existing) => existing.count += 1,
                None => hits.push(hit),
            }
        }
    }
    hits.sort_by(|a, b| b.count.cmp(&a.count));
    hits.truncate(MAX_CENTRES);
    hits
}

/// Light pixels 4-connected to `seed`, `None` if the region leaks
fn fill_ring(
    matrix: &BitMatrix,
    seed: (usize, usize),
    limit: usize,
) -> Option<Vec<(usize, usize)>> {
    if matrix.get(seed.0, seed.1) {
        return None;
    }
    let mut seen = vec![false; matrix.width() * matrix.height()];
    let mut stack = vec![seed];
    let mut region = Vec::new();
    seen[seed.1 * matrix.width() + seed.0] = true;
    while let Some((x, y)) = stack.pop() {
        region.push((x, y));
        if region.len() > limit
            || x == 0
            || y == 0
            || x + 1 == matrix.width()
            || y + 1 == matrix.height()
        {
            return None;
        }
        for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            let index = ny * matrix.width() + nx;
            if !seen[index] && !matrix.get(nx, ny) {
                seen[index] = true;
                stack.push((nx, ny));
            }
        }
    }
    Some(region)
}

/// Centre, module size and rotation from the light ring's moments
///
/// A square annulus between half-widths 2.5 and 3.5 modules has a mean
/// squared radius of (7^2 + 5^2) / 6 modules squared, and its fourth-order
/// moment points at the corners.
fn frame_from_ring(region: &[(usize, usize)]) -> Frame {
    let n = region.len() as f64;
    let (sx, sy) = region
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), &(x, y)| (sx + x as f64 + 0.5, sy + y as f64 + 0.5));
    let (cx, cy) = (sx / n, sy / n);
    let (mut r2, mut re, mut im) = (0.0f64, 0.0f64, 0.0f64);
    for &(x, y) in region {
        let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
        let (dx2, dy2) = (dx * dx, dy * dy);
        r2 += dx2 + dy2;
        re += dx2 * dx2 - 6.0 * dx2 * dy2 + dy2 * dy2;
        im += 4.0 * dx * dy * (dx2 - dy2);
    }
    let module = (6.0 * r2 / n / 74.0).sqrt();
    let angle = im.atan2(re) / 4.0 - std::f64::consts::FRAC_PI_4;
    Frame::new(Point::new(cx as f32, cy as f32), module as f32, angle as f32)
}

fn bullseye_to_candidate(matrix: &BitMatrix, hit: &BullseyeHit) -> Option<Candidate> {
    let limit = (60.0 * hit.module * hit.module) as usize + 64;
    let region = fill_ring(matrix, hit.seed, limit)?;
    let frame = frame_from_ring(&region);
    let module = frame.ex.0.hypot(frame.ex.1);
    if frame.center.distance(&Point::new(hit.x, hit.y)) > 1.5 * module.max(1.0) {
        return None;
    }

    let (compact, frame, quality) = [true, false]
        .into_iter()
        .flat_map(|compact| (0..4).map(move |turns| (compact, frame.turned(turns))))
        .map(|(compact, frame)| {
            let quality = core_quality(compact, |dx, dy| frame.module(matrix, dx, dy));
            (compact, frame, quality)
        })
        .max_by(|a, b| a.2.total_cmp(&b.2))?;
    if quality < MIN_CORE_QUALITY {
        return None;
    }
    let (layout, _) = read_mode_message(compact, |dx, dy| frame.module(matrix, dx, dy))?;
    Some(layout_to_candidate(&frame, &layout, module, quality))
}

fn layout_to_candidate(
    frame: &Frame,
    layout: &AztecLayout,
    module: f32,
    quality: f32,
) -> Candidate {
    let size = layout.size();
    // Grid corner (0, 0) lies half a module before the first module centre
    let near = -((size / 2) as f32) - 0.5;
    let far = near + size as f32;
    Candidate {
        family: SymbologyFamily::Aztec,
        quad: Quad::new(
            frame.at(near, near),
            frame.at(far, near),
            frame.at(far, far),
            frame.at(near, far),
        ),
        module_size: module,
        confidence: quality,
        grid: Some((size, size)),
    }
}

/// Locate Aztec symbols by their bullseye
pub fn locate(matrix: &BitMatrix, _options: &DecodeOptions) -> Vec<Candidate> {
    let hits = find_bullseyes(matrix);
    let mut candidates: Vec<Candidate> = hits
        .iter()
        .filter_map(|hit| bullseye_to_candidate(matrix, hit))
        .collect();
    debug!("aztec: {} bullseye hits, {} candidates", hits.len(), candidates.len());
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suppress_overlaps(candidates, CANDIDATE_OVERLAP)
}
