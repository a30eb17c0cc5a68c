/// QR finder pattern detection and grouping
///
/// Rows are scanned for 1:1:3:1:1 dark/light runs, each hit is confirmed
/// by a vertical and a second horizontal cross-check through its centre,
/// and confirmed patterns are grouped into right-angle triples.
use log::debug;

use super::suppress_overlaps;
use crate::config::DecodeOptions;
use crate::models::{BitMatrix, Candidate, Point, Quad, SymbologyFamily};

/// Strongest patterns considered for grouping
const MAX_GROUPING_PATTERNS: usize = 24;

/// Early termination: max patterns reported per row
const MAX_PATTERNS_PER_ROW: usize = 12;

/// Overlap above which two QR candidates cover the same symbol
const CANDIDATE_OVERLAP: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    pub center: Point,
    pub module_size: f32,
    /// Number of scan rows that confirmed this pattern
    pub count: u32,
}

impl FinderPattern {
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            count: 1,
        }
    }

    fn about_equals(&self, other: &FinderPattern) -> bool {
        let tolerance = self.module_size.max(other.module_size).max(2.0);
        (self.center.x - other.center.x).abs() <= tolerance
            && (self.center.y - other.center.y).abs() <= tolerance
            && (self.module_size - other.module_size).abs() <= 0.5 * self.module_size.max(1.0)
    }

    fn combine(&self, other: &FinderPattern) -> Self {
        let total = (self.count + other.count) as f32;
        let (a, b) = (self.count as f32 / total, other.count as f32 / total);
        Self {
            center: Point::new(
                self.center.x * a + other.center.x * b,
                self.center.y * a + other.center.y * b,
            ),
            module_size: self.module_size * a + other.module_size * b,
            count: self.count + other.count,
        }
    }
}

pub struct FinderDetector;

impl FinderDetector {
    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        let width = matrix.width();
        let height = matrix.height();
        let mut merged: Vec<FinderPattern> = Vec::new();

        for y in 0..height {
            // Skip rows with too few edges to hold a pattern
            if !Self::has_significant_edges(matrix, y, width) {
                continue;
            }
            for candidate in Self::scan_row(matrix, y, width) {
                match merged.iter_mut().find(|p| p.about_equals(&candidate)) {
                    Some(existing) => *existing = existing.combine(&candidate),
                    None => merged.push(candidate),
                }
            }
        }

        merged.sort_by(|a, b| b.count.cmp(&a.count));
        merged
    }

    /// Check if row has enough edge transitions to potentially contain patterns
    fn has_significant_edges(matrix: &BitMatrix, y: usize, width: usize) -> bool {
        let mut transitions = 0;
        let mut prev_color = matrix.get(0, y);
        for x in (2..width).step_by(2) {
            let color = matrix.get(x, y);
            if color != prev_color {
                transitions += 1;
                prev_color = color;
                if transitions >= 4 {
                    return true;
                }
            }
        }
        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize, width: usize) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        let mut runs: [usize; 5] = [0; 5];
        let mut colors: [bool; 5] = [false; 5];
        let mut filled = 0usize;
        let mut run_start = 0usize;
        let mut current_color = matrix.get(0, y);

        for x in 1..=width {
            let color = if x < width { matrix.get(x, y) } else { !current_color };
            if color == current_color {
                continue;
            }

            runs.rotate_left(1);
            colors.rotate_left(1);
            runs[4] = x - run_start;
            colors[4] = current_color;
            filled = (filled + 1).min(5);
            run_start = x;
            current_color = color;

            if filled == 5
                && colors[0]
                && !colors[1]
                && colors[2]
                && !colors[3]
                && colors[4]
                && Self::quick_ratio_check(&runs)
            {
                if let Some(pattern) = Self::check_pattern(&runs, x, y)
                    .and_then(|p| Self::confirm(matrix, &p, runs.iter().sum()))
                {
                    candidates.push(pattern);
                    if candidates.len() >= MAX_PATTERNS_PER_ROW {
                        break;
                    }
                }
            }
        }

        candidates
    }

    /// Quick ratio validation - rough check before floating-point math
    fn quick_ratio_check(lengths: &[usize; 5]) -> bool {
        let [b1, w1, b2, w2, b3] = *lengths;
        let total = b1 + w1 + b2 + w2 + b3;

        // Minimum 7 modules at 2 pixels each
        if total < 14 {
            return false;
        }

        let b2_min = b1.min(b3).max(1);
        if b2 < b2_min * 2 || b2 > b2_min * 5 {
            return false;
        }

        let outer_avg = (b1 + b3 + w1 + w2) / 4;
        let w1_ok = w1 >= outer_avg / 2 && w1 <= outer_avg * 2;
        let w2_ok = w2 >= outer_avg / 2 && w2 <= outer_avg * 2;
        w1_ok && w2_ok
    }

    fn ratios_ok(lengths: &[usize; 5]) -> bool {
        let total: usize = lengths.iter().sum();
        if total < 7 {
            return false;
        }
        let unit = total as f32 / 7.0;
        let expected = [1.0, 1.0, 3.0, 1.0, 1.0];
        lengths
            .iter()
            .zip(expected)
            .all(|(&len, exp)| (len as f32 / unit - exp).abs() <= if exp > 1.0 { 1.0 } else { 0.5 })
    }

    fn check_pattern(lengths: &[usize; 5], end_x: usize, y: usize) -> Option<FinderPattern> {
        if !Self::ratios_ok(lengths) {
            return None;
        }
        let [_, _, b2, w2, b3] = *lengths;
        let total: usize = lengths.iter().sum();
        let center_x = end_x as f32 - b3 as f32 - w2 as f32 - b2 as f32 / 2.0;
        Some(FinderPattern::new(center_x, y as f32 + 0.5, total as f32 / 7.0))
    }

    /// Vertical then horizontal cross-check through the candidate centre
    fn confirm(
        matrix: &BitMatrix,
        pattern: &FinderPattern,
        row_total: usize,
    ) -> Option<FinderPattern> {
        let cx = pattern.center.x.floor() as usize;
        let cy = pattern.center.y.floor() as usize;
        let (center_y, v_total) = cross_check(matrix, cx, cy, row_total, Axis::Vertical)?;
        let (center_x, h_total) =
            cross_check(matrix, cx, center_y.floor() as usize, row_total, Axis::Horizontal)?;
        Some(FinderPattern::new(
            center_x,
            center_y,
            (v_total + h_total) as f32 / 14.0,
        ))
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Measure the 1:1:3:1:1 runs through (x, y) along `axis`
///
/// Returns the refined centre coordinate on that axis and the run total.
fn cross_check(
    matrix: &BitMatrix,
    x: usize,
    y: usize,
    expected_total: usize,
    axis: Axis,
) -> Option<(f32, usize)> {
    let (start, limit) = match axis {
        Axis::Horizontal => (x as i64, matrix.width() as i64),
        Axis::Vertical => (y as i64, matrix.height() as i64),
    };
    let get = |i: i64| -> bool {
        if i < 0 || i >= limit {
            return false;
        }
        match axis {
            Axis::Horizontal => matrix.get(i as usize, y),
            Axis::Vertical => matrix.get(x, i as usize),
        }
    };
    if !get(start) {
        return None;
    }
    let max = expected_total as i64;
    let mut counts = [0i64; 5];

    let mut i = start;
    while i >= 0 && get(i) {
        counts[2] += 1;
        i -= 1;
    }
    while i >= 0 && !get(i) && counts[1] <= max {
        counts[1] += 1;
        i -= 1;
    }
    if i < 0 || counts[1] > max {
        return None;
    }
    while i >= 0 && get(i) && counts[0] <= max {
        counts[0] += 1;
        i -= 1;
    }
    if counts[0] > max {
        return None;
    }

    let mut i = start + 1;
    while i < limit && get(i) {
        counts[2] += 1;
        i += 1;
    }
    while i < limit && !get(i) && counts[3] <= max {
        counts[3] += 1;
        i += 1;
    }
    if i >= limit || counts[3] > max {
        return None;
    }
    while i < limit && get(i) && counts[4] <= max {
        counts[4] += 1;
        i += 1;
    }
    if counts[4] > max {
        return None;
    }

    let total: i64 = counts.iter().sum();
    if 5 * (total - max).abs() >= 2 * max {
        return None;
    }
    let lengths = counts.map(|c| c as usize);
    if !FinderDetector::ratios_ok(&lengths) {
        return None;
    }
    let center = i as f32 - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0;
    Some((center, total as usize))
}

/// Ordered finder triple with its grid estimate
#[derive(Debug, Clone, Copy)]
struct FinderTriple {
    top_left: FinderPattern,
    top_right: FinderPattern,
    bottom_left: FinderPattern,
    dimension: usize,
    score: f32,
}

/// Locate QR candidates, best first, overlapping duplicates removed
pub fn locate(matrix: &BitMatrix, _options: &DecodeOptions) -> Vec<Candidate> {
    let mut patterns = FinderDetector::detect(matrix);
    patterns.truncate(MAX_GROUPING_PATTERNS);

    let mut candidates: Vec<Candidate> = group_finder_patterns(&patterns)
        .into_iter()
        .filter_map(|triple| triple_to_candidate(matrix, &triple))
        .collect();
    debug!(
        "qr: {} finder patterns, {} candidate groups",
        patterns.len(),
        candidates.len()
    );

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suppress_overlaps(candidates, CANDIDATE_OVERLAP)
}

fn group_finder_patterns(patterns: &[FinderPattern]) -> Vec<FinderTriple> {
    let mut groups = Vec::new();
    for i in 0..patterns.len() {
        for j in (i + 1)..patterns.len() {
            for k in (j + 1)..patterns.len() {
                if let Some(triple) =
                    order_finder_patterns(&patterns[i], &patterns[j], &patterns[k])
                {
                    groups.push(triple);
                }
            }
        }
    }
    groups
}

fn order_finder_patterns(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
) -> Option<FinderTriple> {
    let patterns = [a, b, c];
    let sizes = [a.module_size, b.module_size, c.module_size];
    let min_size = sizes.iter().fold(f32::INFINITY, |m, &s| m.min(s));
    let max_size = sizes.iter().fold(0.0f32, |m, &s| m.max(s));
    if min_size < 1.0 || max_size / min_size > 1.5 {
        return None;
    }

    // The right-angle corner is the top-left pattern
    let mut best_idx = 0usize;
    let mut best_cos = f32::INFINITY;
    for i in 0..3 {
        let p = patterns[i].center;
        let p1 = patterns[(i + 1) % 3].center;
        let p2 = patterns[(i + 2) % 3].center;
        let (v1x, v1y) = (p1.x - p.x, p1.y - p.y);
        let (v2x, v2y) = (p2.x - p.x, p2.y - p.y);
        let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
        if denom == 0.0 {
            return None;
        }
        let cos = ((v1x * v2x + v1y * v2y) / denom).abs();
        if cos < best_cos {
            best_cos = cos;
            best_idx = i;
        }
    }
    if best_cos > 0.3 {
        return None;
    }

    let tl = *patterns[best_idx];
    let p1 = *patterns[(best_idx + 1) % 3];
    let p2 = *patterns[(best_idx + 2) % 3];
    let cross = (p1.center.x - tl.center.x) * (p2.center.y - tl.center.y)
        - (p1.center.y - tl.center.y) * (p2.center.x - tl.center.x);
    let (tr, bl) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };

    let d_tr = tl.center.distance(&tr.center);
    let d_bl = tl.center.distance(&bl.center);
    if d_tr == 0.0 {
        return None;
    }
    // Runs were measured along the pixel axes; a symbol turned by t reads
    // 1 / max(|cos t|, |sin t|) times wider than it is
    let tilt = ((tr.center.x - tl.center.x).abs().max((tr.center.y - tl.center.y).abs())) / d_tr;
    let avg_module = tilt * (tl.module_size + tr.module_size + bl.module_size) / 3.0;
    if d_tr.min(d_bl) < avg_module * 7.0 {
        return None;
    }
    let distortion = d_tr.max(d_bl) / d_tr.min(d_bl);
    if distortion > 1.5 {
        return None;
    }

    let dim1 = estimate_dimension_from_distance(d_tr, avg_module)?;
    let dim2 = estimate_dimension_from_distance(d_bl, avg_module)?;
    let dimension = if dim1 == dim2 {
        dim1
    } else if dim1.abs_diff(dim2) <= 4 {
        round_to_dimension((dim1 + dim2) as f32 / 2.0)?
    } else {
        return None;
    };

    let score = (max_size / min_size - 1.0) * 2.0 + (distortion - 1.0) + best_cos;
    Some(FinderTriple {
        top_left: tl,
        top_right: tr,
        bottom_left: bl,
        dimension,
        score,
    })
}

fn estimate_dimension_from_distance(distance: f32, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    round_to_dimension(distance / module_size + 7.0)
}

fn round_to_dimension(raw_dim: f32) -> Option<usize> {
    let version = ((raw_dim - 17.0) / 4.0).round() as i32;
    if !(1..=40).contains(&version) {
        return None;
    }
    Some(17 + 4 * version as usize)
}

/// Dimension implied by the timing pattern between two finder centres
///
/// The line through module row (or column) 6 crosses the finder's outer ring,
/// `dimension - 14` single-module timing runs, then the other finder's ring.
fn timing_dimension(matrix: &BitMatrix, from: Point, to: Point, module_size: f32) -> Option<usize> {
    let length = from.distance(&to);
    let steps = (length * 2.0).ceil() as usize;
    if steps == 0 {
        return None;
    }
    let min_run = (module_size * 0.3).max(0.5);
    let mut runs = 0usize;
    let mut current: Option<bool> = None;
    let mut run_len = 0.0f32;
    let step_len = length / steps as f32;
    for s in 0..=steps {
        let p = from.lerp(&to, s as f32 / steps as f32);
        let bit = matrix.get_signed(p.x.floor() as i32, p.y.floor() as i32);
        match current {
            Some(c) if c == bit => run_len += step_len,
            _ => {
                // Runs shorter than a third of a module are noise
                if current.is_none() || run_len >= min_run {
                    runs += 1;
                }
                current = Some(bit);
                run_len = step_len;
            }
        }
    }
    let dimension = runs + 12;
    ((dimension - 17) % 4 == 0 && (21..=177).contains(&dimension)).then_some(dimension)
}

fn triple_to_candidate(matrix: &BitMatrix, triple: &FinderTriple) -> Option<Candidate> {
    let tl = triple.top_left.center;
    let tr = triple.top_right.center;
    let bl = triple.bottom_left.center;
    let span = (triple.dimension - 7) as f32;
    let u = Point::new((tr.x - tl.x) / span, (tr.y - tl.y) / span);
    let v = Point::new((bl.x - tl.x) / span, (bl.y - tl.y) / span);
    let module_size = (u.x.hypot(u.y) + v.x.hypot(v.y)) / 2.0;

    let row_timing = timing_dimension(
        matrix,
        tl.translate(3.0 * v.x, 3.0 * v.y),
        tr.translate(3.0 * v.x, 3.0 * v.y),
        module_size,
    );
    let col_timing = timing_dimension(
        matrix,
        tl.translate(3.0 * u.x, 3.0 * u.y),
        bl.translate(3.0 * u.x, 3.0 * u.y),
        module_size,
    );
    let near = |d: &usize| d.abs_diff(triple.dimension) <= 4;
    let (dimension, timing_factor) = match (row_timing.filter(near), col_timing.filter(near)) {
        (Some(r), Some(c)) if r == c => (r, 1.0),
        (Some(r), Some(_)) | (Some(r), None) => (r, 0.8),
        (None, Some(c)) => (c, 0.8),
        (None, None) => (triple.dimension, 0.4),
    };

    let span = (dimension - 7) as f32;
    let u = Point::new((tr.x - tl.x) / span, (tr.y - tl.y) / span);
    let v = Point::new((bl.x - tl.x) / span, (bl.y - tl.y) / span);
    let at = |mx: f32, my: f32| {
        Point::new(
            tl.x + (mx - 3.5) * u.x + (my - 3.5) * v.x,
            tl.y + (mx - 3.5) * u.y + (my - 3.5) * v.y,
        )
    };
    let d = dimension as f32;
    let quad = Quad::new(at(0.0, 0.0), at(d, 0.0), at(d, d), at(0.0, d));

    let confidence = (timing_factor / (1.0 + triple.score)).clamp(0.0, 1.0);
    Some(Candidate {
        family: SymbologyFamily::Qr,
        quad,
        module_size,
        confidence,
        grid: Some((dimension, dimension)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Draw a 7x7 finder with its top-left module at (mx, my)
    fn draw_finder(matrix: &mut BitMatrix, mx: usize, my: usize, unit: usize) {
        for y in 0..7 {
            for x in 0..7 {
                let ring = x == 0 || y == 0 || x == 6 || y == 6;
                let core = (2..=4).contains(&x) && (2..=4).contains(&y);
                if ring || core {
                    for py in 0..unit {
                        for px in 0..unit {
                            matrix.set((mx + x) * unit + px, (my + y) * unit + py, true);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_quick_ratio_check() {
        assert!(FinderDetector::quick_ratio_check(&[3, 3, 9, 3, 3]));
        assert!(!FinderDetector::quick_ratio_check(&[1, 1, 3, 1, 1]));
        assert!(!FinderDetector::quick_ratio_check(&[3, 3, 5, 3, 3]));
    }

    #[test]
    fn test_detects_single_finder_center() {
        let mut matrix = BitMatrix::new(60, 60);
        draw_finder(&mut matrix, 2, 2, 4);
        let patterns = FinderDetector::detect(&matrix);
        assert_eq!(patterns.len(), 1);
        let p = patterns[0];
        assert!((p.center.x - 22.0).abs() < 1.0, "x = {}", p.center.x);
        assert!((p.center.y - 22.0).abs() < 1.0, "y = {}", p.center.y);
        assert!((p.module_size - 4.0).abs() < 0.5);
        assert!(p.count > 1);
    }

    #[test]
    fn test_groups_three_finders_into_candidate() {
        // Version 1 footprint with 4-module quiet zone, 3 px modules
        let unit = 3;
        let mut matrix = BitMatrix::new(29 * unit, 29 * unit);
        draw_finder(&mut matrix, 4, 4, unit);
        draw_finder(&mut matrix, 4 + 14, 4, unit);
        draw_finder(&mut matrix, 4, 4 + 14, unit);
        // Timing patterns on row/column 6
        for i in (8..13).step_by(2) {
            for py in 0..unit {
                for px in 0..unit {
                    matrix.set((4 + i) * unit + px, (4 + 6) * unit + py, true);
                    matrix.set((4 + 6) * unit + px, (4 + i) * unit + py, true);
                }
            }
        }

        let candidates = locate(&matrix, &DecodeOptions::default());
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.grid, Some((21, 21)));
        let tl = candidate.quad.top_left();
        assert!((tl.x - 12.0).abs() < 1.5 && (tl.y - 12.0).abs() < 1.5, "{tl:?}");
        assert!(candidate.confidence > 0.5);
    }

    #[test]
    fn test_diagonal_triple_keeps_its_dimension() {
        // Version 5 turned 45 degrees: centres 30 modules apart, while the
        // axis-aligned runs read each 4 px module as 4 * sqrt(2)
        let measured = 4.0 * std::f32::consts::SQRT_2;
        let step = 30.0 * 4.0 / std::f32::consts::SQRT_2;
        let tl = FinderPattern::new(200.0, 100.0, measured);
        let tr = FinderPattern::new(200.0 + step, 100.0 + step, measured);
        let bl = FinderPattern::new(200.0 - step, 100.0 + step, measured);
        let triple = order_finder_patterns(&bl, &tl, &tr).unwrap();
        assert_eq!(triple.dimension, 37);
        assert_eq!(triple.top_left.center, tl.center);
        assert_eq!(triple.top_right.center, tr.center);

        // 30 degrees: cos dominates
        let (sin, cos) = 30f32.to_radians().sin_cos();
        let measured = 4.0 / cos;
        let span = 30.0 * 4.0;
        let tl = FinderPattern::new(100.0, 100.0, measured);
        let tr = FinderPattern::new(100.0 + span * cos, 100.0 + span * sin, measured);
        let bl = FinderPattern::new(100.0 - span * sin, 100.0 + span * cos, measured);
        assert_eq!(order_finder_patterns(&tl, &tr, &bl).unwrap().dimension, 37);
    }

    #[test]
    fn test_dimension_rounding() {
        assert_eq!(estimate_dimension_from_distance(140.0, 10.0), Some(21));
        assert_eq!(estimate_dimension_from_distance(10.0, 10.0), None);
        assert_eq!(round_to_dimension(26.0), Some(25));
    }
}
