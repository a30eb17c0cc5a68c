//! Scan-line locator for linear symbols
//!
//! Evenly spaced rows (and columns when vertical scanning is on) are split
//! into runs and read in both directions. A hit is a start pattern preceded
//! by a quiet zone whose run count up to the next quiet zone fits the
//! family's character structure. Hits of consecutive lines that agree on
//! both ends are grouped, and the group is widened to the full bar height.

use log::debug;

use super::suppress_overlaps;
use crate::config::DecodeOptions;
use crate::decoder::linear::patterns::{
    CODE39_ASTERISK, CODE128_PATTERNS, CODE128_START_A, CODE128_START_C, EAN_START_GUARD, EAN8_RUNS,
    EAN13_RUNS, ITF_START, UPCE_RUNS, narrow_wide_pattern, narrow_wide_variance, pattern_variance,
};
use crate::models::{BitMatrix, Candidate, Point, Quad, SymbologyFamily};

/// Quiet zone width in modules
const QUIET_ZONE: f32 = 5.0;

/// Ends of hits on neighbouring lines may differ by this many modules
const GROUP_TOLERANCE: f32 = 3.0;

/// A group stays open across this many lines without a hit
const MAX_LINE_GAP: usize = 2;

/// Minimum candidate IoU for suppression within a family
const SUPPRESSION_IOU: f32 = 0.3;

const LINEAR_FAMILIES: [SymbologyFamily; 4] = [
    SymbologyFamily::EanUpc,
    SymbologyFamily::Code128,
    SymbologyFamily::Code39,
    SymbologyFamily::Itf,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Axis {
    Rows,
    Columns,
}

/// One bar or space along a scan line, edges in reading direction
#[derive(Debug, Clone, Copy)]
pub(super) struct Run {
    pub(super) near: f32,
    pub(super) far: f32,
    pub(super) dark: bool,
}

impl Run {
    pub(super) fn width(&self) -> f32 {
        (self.far - self.near).abs()
    }

    pub(super) fn mid(&self) -> f32 {
        (self.near + self.far) / 2.0
    }
}

/// Start pattern match at one position of a line
#[derive(Debug, Clone, Copy)]
pub(super) struct Hit {
    pub(super) family: SymbologyFamily,
    pub(super) axis: Axis,
    pub(super) reversed: bool,
    pub(super) line: usize,
    /// Line coordinate (y for rows, x for columns)
    pub(super) u: f32,
    /// Leading edge of the first bar
    pub(super) start: f32,
    /// Trailing edge of the last bar
    pub(super) end: f32,
    pub(super) first_bar: f32,
    pub(super) last_bar: f32,
    pub(super) module: f32,
    pub(super) variance: f32,
}

impl Hit {
    fn same_symbol(&self, other: &Hit) -> bool {
        let tolerance = GROUP_TOLERANCE * self.module.max(other.module);
        self.family == other.family
            && self.axis == other.axis
            && self.reversed == other.reversed
            && (self.start - other.start).abs() <= tolerance
            && (self.end - other.end).abs() <= tolerance
    }
}

/// Runs of one row or column in increasing coordinate order
fn line_runs(matrix: &BitMatrix, axis: Axis, line: usize) -> Vec<Run> {
    let len = match axis {
        Axis::Rows => matrix.width(),
        Axis::Columns => matrix.height(),
    };
    let pixel = |i: usize| match axis {
        Axis::Rows => matrix.get(i, line),
        Axis::Columns => matrix.get(line, i),
    };
    let mut runs: Vec<Run> = Vec::new();
    for i in 0..len {
        let dark = pixel(i);
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.far += 1.0,
            _ => runs.push(Run {
                near: i as f32,
                far: i as f32 + 1.0,
                dark,
            }),
        }
    }
    runs
}

/// Module width and variance of a start pattern at `runs[0..]`
fn match_start(family: SymbologyFamily, runs: &[Run]) -> Option<(f32, f32)> {
    let widths = |n: usize| -> Option<Vec<f32>> {
        Some(runs.get(..n)?.iter().map(Run::width).collect())
    };
    match family {
        SymbologyFamily::EanUpc => {
            let w = widths(3)?;
            let variance = pattern_variance(&w, &EAN_START_GUARD, 0.7);
            (variance < 0.48).then(|| (w.iter().sum::<f32>() / 3.0, variance))
        }
        SymbologyFamily::Code128 => {
            let w = widths(6)?;
            let variance = (CODE128_START_A..=CODE128_START_C)
                .map(|start| pattern_variance(&w, &CODE128_PATTERNS[start as usize], 0.7))
                .fold(f32::INFINITY, f32::min);
            (variance < 0.25).then(|| (w.iter().sum::<f32>() / 11.0, variance))
        }
        SymbologyFamily::Code39 => {
            let w = widths(9)?;
            if narrow_wide_pattern(&w, 3)? != CODE39_ASTERISK {
                return None;
            }
            let variance = narrow_wide_variance(&w, CODE39_ASTERISK);
            let narrow: Vec<f32> = w
                .iter()
                .enumerate()
                .filter(|(i, _)| (CODE39_ASTERISK >> (8 - i)) & 1 == 0)
                .map(|(_, &c)| c)
                .collect();
            let module = narrow.iter().sum::<f32>() / narrow.len() as f32;
            (variance < 0.2).then_some((module, variance))
        }
        SymbologyFamily::Itf => {
            let w = widths(4)?;
            let variance = pattern_variance(&w, &ITF_START, 0.5);
            (variance < 0.38).then(|| (w.iter().sum::<f32>() / 4.0, variance))
        }
        SymbologyFamily::Qr
        | SymbologyFamily::DataMatrix
        | SymbologyFamily::Pdf417
        | SymbologyFamily::Aztec => None,
    }
}

/// Whether `n` runs from first to last bar fit the family's structure
fn run_count_fits(family: SymbologyFamily, n: usize) -> bool {
    match family {
        SymbologyFamily::EanUpc => matches!(n, EAN13_RUNS | EAN8_RUNS | UPCE_RUNS),
        SymbologyFamily::Code128 => n >= 25 && (n - 7) % 6 == 0,
        SymbologyFamily::Code39 => n >= 29 && (n + 1) % 10 == 0,
        SymbologyFamily::Itf => n >= 37 && (n - 7) % 10 == 0,
        SymbologyFamily::Qr
        | SymbologyFamily::DataMatrix
        | SymbologyFamily::Pdf417
        | SymbologyFamily::Aztec => false,
    }
}

/// Start-pattern hits along `runs`, which are ordered in reading direction
fn scan_runs(runs: &[Run], families: &[SymbologyFamily], mut emit: impl FnMut(Hit)) {
    for i in 1..runs.len() {
        if !runs[i].dark || runs[i - 1].dark {
            continue;
        }
        for &family in families {
            let Some((module, variance)) = match_start(family, &runs[i..]) else {
                continue;
            };
            let quiet = QUIET_ZONE * module;
            if runs[i - 1].width() < quiet {
                continue;
            }
            // First light run wide enough to be the trailing quiet zone
            let Some(end) = (i + 1..runs.len())
                .step_by(2)
                .find(|&j| runs[j].width() >= quiet)
            else {
                continue;
            };
            if !run_count_fits(family, end - i) {
                continue;
            }
            emit(Hit {
                family,
                axis: Axis::Rows,
                reversed: false,
                line: 0,
                u: 0.0,
                start: runs[i].near,
                end: runs[end - 1].far,
                first_bar: runs[i].mid(),
                last_bar: runs[end - 1].mid(),
                module,
                variance,
            });
        }
    }
}

/// Evenly spaced line indices across `extent`
fn scan_positions(extent: usize, count: usize) -> Vec<usize> {
    let count = count.min(extent);
    (0..count)
        .map(|k| ((k as f32 + 0.5) * extent as f32 / count as f32) as usize)
        .collect()
}

/// Hits grouped per symbol
///
/// `scan` reports the hits of one line of runs in reading direction; the
/// line position and direction are filled in here.
pub(super) fn collect_groups(
    matrix: &BitMatrix,
    options: &DecodeOptions,
    scan: impl Fn(&[Run], &mut dyn FnMut(Hit)),
) -> Vec<Vec<Hit>> {
    let mut axes = vec![(Axis::Rows, matrix.height())];
    if options.try_vertical {
        axes.push((Axis::Columns, matrix.width()));
    }

    let mut groups: Vec<Vec<Hit>> = Vec::new();
    for (axis, extent) in axes {
        for (line, u) in scan_positions(extent, options.scan_lines).into_iter().enumerate() {
            let forward = line_runs(matrix, axis, u);
            let backward: Vec<Run> = forward
                .iter()
                .rev()
                .map(|r| Run {
                    near: r.far,
                    far: r.near,
                    dark: r.dark,
                })
                .collect();
            for (runs, reversed) in [(forward, false), (backward, true)] {
                scan(&runs, &mut |mut hit: Hit| {
                    hit.axis = axis;
                    hit.reversed = reversed;
                    hit.line = line;
                    hit.u = u as f32 + 0.5;
                    let open = groups.iter_mut().find(|g| {
                        g.last().is_some_and(|last| {
                            last.line + MAX_LINE_GAP >= line && last.same_symbol(&hit)
                        })
                    });
                    match open {
                        Some(group) => group.push(hit),
                        None => groups.push(vec![hit]),
                    }
                });
            }
        }
    }
    groups
}

/// Image point of along-line coordinate `v` on line coordinate `u`
fn to_image(axis: Axis, v: f32, u: f32) -> Point {
    match axis {
        Axis::Rows => Point::new(v, u),
        Axis::Columns => Point::new(u, v),
    }
}

/// Pixels a bar continues beyond `u` in direction `step`, following a linear drift of `v`
fn bar_extent(
    matrix: &BitMatrix,
    axis: Axis,
    u: f32,
    v_at: impl Fn(f32) -> f32,
    step: f32,
) -> f32 {
    let limit = match axis {
        Axis::Rows => matrix.height(),
        Axis::Columns => matrix.width(),
    } as f32;
    let mut extent = 0.0;
    while extent < limit {
        let next = u + step * (extent + 1.0);
        let p = to_image(axis, v_at(next), next);
        if !matrix.get_signed(p.x.floor() as i32, p.y.floor() as i32) {
            break;
        }
        extent += 1.0;
    }
    extent
}

pub(super) fn group_to_candidate(matrix: &BitMatrix, group: &[Hit]) -> Option<Candidate> {
    let (first, last) = (group.first()?, group.last()?);
    let axis = first.axis;
    let span = last.u - first.u;
    // Edges drift linearly across lines for tilted symbols
    let along = |a: f32, b: f32| {
        move |u: f32| {
            if span > 0.0 {
                a + (b - a) * (u - first.u) / span
            } else {
                a
            }
        }
    };
    let start_at = along(first.start, last.start);
    let end_at = along(first.end, last.end);
    let first_bar_at = along(first.first_bar, last.first_bar);
    let last_bar_at = along(first.last_bar, last.last_bar);

    let up = bar_extent(matrix, axis, first.u, &first_bar_at, -1.0)
        .min(bar_extent(matrix, axis, first.u, &last_bar_at, -1.0));
    let down = bar_extent(matrix, axis, last.u, &first_bar_at, 1.0)
        .min(bar_extent(matrix, axis, last.u, &last_bar_at, 1.0));
    let (u_min, u_max) = (first.u - 0.5 - up, last.u + 0.5 + down);

    // Top of the symbol is to the left of the reading direction
    let d = match (axis, first.reversed) {
        (Axis::Rows, false) => Point::new(1.0, 0.0),
        (Axis::Rows, true) => Point::new(-1.0, 0.0),
        (Axis::Columns, false) => Point::new(0.0, 1.0),
        (Axis::Columns, true) => Point::new(0.0, -1.0),
    };
    let normal = Point::new(d.y, -d.x);
    let normal_along_u = match axis {
        Axis::Rows => normal.y,
        Axis::Columns => normal.x,
    };
    let (top, bottom) = if normal_along_u < 0.0 { (u_min, u_max) } else { (u_max, u_min) };

    let quad = Quad::new(
        to_image(axis, start_at(top), top),
        to_image(axis, end_at(top), top),
        to_image(axis, end_at(bottom), bottom),
        to_image(axis, start_at(bottom), bottom),
    );

    let n = group.len() as f32;
    let module_size = group.iter().map(|h| h.module).sum::<f32>() / n;
    let variance = group.iter().map(|h| h.variance).sum::<f32>() / n;
    let support = 0.5 + 0.5 * (n.min(4.0) / 4.0);
    Some(Candidate {
        family: first.family,
        quad,
        module_size,
        confidence: ((1.0 - variance) * support).clamp(0.0, 1.0),
        grid: None,
    })
}

/// Linear candidates for every enabled linear family, best first
pub fn locate(matrix: &BitMatrix, options: &DecodeOptions) -> Vec<Candidate> {
    let families: Vec<SymbologyFamily> = LINEAR_FAMILIES
        .into_iter()
        .filter(|&f| options.family_enabled(f))
        .collect();
    if families.is_empty() || matrix.width() == 0 || matrix.height() == 0 {
        return Vec::new();
    }

    let groups = collect_groups(matrix, options, |runs, emit| scan_runs(runs, &families, emit));
    let mut candidates: Vec<Candidate> = groups
        .iter()
        .filter_map(|g| group_to_candidate(matrix, g))
        .collect();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let candidates = suppress_overlaps(candidates, SUPPRESSION_IOU);
    debug!("linear: {} hit groups, {} candidates", groups.len(), candidates.len());
    candidates
}
