//! Start and stop pattern locator for PDF417
//!
//! Uses the scan lines of the linear locator. A hit is a start pattern
//! behind a quiet zone, followed by whole 17-module codewords and the stop
//! pattern. Every row repeats both patterns, so consecutive lines through
//! one symbol agree on both ends and group into a candidate whose height is
//! the extent of the wide start and stop bars.

use log::debug;

use super::linear::{Axis, Hit, Run, collect_groups, group_to_candidate};
use super::suppress_overlaps;
use crate::config::DecodeOptions;
use crate::decoder::linear::patterns::pattern_variance;
use crate::decoder::pdf417::codewords::CODEWORD_MODULES;
use crate::decoder::pdf417::{MAX_COLUMNS, START_PATTERN, STOP_PATTERN};
use crate::models::{BitMatrix, Candidate, SymbologyFamily};

/// Quiet zone width in modules
const QUIET_ZONE: f32 = 2.0;

const MAX_VARIANCE: f32 = 0.42;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.8;

/// Relative deviation allowed between a codeword's width and 17 modules
const CODEWORD_TOLERANCE: f32 = 0.25;

const SUPPRESSION_IOU: f32 = 0.3;

/// Module width and variance of `pattern` at `runs[0..]`
fn match_pattern(runs: &[Run], pattern: &[u8]) -> Option<(f32, f32)> {
    let widths: Vec<f32> = runs.get(..pattern.len())?.iter().map(Run::width).collect();
    let variance = pattern_variance(&widths, pattern, MAX_INDIVIDUAL_VARIANCE);
    let modules: u32 = pattern.iter().map(|&p| p as u32).sum();
    (variance < MAX_VARIANCE).then(|| (widths.iter().sum::<f32>() / modules as f32, variance))
}

/// Whether `runs` start with a stop pattern of module width `module` and a quiet zone
fn is_stop(runs: &[Run], module: f32, quiet: f32) -> bool {
    let Some((stop_module, _)) = match_pattern(runs, &STOP_PATTERN) else {
        return false;
    };
    (stop_module / module - 1.0).abs() < CODEWORD_TOLERANCE
        && runs
            .get(STOP_PATTERN.len())
            .is_none_or(|r| r.width() >= quiet)
}

/// Index of the stop pattern behind the codewords starting at `runs[from]`
fn find_stop(runs: &[Run], from: usize, module: f32) -> Option<usize> {
    let quiet = QUIET_ZONE * module;
    let codeword = CODEWORD_MODULES as f32 * module;
    let mut j = from;
    // Both row indicators and at least one data column precede the stop pattern
    for n in 0..MAX_COLUMNS + 3 {
        let rest = runs.get(j..)?;
        if n >= 3 && is_stop(rest, module, quiet) {
            return Some(j);
        }
        let width: f32 = rest.get(..8)?.iter().map(Run::width).sum();
        if (width / codeword - 1.0).abs() > CODEWORD_TOLERANCE {
            return None;
        }
        j += 8;
    }
    None
}

/// Start-to-stop hits along `runs`, which are ordered in reading direction
fn scan_runs(runs: &[Run], emit: &mut dyn FnMut(Hit)) {
    for i in 1..runs.len() {
        if !runs[i].dark || runs[i - 1].dark {
            continue;
        }
        let Some((module, variance)) = match_pattern(&runs[i..], &START_PATTERN) else {
            continue;
        };
        if runs[i - 1].width() < QUIET_ZONE * module {
            continue;
        }
        let Some(stop) = find_stop(runs, i + START_PATTERN.len(), module) else {
            continue;
        };
        emit(Hit {
            family: SymbologyFamily::Pdf417,
            axis: Axis::Rows,
            reversed: false,
            line: 0,
            u: 0.0,
            start: runs[i].near,
            end: runs[stop + STOP_PATTERN.len() - 1].far,
            first_bar: runs[i].mid(),
            last_bar: runs[stop].mid(),
            module,
            variance,
        });
    }
}

/// PDF417 candidates, best first
pub fn locate(matrix: &BitMatrix, options: &DecodeOptions) -> Vec<Candidate> {
    if !options.family_enabled(SymbologyFamily::Pdf417)
        || matrix.width() == 0
        || matrix.height() == 0
    {
        return Vec::new();
    }
    let groups = collect_groups(matrix, options, scan_runs);
    let mut candidates: Vec<Candidate> = groups
        .iter()
        .filter_map(|g| group_to_candidate(matrix, g))
        .collect();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let candidates = suppress_overlaps(candidates, SUPPRESSION_IOU);
    debug!("pdf417: {} hit groups, {} candidates", groups.len(), candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::pdf417::encode;
    use crate::models::Symbology;

    fn render(grid: &BitMatrix, unit: usize, quiet: usize) -> BitMatrix {
        let mut image = BitMatrix::new(
            grid.width() * unit + 2 * quiet,
            grid.height() * unit + 2 * quiet,
        );
        for y in 0..grid.height() * unit {
            for x in 0..grid.width() * unit {
                image.set(quiet + x, quiet + y, grid.get(x / unit, y / unit));
            }
        }
        image
    }

    fn options() -> DecodeOptions {
        DecodeOptions::default().with_symbologies(&[Symbology::Pdf417])
    }

    #[test]
    fn test_locates_symbol_bounds() {
        let grid = encode("PDF417 locator").unwrap();
        let image = render(&grid, 2, 20);
        let candidates = locate(&image, &options());
        assert_eq!(candidates.len(), 1);
        let best = &candidates[0];
        assert_eq!(best.family, SymbologyFamily::Pdf417);
        assert!((best.module_size - 2.0).abs() < 0.3);

        let bbox = best.quad.bounding_box();
        assert!((bbox.left - 20.0).abs() <= 1.0);
        assert!((bbox.right - (20.0 + 2.0 * grid.width() as f32)).abs() <= 1.0);
        assert!((bbox.top - 20.0).abs() <= 1.0);
        assert!((bbox.bottom - (20.0 + 2.0 * grid.height() as f32)).abs() <= 1.0);
    }

    #[test]
    fn test_upside_down_symbol_is_oriented() {
        let grid = encode("PDF417 locator").unwrap();
        let image = render(&grid, 2, 20).rotate_clockwise().rotate_clockwise();
        let best = locate(&image, &options()).into_iter().next().unwrap();
        // Reading starts at the right edge, the symbol top faces down
        assert!(best.quad.top_left().x > best.quad.top_right().x);
        assert!(best.quad.top_left().y > best.quad.bottom_left().y);
    }

    #[test]
    fn test_requires_stop_pattern() {
        let grid = encode("PDF417 locator").unwrap();
        let mut image = render(&grid, 2, 20);
        // Erase the stop pattern on every row
        let stop = 20 + 2 * (grid.width() - 18);
        for y in 0..image.height() {
            for x in stop..image.width() {
                image.set(x, y, false);
            }
        }
        assert!(locate(&image, &options()).is_empty());
    }

    #[test]
    fn test_disabled_family_is_skipped() {
        let grid = encode("PDF417 locator").unwrap();
        let image = render(&grid, 2, 20);
        let options = DecodeOptions::default().with_symbologies(&[Symbology::QrCode]);
        assert!(locate(&image, &options).is_empty());
    }
}
