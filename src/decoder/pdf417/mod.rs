//! PDF417 decoding
//!
//! A symbol is a stack of rows, each framed by the start pattern, a left
//! row indicator, the data columns, a right row indicator and the stop
//! pattern. The located quad is read line by line: every line that crosses
//! a row yields the codewords found near their expected positions, the row
//! indicators tell which row the line crossed and carry the row count,
//! column count and error correction level. Codewords are voted per
//! position over all lines of their row.

/// Cluster pattern tables
pub mod codewords;
/// Text, byte and numeric compaction
pub mod compaction;

use std::cmp::Reverse;
use std::collections::HashMap;

use log::trace;

use self::codewords::{CODEWORD_MODULES, Widths, lookup};
use super::SymbolDecoder;
use crate::correction::{CorrectedPayload, PDF417_FIELD, RawData, RawPayload};
use crate::models::{BitMatrix, Candidate, Point, Symbology, SymbologyFamily};
use crate::utils::geometry::PerspectiveTransform;

/// Start pattern, 17 modules
pub const START_PATTERN: [u8; 8] = [8, 1, 1, 1, 1, 1, 1, 3];
/// Stop pattern, 18 modules ending in a bar
pub const STOP_PATTERN: [u8; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];

pub const MIN_ROWS: usize = 3;
pub const MAX_ROWS: usize = 90;
pub const MAX_COLUMNS: usize = 30;
pub const MAX_LEVEL: usize = 8;

/// Module height of one row
pub const ROW_HEIGHT: usize = 3;

/// Samples taken per module along a scan line
const SAMPLES_PER_MODULE: usize = 8;

/// A codeword may start this many samples away from its nominal position
const POSITION_TOLERANCE: usize = 6;

/// Width in modules of a symbol with `columns` data columns
pub fn symbol_width(columns: usize) -> usize {
    CODEWORD_MODULES * (columns + 4) + 1
}

/// Check codewords at error correction level `level`
pub fn ecc_codewords(level: usize) -> usize {
    2 << level
}

/// Value each row indicator carries besides the row group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndicatorField {
    /// (rows - 1) / 3
    Rows,
    /// columns - 1
    Columns,
    /// 3 * level + (rows - 1) % 3
    Level,
}

fn indicator_field(cluster: usize, right: bool) -> IndicatorField {
    match (cluster, right) {
        (0, false) | (1, true) => IndicatorField::Rows,
        (1, false) | (2, true) => IndicatorField::Level,
        _ => IndicatorField::Columns,
    }
}

/// Left and right row indicator values of `row`
pub fn row_indicators(row: usize, rows: usize, columns: usize, level: usize) -> (u16, u16) {
    let field = |right| match indicator_field(row % 3, right) {
        IndicatorField::Rows => (rows - 1) / 3,
        IndicatorField::Columns => columns - 1,
        IndicatorField::Level => 3 * level + (rows - 1) % 3,
    };
    let group = 30 * (row / 3);
    ((group + field(false)) as u16, (group + field(true)) as u16)
}

/// Occurrences of each value read for one position
#[derive(Debug, Default)]
struct Tally(HashMap<u16, u32>);

impl Tally {
    fn add(&mut self, value: u16) {
        *self.0.entry(value).or_default() += 1;
    }

    fn best(&self) -> Option<u16> {
        self.0
            .iter()
            .max_by_key(|&(&value, &n)| (n, Reverse(value)))
            .map(|(&value, _)| value)
    }
}

/// One bar or space along a sampled line
#[derive(Debug, Clone, Copy)]
struct SampleRun {
    start: usize,
    len: usize,
    dark: bool,
}

fn sample_runs(samples: &[bool]) -> Vec<SampleRun> {
    let mut runs: Vec<SampleRun> = Vec::new();
    for (i, &dark) in samples.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.len += 1,
            _ => runs.push(SampleRun { start: i, len: 1, dark }),
        }
    }
    runs
}

/// Cluster index and value of the codeword starting near `expected`
fn codeword_near(runs: &[SampleRun], expected: usize) -> Option<(usize, u16)> {
    let first = (0..runs.len())
        .filter(|&k| runs[k].dark && runs[k].start.abs_diff(expected) <= POSITION_TOLERANCE)
        .min_by_key(|&k| runs[k].start.abs_diff(expected))?;
    let group = runs.get(first..first + 8)?;
    let nominal = CODEWORD_MODULES * SAMPLES_PER_MODULE;
    let total: usize = group.iter().map(|r| r.len).sum();
    if total.abs_diff(nominal) > nominal / 5 {
        return None;
    }
    let mut widths: Widths = [0; 8];
    for (w, run) in widths.iter_mut().zip(group) {
        *w = ((run.len * CODEWORD_MODULES) as f32 / total as f32).round() as u8;
    }
    if widths.iter().map(|&w| w as usize).sum::<usize>() != CODEWORD_MODULES {
        return None;
    }
    lookup(&widths)
}

/// Codeword and metadata votes collected over all scan lines
#[derive(Debug)]
struct SymbolReader {
    columns: usize,
    rows_field: Tally,
    columns_field: Tally,
    level_field: Tally,
    cells: HashMap<(usize, usize), Tally>,
    lines_read: usize,
}

impl SymbolReader {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            rows_field: Tally::default(),
            columns_field: Tally::default(),
            level_field: Tally::default(),
            cells: HashMap::new(),
            lines_read: 0,
        }
    }

    fn read_line(&mut self, samples: &[bool]) {
        let runs = sample_runs(samples);
        let slot = |j: usize| codeword_near(&runs, (j + 1) * CODEWORD_MODULES * SAMPLES_PER_MODULE);

        let indicators = [(slot(0), false), (slot(self.columns + 1), true)];
        let mut row = None;
        for (codeword, right) in indicators {
            let Some((cluster, value)) = codeword else {
                continue;
            };
            let this_row = 3 * (value as usize / 30) + cluster;
            if row.is_some_and(|r| r != this_row) {
                return;
            }
            row = Some(this_row);
            let field = value % 30;
            match indicator_field(cluster, right) {
                IndicatorField::Rows => self.rows_field.add(field),
                IndicatorField::Columns => self.columns_field.add(field),
                IndicatorField::Level => self.level_field.add(field),
            }
        }
        let Some(row) = row else {
            return;
        };

        self.lines_read += 1;
        for column in 0..self.columns {
            match slot(column + 1) {
                Some((cluster, value)) if cluster == row % 3 => {
                    self.cells.entry((row, column)).or_default().add(value)
                }
                _ => {}
            }
        }
    }

    /// Rows, level and codewords in symbol order, missing ones as zero
    fn finish(&self) -> Option<(usize, usize, Vec<u16>, f32)> {
        let rows_field = self.rows_field.best()? as usize;
        let level_field = self.level_field.best()? as usize;
        let columns = self.columns_field.best()? as usize + 1;
        if columns != self.columns {
            trace!("pdf417: indicators give {columns} columns, geometry {}", self.columns);
            return None;
        }
        let rows = 3 * rows_field + level_field % 3 + 1;
        let level = level_field / 3;
        if !(MIN_ROWS..=MAX_ROWS).contains(&rows) || level > MAX_LEVEL {
            return None;
        }

        let mut found = 0;
        let mut codewords = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for column in 0..columns {
                let value = self.cells.get(&(row, column)).and_then(Tally::best);
                found += value.is_some() as usize;
                codewords.push(value.unwrap_or(0));
            }
        }
        if codewords.len() <= ecc_codewords(level) {
            return None;
        }
        let quality = found as f32 / codewords.len() as f32;
        Some((rows, level, codewords, quality))
    }
}

/// Decoder for PDF417 symbols
#[derive(Debug, Default)]
pub struct Pdf417Decoder;

impl Pdf417Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolDecoder for Pdf417Decoder {
    fn handles(&self, family: SymbologyFamily) -> bool {
        family == SymbologyFamily::Pdf417
    }

    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload> {
        let quad = &candidate.quad;
        if candidate.module_size <= 0.0 {
            return None;
        }
        let (tl, tr) = (quad.top_left(), quad.top_right());
        let (br, bl) = (quad.bottom_right(), quad.bottom_left());
        let width_px = (tl.distance(&tr) + bl.distance(&br)) / 2.0;
        let modules = width_px / candidate.module_size;
        let columns = ((modules - symbol_width(0) as f32) / CODEWORD_MODULES as f32).round();
        if !(1.0..=MAX_COLUMNS as f32).contains(&columns) {
            trace!("pdf417: {modules:.1} modules wide");
            return None;
        }
        let columns = columns as usize;
        let width = symbol_width(columns);
        let transform = PerspectiveTransform::grid_to_quad(width as f32, 1.0, quad)?;

        let lines = tl.distance(&bl).max(tr.distance(&br)).ceil().max(1.0) as usize;
        let mut reader = SymbolReader::new(columns);
        let mut samples = vec![false; width * SAMPLES_PER_MODULE];
        for i in 0..lines {
            let v = (i as f32 + 0.5) / lines as f32;
            for (k, sample) in samples.iter_mut().enumerate() {
                let u = (k as f32 + 0.5) / SAMPLES_PER_MODULE as f32;
                let p = transform.transform(&Point::new(u, v));
                *sample = image.get_signed(p.x.floor() as i32, p.y.floor() as i32);
            }
            reader.read_line(&samples);
        }

        let (rows, level, codewords, quality) = reader.finish()?;
        trace!(
            "pdf417: {rows}x{columns} level {level}, {} of {lines} lines read",
            reader.lines_read
        );
        Some(RawPayload {
            symbology: Symbology::Pdf417,
            quad: *quad,
            quality,
            version: level,
            data: RawData::Symbols {
                codewords,
                ecc: ecc_codewords(level),
                field: &PDF417_FIELD,
            },
        })
    }

    fn interpret(&self, payload: &CorrectedPayload) -> Option<String> {
        compaction::decode(&payload.symbols)
    }
}
