//! PDF417 symbol construction
//!
//! Runs of 13 or more digits use numeric compaction, runs of text
//! characters text compaction, and everything else byte compaction (a lone
//! byte between text goes behind a byte shift). The error correction level
//! grows with the data; the column count is chosen to keep the symbol about
//! three times as wide as it is tall.

use log::trace;

use crate::correction::{CodewordCodec, PDF417_FIELD};
use crate::decoder::pdf417::codewords;
use crate::decoder::pdf417::compaction::{
    BYTE_LATCH, BYTE_LATCH_6, BYTE_SHIFT, ECI_CHARSET, NUMERIC_CHUNK_DIGITS, NUMERIC_LATCH,
    SubMode, TEXT_LATCH, text_value, to_base900,
};
use crate::decoder::pdf417::{
    MAX_COLUMNS, MAX_ROWS, MIN_ROWS, ROW_HEIGHT, START_PATTERN, STOP_PATTERN, ecc_codewords,
    row_indicators, symbol_width,
};
use crate::error::{Error, Result};
use crate::models::{BitMatrix, Symbology};

/// Shortest digit run worth a switch to numeric compaction
const MIN_NUMERIC_RUN: usize = 13;

/// Shortest text run worth a switch to text compaction
const MIN_TEXT_RUN: usize = 5;

/// Largest count of data codewords, length descriptor included
const MAX_DATA_CODEWORDS: usize = 863;

/// ECI designator for UTF-8
const ECI_UTF8: u16 = 26;

/// Width over height a symbol aims for
const PREFERRED_RATIO: f32 = 3.0;

const PUNCT_SHIFT: u16 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compaction {
    Text,
    Byte,
    Numeric,
}

fn is_text(b: u8) -> bool {
    [SubMode::Alpha, SubMode::Lower, SubMode::Mixed, SubMode::Punct]
        .into_iter()
        .any(|mode| text_value(mode, b).is_some())
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Text characters from the start of `bytes` up to a digit run worth numeric compaction
fn text_run(bytes: &[u8]) -> usize {
    let mut i = 0;
    while i < bytes.len() && is_text(bytes[i]) {
        let digits = digit_run(&bytes[i..]);
        if digits >= MIN_NUMERIC_RUN {
            break;
        }
        i += digits.max(1);
    }
    i
}

/// Bytes from the start of `bytes` up to the next text or digit run worth switching for
fn byte_run(bytes: &[u8]) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        if digit_run(&bytes[i..]) >= MIN_NUMERIC_RUN || text_run(&bytes[i..]) >= MIN_TEXT_RUN {
            break;
        }
        i += 1;
    }
    i.max(1)
}

/// Values of text sub-modes, two per codeword
#[derive(Debug)]
struct TextEncoder {
    mode: SubMode,
    values: Vec<u16>,
}

impl TextEncoder {
    fn new() -> Self {
        Self {
            mode: SubMode::Alpha,
            values: Vec::new(),
        }
    }

    fn latch(&mut self, to: SubMode) {
        let codes: &[u16] = match (self.mode, to) {
            (SubMode::Alpha, SubMode::Lower) | (SubMode::Mixed, SubMode::Lower) => &[27],
            (SubMode::Alpha | SubMode::Lower, SubMode::Mixed) => &[28],
            (SubMode::Alpha | SubMode::Lower, SubMode::Punct) => &[28, 25],
            (SubMode::Lower, SubMode::Alpha) => &[28, 28],
            (SubMode::Mixed, SubMode::Alpha) => &[28],
            (SubMode::Mixed, SubMode::Punct) => &[25],
            (SubMode::Punct, SubMode::Alpha) => &[29],
            (SubMode::Punct, SubMode::Lower) => &[29, 27],
            (SubMode::Punct, SubMode::Mixed) => &[29, 28],
            _ => &[],
        };
        self.values.extend_from_slice(codes);
        self.mode = to;
    }

    fn push(&mut self, b: u8) {
        if let Some(value) = text_value(self.mode, b) {
            self.values.push(value);
            return;
        }
        let target = [SubMode::Alpha, SubMode::Lower, SubMode::Mixed]
            .into_iter()
            .find(|&m| text_value(m, b).is_some());
        match (target, text_value(SubMode::Punct, b)) {
            (Some(target), _) => {
                self.latch(target);
                self.values.extend(text_value(target, b));
            }
            (None, Some(value)) => {
                self.values.push(PUNCT_SHIFT);
                self.values.push(value);
            }
            (None, None) => {}
        }
    }

    /// Pair up the pending values into codewords
    fn flush(&mut self, out: &mut Vec<u16>) {
        if self.values.len() % 2 == 1 {
            self.values.push(PUNCT_SHIFT);
            // A shift in Punct is the latch back to Alpha
            if self.mode == SubMode::Punct {
                self.mode = SubMode::Alpha;
            }
        }
        out.extend(self.values.chunks(2).map(|pair| pair[0] * 30 + pair[1]));
        self.values.clear();
    }
}

fn push_bytes(bytes: &[u8], out: &mut Vec<u16>) {
    out.push(if bytes.len() % 6 == 0 { BYTE_LATCH_6 } else { BYTE_LATCH });
    let mut groups = bytes.chunks_exact(6);
    for group in groups.by_ref() {
        let value = group.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        out.extend((0..5).rev().map(|k| (value / 900u64.pow(k) % 900) as u16));
    }
    out.extend(groups.remainder().iter().map(|&b| b as u16));
}

fn push_digits(digits: &[u8], out: &mut Vec<u16>) {
    out.push(NUMERIC_LATCH);
    for chunk in digits.chunks(NUMERIC_CHUNK_DIGITS) {
        let mut number = vec![1u8];
        number.extend(chunk.iter().map(|&d| d - b'0'));
        out.extend(to_base900(&number));
    }
}

/// Data codewords of `text`, without the length descriptor
fn high_level_codewords(text: &str) -> Vec<u16> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    if !text.is_ascii() {
        out.extend([ECI_CHARSET, ECI_UTF8]);
    }
    let mut text_encoder = TextEncoder::new();
    let mut mode = Compaction::Text;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        let digits = digit_run(rest);
        if digits >= MIN_NUMERIC_RUN {
            text_encoder.flush(&mut out);
            push_digits(&rest[..digits], &mut out);
            mode = Compaction::Numeric;
            i += digits;
            continue;
        }
        let text_len = text_run(rest);
        if text_len >= MIN_TEXT_RUN || (text_len > 0 && text_len == rest.len()) {
            if mode != Compaction::Text {
                out.push(TEXT_LATCH);
                text_encoder = TextEncoder::new();
                mode = Compaction::Text;
            }
            for &b in &rest[..text_len] {
                text_encoder.push(b);
            }
            i += text_len;
            continue;
        }
        let len = byte_run(rest);
        if len == 1 && mode == Compaction::Text {
            text_encoder.flush(&mut out);
            out.extend([BYTE_SHIFT, rest[0] as u16]);
        } else {
            text_encoder.flush(&mut out);
            push_bytes(&rest[..len], &mut out);
            mode = Compaction::Byte;
        }
        i += len;
    }
    text_encoder.flush(&mut out);
    out
}

/// Error correction level for `n` data codewords
fn level_for(n: usize) -> usize {
    match n {
        0..=40 => 2,
        41..=160 => 3,
        161..=320 => 4,
        _ => 5,
    }
}

/// Rows and columns holding `total` codewords closest to the preferred aspect ratio
fn dimensions(total: usize) -> Option<(usize, usize)> {
    (1..=MAX_COLUMNS)
        .filter_map(|columns| {
            let rows = total.div_ceil(columns).max(MIN_ROWS);
            (rows <= MAX_ROWS && rows * columns <= 928).then_some((rows, columns))
        })
        .min_by(|&(r1, c1), &(r2, c2)| {
            let off = |r: usize, c: usize| {
                let ratio = symbol_width(c) as f32 / (ROW_HEIGHT * r) as f32;
                (ratio - PREFERRED_RATIO).abs()
            };
            off(r1, c1).total_cmp(&off(r2, c2))
        })
}

/// Module grid for `text`
pub fn encode(text: &str) -> Result<BitMatrix> {
    let data = high_level_codewords(text);
    let n = data.len() + 1;
    if n > MAX_DATA_CODEWORDS {
        return Err(Error::encode(
            Symbology::Pdf417,
            format!("{n} data codewords exceed capacity"),
        ));
    }
    let level = level_for(n);
    let ecc = ecc_codewords(level);
    let (rows, columns) = dimensions(n + ecc).ok_or_else(|| {
        Error::encode(Symbology::Pdf417, format!("no symbol holds {} codewords", n + ecc))
    })?;

    let mut codewords = Vec::with_capacity(rows * columns);
    codewords.push((rows * columns - ecc) as u16);
    codewords.extend(&data);
    codewords.resize(rows * columns - ecc, TEXT_LATCH);
    let check = CodewordCodec::new(&PDF417_FIELD, ecc).encode(&codewords);
    codewords.extend(check);
    trace!("pdf417: {n} data codewords in {rows}x{columns}, level {level}");

    let width = symbol_width(columns);
    let mut grid = BitMatrix::new(width, rows * ROW_HEIGHT);
    for row in 0..rows {
        let cluster = row % 3;
        let (left, right) = row_indicators(row, rows, columns, level);
        let row_codewords = &codewords[row * columns..(row + 1) * columns];

        let mut modules: Vec<bool> = Vec::with_capacity(width);
        let mut push_widths = |widths: &[u8]| {
            for (i, &w) in widths.iter().enumerate() {
                modules.extend(std::iter::repeat_n(i % 2 == 0, w as usize));
            }
        };
        push_widths(&START_PATTERN);
        push_widths(&codewords::pattern(cluster, left));
        for &codeword in row_codewords {
            push_widths(&codewords::pattern(cluster, codeword));
        }
        push_widths(&codewords::pattern(cluster, right));
        push_widths(&STOP_PATTERN);
        debug_assert_eq!(modules.len(), width);

        for (x, &dark) in modules.iter().enumerate() {
            for y in row * ROW_HEIGHT..(row + 1) * ROW_HEIGHT {
                grid.set(x, y, dark);
            }
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::correction::correct;
    use crate::decoder::SymbolDecoder;
    use crate::decoder::pdf417::Pdf417Decoder;
    use crate::decoder::pdf417::codewords::CODEWORD_MODULES;
    use crate::decoder::pdf417::compaction;
    use crate::models::{Candidate, Quad, SymbologyFamily};

    /// Decode a rendered grid scaled by `unit` pixels per module
    fn read_back(grid: &BitMatrix, unit: usize) -> Option<String> {
        let quiet = 2 * unit;
        let mut image =
            BitMatrix::new(grid.width() * unit + 2 * quiet, grid.height() * unit + 2 * quiet);
        for y in 0..grid.height() * unit {
            for x in 0..grid.width() * unit {
                image.set(quiet + x, quiet + y, grid.get(x / unit, y / unit));
            }
        }
        let candidate = Candidate {
            family: SymbologyFamily::Pdf417,
            quad: Quad::from_rect(
                quiet as f32,
                quiet as f32,
                (quiet + grid.width() * unit) as f32,
                (quiet + grid.height() * unit) as f32,
            ),
            module_size: unit as f32,
            confidence: 1.0,
            grid: None,
        };
        let decoder = Pdf417Decoder::new();
        let raw = decoder.try_decode(&candidate, &image)?;
        let corrected = correct(raw, &DecodeOptions::default()).ok()?;
        decoder.interpret(&corrected)
    }

    fn decode_codewords(text: &str) -> Option<String> {
        let mut codewords = vec![0];
        codewords.extend(high_level_codewords(text));
        codewords[0] = codewords.len() as u16;
        compaction::decode(&codewords)
    }

    #[test]
    fn test_compaction_choices() {
        // Alpha pair codewords, then a PS pad
        assert_eq!(high_level_codewords("ABC"), vec![1, 2 * 30 + 29]);
        let numeric = high_level_codewords("12345678901234");
        assert_eq!(numeric[0], NUMERIC_LATCH);
        assert_eq!(numeric.len(), 1 + 5);
        let bytes = high_level_codewords("\u{1}\u{2}\u{3}\u{4}\u{5}\u{6}");
        assert_eq!(bytes, {
            let value = 0x010203040506u64;
            let mut expected = vec![BYTE_LATCH_6];
            expected.extend((0..5).rev().map(|k| (value / 900u64.pow(k) % 900) as u16));
            expected
        });
    }

    #[test]
    fn test_high_level_round_trip() {
        for text in [
            "PDF417",
            "Mixed Case text, with punctuation; and {braces}!",
            "Invoice 000123456789012345 due 2026-10-19",
            "tab\tand\r\nnewline",
            "bytes \u{1} between \u{7f} text",
            "Grüße aus Köln",
            "lowercase@example.com",
        ] {
            assert_eq!(decode_codewords(text).as_deref(), Some(text), "{text}");
        }
    }

    #[test]
    fn test_dimensions_prefer_wide_symbols() {
        let (rows, columns) = dimensions(20).unwrap();
        assert_eq!((rows, columns), (10, 2));
        assert_eq!(dimensions(929), None);
        let (rows, columns) = dimensions(3).unwrap();
        assert!(rows >= MIN_ROWS && rows * columns >= 3);
    }

    #[test]
    fn test_symbol_geometry() {
        let grid = encode("PDF417").unwrap();
        assert_eq!((grid.width() - 69) % CODEWORD_MODULES, 0);
        assert_eq!(grid.height() % ROW_HEIGHT, 0);
        // Start pattern bar and stop pattern end bar on every row
        for y in 0..grid.height() {
            assert!((0..8).all(|x| grid.get(x, y)));
            assert!(grid.get(grid.width() - 1, y));
        }
    }

    #[test]
    fn test_rendered_symbol_round_trip() {
        for text in ["PDF417", "Stacked rows of codewords 1234567890123456"] {
            let grid = encode(text).unwrap();
            assert_eq!(read_back(&grid, 2).as_deref(), Some(text), "{text}");
        }
    }

    #[test]
    fn test_damaged_codewords_are_corrected() {
        let text = "Damage within the correction budget";
        let mut grid = encode(text).unwrap();
        // Smear one data codeword of the first row across all its lines
        for y in 0..ROW_HEIGHT {
            for x in 2 * CODEWORD_MODULES..2 * CODEWORD_MODULES + 6 {
                grid.set(x, y, true);
            }
        }
        assert_eq!(read_back(&grid, 2).as_deref(), Some(text));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let text = "\u{1}".repeat(2000);
        assert!(encode(&text).is_err());
    }
}
