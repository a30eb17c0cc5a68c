//! QR Code Model 2 symbol construction
//!
//! The payload becomes a single segment in the most compact mode that
//! covers it: numeric, alphanumeric, or byte. Non-ASCII text is sent as
//! UTF-8 bytes behind an ECI 26 designator. The smallest version holding the
//! segment at the requested error correction level is used, and the mask
//! with the lowest penalty score is applied.

use log::trace;

use crate::correction::ReedSolomonEncoder;
use crate::correction::galois::QR_FIELD;
use crate::decoder::modes::alphanumeric::alphanumeric_value;
use crate::decoder::qr::format::{FormatInfo, draw_version};
use crate::decoder::qr::function_mask::{FunctionMask, alignment_centers};
use crate::decoder::qr::payload::{char_count_bits, mode};
use crate::decoder::qr::tables::{block_layout, data_codewords, dimension};
use crate::error::{Error, Result};
use crate::models::{BitMatrix, ECLevel, MaskPattern, Symbology};

const ECI_UTF8: u32 = 26;
const PAD_BYTES: [u8; 2] = [0xEC, 0x11];
const FINDER_LIKE: [bool; 7] = [true, false, true, true, true, false, true];

/// MSB-first bit accumulator
#[derive(Debug, Default)]
struct BitBuffer {
    bits: Vec<bool>,
}

impl BitBuffer {
    fn push(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    fn len(&self) -> usize {
        self.bits.len()
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &b)| acc | ((b as u8) << (7 - i)))
            })
            .collect()
    }
}

/// Encoding of the single data segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl Mode {
    fn select(text: &str) -> Self {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            Mode::Numeric
        } else if !text.is_empty() && text.chars().all(|c| alphanumeric_value(c).is_some()) {
            Mode::Alphanumeric
        } else {
            Mode::Byte
        }
    }

    fn indicator(self) -> u32 {
        match self {
            Mode::Numeric => mode::NUMERIC,
            Mode::Alphanumeric => mode::ALPHANUMERIC,
            Mode::Byte => mode::BYTE,
        }
    }

    /// Bits taken by `count` characters, header excluded
    fn data_bits(self, count: usize) -> usize {
        match self {
            Mode::Numeric => 10 * (count / 3) + [0, 4, 7][count % 3],
            Mode::Alphanumeric => 11 * (count / 2) + 6 * (count % 2),
            Mode::Byte => 8 * count,
        }
    }
}

struct Segment<'a> {
    mode: Mode,
    text: &'a str,
    eci: bool,
}

impl<'a> Segment<'a> {
    fn new(text: &'a str) -> Self {
        let mode = Mode::select(text);
        Self {
            mode,
            text,
            eci: mode == Mode::Byte && !text.is_ascii(),
        }
    }

    /// Characters counted by the count field
    fn count(&self) -> usize {
        match self.mode {
            Mode::Byte => self.text.len(),
            _ => self.text.chars().count(),
        }
    }

    /// Bits of the segment at `version`, or `None` if the count field overflows
    fn bit_len(&self, version: u8) -> Option<usize> {
        let count_bits = char_count_bits(self.mode.indicator(), version);
        if self.count() >= 1 << count_bits {
            return None;
        }
        let eci = if self.eci { 12 } else { 0 };
        Some(eci + 4 + count_bits + self.mode.data_bits(self.count()))
    }

    fn write(&self, version: u8, buffer: &mut BitBuffer) {
        if self.eci {
            buffer.push(mode::ECI, 4);
            buffer.push(ECI_UTF8, 8);
        }
        buffer.push(self.mode.indicator(), 4);
        buffer.push(self.count() as u32, char_count_bits(self.mode.indicator(), version));
        match self.mode {
            Mode::Numeric => {
                for group in self.text.as_bytes().chunks(3) {
                    let value = group.iter().fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0'));
                    buffer.push(value, [0, 4, 7, 10][group.len()]);
                }
            }
            Mode::Alphanumeric => {
                let values: Vec<u32> = self.text.chars().filter_map(alphanumeric_value).collect();
                for pair in values.chunks(2) {
                    match pair {
                        [a, b] => buffer.push(a * 45 + b, 11),
                        [a] => buffer.push(*a, 6),
                        _ => {}
                    }
                }
            }
            Mode::Byte => {
                for &b in self.text.as_bytes() {
                    buffer.push(u32::from(b), 8);
                }
            }
        }
    }
}

/// Data codewords of `segment` filling a `version` symbol
fn data_stream(segment: &Segment<'_>, version: u8, ec_level: ECLevel) -> Vec<u8> {
    let capacity = data_codewords(version, ec_level);
    let mut buffer = BitBuffer::default();
    segment.write(version, &mut buffer);
    let terminator = (capacity * 8 - buffer.len()).min(4);
    buffer.push(mode::TERMINATOR, terminator);
    let fill = (8 - buffer.len() % 8) % 8;
    buffer.push(0, fill);

    let mut data = buffer.into_bytes();
    let mut pad = PAD_BYTES.iter().cycle();
    while data.len() < capacity {
        data.extend(pad.next());
    }
    data
}

/// Interleaved data and check codewords
fn codewords(data: &[u8], version: u8, ec_level: ECLevel) -> Option<Vec<u8>> {
    let layout = block_layout(version, ec_level)?;
    let blocks: Vec<Vec<u8>> = layout
        .split_data(data)
        .into_iter()
        .zip(layout.blocks())
        .map(|(mut block, spec)| {
            let ecc = ReedSolomonEncoder::new(&QR_FIELD, spec.ecc).encode(&block);
            block.extend_from_slice(&ecc);
            block
        })
        .collect();
    Some(layout.interleave(&blocks))
}

/// Finder, timing and alignment patterns
fn draw_function_patterns(grid: &mut BitMatrix, version: u8) {
    let size = grid.width();
    for (ox, oy) in [(0, 0), (size - 7, 0), (0, size - 7)] {
        for dy in 0..7 {
            for dx in 0..7 {
                let ring = (dx as i32 - 3).abs().max((dy as i32 - 3).abs());
                grid.set(ox + dx, oy + dy, ring != 2);
            }
        }
    }
    for i in 8..size - 8 {
        grid.set(i, 6, i % 2 == 0);
        grid.set(6, i, i % 2 == 0);
    }
    for (cx, cy) in alignment_centers(version) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let (x, y) = ((cx as i32 + dx) as usize, (cy as i32 + dy) as usize);
                grid.set(x, y, dx.abs().max(dy.abs()) != 1);
            }
        }
    }
}

/// Penalty score of a finished symbol, lower is better
pub fn penalty(grid: &BitMatrix) -> u32 {
    let size = grid.width();
    let line = |i: usize, j: usize, horizontal: bool| {
        if horizontal { grid.get(j, i) } else { grid.get(i, j) }
    };
    let mut score = 0u32;

    for horizontal in [true, false] {
        for i in 0..size {
            // Runs of five or more of one colour
            let mut run = 1u32;
            for j in 1..size {
                if line(i, j, horizontal) == line(i, j - 1, horizontal) {
                    run += 1;
                    continue;
                }
                if run >= 5 {
                    score += run - 2;
                }
                run = 1;
            }
            if run >= 5 {
                score += run - 2;
            }

            // Finder-like 1:1:3:1:1 with four light modules on one side
            let module =
                |j: isize| j >= 0 && (j as usize) < size && line(i, j as usize, horizontal);
            for j in 0..size as isize - 6 {
                if !(0..7).all(|k| module(j + k) == FINDER_LIKE[k as usize]) {
                    continue;
                }
                let before = (1..=4).all(|k| !module(j - k));
                let after = (7..11).all(|k| !module(j + k));
                if before || after {
                    score += 40;
                }
            }
        }
    }

    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let c = grid.get(x, y);
            if grid.get(x + 1, y) == c && grid.get(x, y + 1) == c && grid.get(x + 1, y + 1) == c {
                score += 3;
            }
        }
    }

    let dark = grid.count_dark() * 100 / (size * size);
    score + 10 * (dark.abs_diff(50) / 5) as u32
}

/// Module grid for `text`, choosing the mask by penalty unless one is given
pub(crate) fn build(
    text: &str,
    ec_level: ECLevel,
    forced_mask: Option<MaskPattern>,
) -> Result<BitMatrix> {
    let segment = Segment::new(text);
    let version = (1..=40u8)
        .find(|&v| {
            segment
                .bit_len(v)
                .is_some_and(|bits| bits <= data_codewords(v, ec_level) * 8)
        })
        .ok_or_else(|| {
            Error::encode(
                Symbology::QrCode,
                format!("{} bytes exceed capacity at {ec_level:?}", text.len()),
            )
        })?;
    let data = data_stream(&segment, version, ec_level);
    let stream = codewords(&data, version, ec_level).ok_or_else(|| {
        Error::encode(Symbology::QrCode, format!("no block layout for version {version}"))
    })?;

    let size = dimension(version);
    let function = FunctionMask::new(version);
    let mut base = BitMatrix::new(size, size);
    draw_function_patterns(&mut base, version);
    draw_version(&mut base, version);
    let positions = function.data_positions();
    for (i, &(x, y)) in positions.iter().enumerate().take(stream.len() * 8) {
        base.set(x, y, stream[i / 8] & (0x80 >> (i % 8)) != 0);
    }

    let masked = |mask_pattern: MaskPattern| {
        let mut grid = base.clone();
        for &(x, y) in &positions {
            if mask_pattern.is_masked(y, x) {
                grid.toggle(x, y);
            }
        }
        FormatInfo {
            ec_level,
            mask_pattern,
        }
        .draw(&mut grid);
        grid
    };

    let grid = match forced_mask {
        Some(mask_pattern) => masked(mask_pattern),
        None => MaskPattern::ALL
            .iter()
            .map(|&m| masked(m))
            .min_by_key(penalty)
            .unwrap_or(base),
    };
    trace!("qr: encoded {} bytes as version {version} {ec_level:?}", text.len());
    Ok(grid)
}

/// Module grid for `text` at `ec_level`
pub fn encode(text: &str, ec_level: ECLevel) -> Result<BitMatrix> {
    build(text, ec_level, None)
}
