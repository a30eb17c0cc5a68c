//! Aztec Code decoding
//!
//! The located quad is oriented so that the three-module orientation mark
//! sits at the top-left of the bullseye. The mode message around the
//! bullseye gives the layer count and the number of data words; the layers
//! are read as 2-module wide bands spiralling inwards, outermost first.

/// Character modes and their code tables
pub mod text;

use log::trace;

use super::SymbolDecoder;
use crate::correction::{
    AZTEC_FIELD_6, AZTEC_FIELD_8, AZTEC_FIELD_10, AZTEC_FIELD_12, AZTEC_MODE_FIELD, CodewordCodec,
    CodewordField, CorrectedPayload, RawData, RawPayload,
};
use crate::models::{BitMatrix, Candidate, Symbology, SymbologyFamily};
use crate::utils::geometry::{PerspectiveTransform, sample_grid};

/// Minimum fraction of bullseye and orientation modules that must match
const MIN_BULLSEYE_QUALITY: f32 = 0.85;

/// Size and layer structure of one Aztec symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AztecLayout {
    /// Compact symbols have a 2-ring bullseye and no reference grid
    pub compact: bool,
    /// Data layers around the core
    pub layers: usize,
}

impl AztecLayout {
    /// Layout for a layer count the format allows
    pub fn new(compact: bool, layers: usize) -> Option<Self> {
        let max = if compact { 4 } else { 32 };
        (1..=max).contains(&layers).then_some(Self { compact, layers })
    }

    /// Layouts whose symbol is `size` modules wide
    pub fn for_size(size: usize) -> impl Iterator<Item = Self> {
        let compact = (1..=4).filter_map(|l| Self::new(true, l));
        let full = (1..=32).filter_map(|l| Self::new(false, l));
        compact.chain(full).filter(move |layout| layout.size() == size)
    }

    /// Width without reference grid lines
    fn base_size(&self) -> usize {
        (if self.compact { 11 } else { 14 }) + 4 * self.layers
    }

    /// Symbol width in modules
    pub fn size(&self) -> usize {
        let base = self.base_size();
        if self.compact {
            base
        } else {
            base + 1 + 2 * ((base / 2 - 1) / 15)
        }
    }

    /// Ring of the mode message and orientation marks
    pub fn core_radius(&self) -> i32 {
        if self.compact { 5 } else { 7 }
    }

    /// Bits per data word
    pub fn word_size(&self) -> usize {
        word_size(self.layers)
    }

    /// Field of the data words
    pub fn field(&self) -> &'static CodewordField {
        match self.word_size() {
            6 => &AZTEC_FIELD_6,
            8 => &AZTEC_FIELD_8,
            10 => &AZTEC_FIELD_10,
            _ => &AZTEC_FIELD_12,
        }
    }

    /// Bits held by all layers
    pub fn total_bits(&self) -> usize {
        ((if self.compact { 88 } else { 112 }) + 16 * self.layers) * self.layers
    }

    /// Whole words that fit in the layers
    pub fn total_words(&self) -> usize {
        self.total_bits() / self.word_size()
    }

    /// Most data words the mode message can announce
    pub fn max_data_words(&self) -> usize {
        if self.compact { 64 } else { 2048 }
    }

    /// Module coordinate of each base-grid index, skipping reference grid lines
    fn alignment_map(&self) -> Vec<usize> {
        let base = self.base_size();
        if self.compact {
            return (0..base).collect();
        }
        let mut map = vec![0; base];
        let center = self.size() / 2;
        let half = base / 2;
        for i in 0..half {
            let offset = i + i / 15;
            map[half - i - 1] = center - offset - 1;
            map[half + i] = center + offset + 1;
        }
        map
    }

    /// Module `(x, y)` of every layer bit, outermost layer first
    pub fn bit_positions(&self) -> Vec<(usize, usize)> {
        let map = self.alignment_map();
        let base = self.base_size();
        let mut positions = vec![(0, 0); self.total_bits()];
        let mut offset = 0;
        for layer in 0..self.layers {
            let row_size = (self.layers - layer) * 4 + if self.compact { 9 } else { 12 };
            let low = layer * 2;
            let high = base - 1 - low;
            for j in 0..row_size {
                for k in 0..2 {
                    let at = offset + 2 * j + k;
                    positions[at] = (map[low + k], map[low + j]);
                    positions[at + 2 * row_size] = (map[low + j], map[high - k]);
                    positions[at + 4 * row_size] = (map[high - k], map[high - j]);
                    positions[at + 6 * row_size] = (map[high - j], map[low + k]);
                }
            }
            offset += 8 * row_size;
        }
        positions
    }
}

/// Bits per data word for a layer count
pub fn word_size(layers: usize) -> usize {
    match layers {
        0..=2 => 6,
        3..=8 => 8,
        9..=22 => 10,
        _ => 12,
    }
}

/// Offsets from the centre module of each mode message bit
pub fn mode_message_offsets(compact: bool) -> Vec<(i32, i32)> {
    let (side, ring) = if compact { (7, 5) } else { (10, 7) };
    let mut offsets = vec![(0, 0); 4 * side];
    for i in 0..side {
        let along = if compact {
            i as i32 - 3
        } else {
            i as i32 - 5 + (i / 5) as i32
        };
        offsets[i] = (along, -ring);
        offsets[i + side] = (ring, along);
        offsets[3 * side - 1 - i] = (along, ring);
        offsets[4 * side - 1 - i] = (-ring, along);
    }
    offsets
}

/// Check words of the mode message
fn mode_ecc(compact: bool) -> usize {
    if compact { 5 } else { 6 }
}

/// Mode message bits announcing `layout` with `data_words` data words
pub fn mode_message(layout: &AztecLayout, data_words: usize) -> Vec<bool> {
    let (value, data_len) = if layout.compact {
        ((((layout.layers - 1) << 6) | (data_words - 1)) as u16, 2)
    } else {
        ((((layout.layers - 1) << 11) | (data_words - 1)) as u16, 4)
    };
    let mut words: Vec<u16> = (0..data_len)
        .map(|i| (value >> (4 * (data_len - 1 - i))) & 0xF)
        .collect();
    words.extend(CodewordCodec::new(&AZTEC_MODE_FIELD, mode_ecc(layout.compact)).encode(&words));
    words
        .iter()
        .flat_map(|&w| (0..4).rev().map(move |i| (w >> i) & 1 == 1))
        .collect()
}

/// Layout and data word count from the mode message read by `module`
///
/// `module(dx, dy)` reports the module at that offset from the centre.
pub fn read_mode_message(
    compact: bool,
    module: impl Fn(i32, i32) -> bool,
) -> Option<(AztecLayout, usize)> {
    let bits: Vec<bool> = mode_message_offsets(compact)
        .into_iter()
        .map(|(dx, dy)| module(dx, dy))
        .collect();
    let mut words: Vec<u16> = bits
        .chunks(4)
        .map(|chunk| chunk.iter().fold(0, |acc, &b| (acc << 1) | b as u16))
        .collect();
    CodewordCodec::new(&AZTEC_MODE_FIELD, mode_ecc(compact))
        .decode(&mut words)
        .ok()?;
    let data_len = if compact { 2 } else { 4 };
    let value = words[..data_len].iter().fold(0usize, |acc, &w| (acc << 4) | w as usize);
    let (layers, data_words) = if compact {
        ((value >> 6) + 1, (value & 0x3F) + 1)
    } else {
        ((value >> 11) + 1, (value & 0x7FF) + 1)
    };
    let layout = AztecLayout::new(compact, layers)?;
    (data_words < layout.total_words()).then_some((layout, data_words))
}

/// Expected colour of the bullseye and orientation modules, as centre offsets
pub fn core_pattern(compact: bool) -> Vec<((i32, i32), bool)> {
    let s: i32 = if compact { 5 } else { 7 };
    let mut pattern = Vec::with_capacity(((2 * s - 1) * (2 * s - 1) + 12) as usize);
    for dy in -(s - 1)..s {
        for dx in -(s - 1)..s {
            pattern.push(((dx, dy), dx.abs().max(dy.abs()) % 2 == 0));
        }
    }
    pattern.extend([
        ((-s, -s), true),
        ((-s + 1, -s), true),
        ((-s, -s + 1), true),
        ((s, -s), true),
        ((s, -s + 1), true),
        ((s - 1, -s), false),
        ((s, s - 1), true),
        ((s, s), false),
        ((s - 1, s), false),
        ((-s, s), false),
        ((-s + 1, s), false),
        ((-s, s - 1), false),
    ]);
    pattern
}

/// Fraction of core modules read by `module` with the expected colour
pub fn core_quality(compact: bool, module: impl Fn(i32, i32) -> bool) -> f32 {
    let pattern = core_pattern(compact);
    let matches = pattern
        .iter()
        .filter(|&&((dx, dy), dark)| module(dx, dy) == dark)
        .count();
    matches as f32 / pattern.len() as f32
}

/// Module grid of a complete symbol
///
/// `layer_bits` holds every layer bit (start padding, data then check words)
/// in reading order.
pub fn render_symbol(layout: &AztecLayout, mode_bits: &[bool], layer_bits: &[bool]) -> BitMatrix {
    let size = layout.size();
    let center = (size / 2) as i32;
    let mut grid = BitMatrix::new(size, size);
    for (&(x, y), &dark) in layout.bit_positions().iter().zip(layer_bits) {
        if dark {
            grid.set(x, y, true);
        }
    }
    for (&(dx, dy), &dark) in mode_message_offsets(layout.compact).iter().zip(mode_bits) {
        if dark {
            grid.set((center + dx) as usize, (center + dy) as usize, true);
        }
    }
    if !layout.compact {
        // Reference grid: every other module on lines 16 apart through the centre
        let c = size / 2;
        let lines = (layout.base_size() / 2 - 1).div_ceil(15);
        for j in (0..lines).map(|n| 16 * n) {
            for k in (c & 1..size).step_by(2) {
                grid.set(c - j, k, true);
                grid.set(c + j, k, true);
                grid.set(k, c - j, true);
                grid.set(k, c + j, true);
            }
        }
    }
    for ((dx, dy), dark) in core_pattern(layout.compact) {
        grid.set((center + dx) as usize, (center + dy) as usize, dark);
    }
    grid
}

/// Data and check words of a sampled symbol, in reading order
pub fn read_words(layout: &AztecLayout, grid: &BitMatrix) -> Vec<u16> {
    let w = layout.word_size();
    let bits: Vec<bool> = layout
        .bit_positions()
        .into_iter()
        .map(|(x, y)| grid.get(x, y))
        .collect();
    bits[layout.total_bits() % w..]
        .chunks_exact(w)
        .map(|chunk| chunk.iter().fold(0, |acc, &b| (acc << 1) | b as u16))
        .collect()
}

/// Data bits of corrected words with the stuffed bits removed
///
/// A word of all zeros or all ones never occurs; words 1 and 2^w - 2 carry
/// w - 1 copies of their leading bit.
pub fn unstuff(words: &[u16], word_size: usize) -> Option<Vec<bool>> {
    let mask = (1u16 << word_size) - 1;
    let mut bits = Vec::with_capacity(words.len() * word_size);
    for &word in words {
        if word == 0 || word == mask {
            return None;
        }
        if word == 1 || word == mask - 1 {
            bits.extend(std::iter::repeat_n(word > 1, word_size - 1));
        } else {
            bits.extend((0..word_size).rev().map(|i| (word >> i) & 1 == 1));
        }
    }
    Some(bits)
}

/// Decoder for compact and full-range Aztec symbols
#[derive(Debug, Default)]
pub struct AztecDecoder;

impl AztecDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Layout, data word count and core quality of a sampled grid
    pub fn read_header(grid: &BitMatrix) -> Option<(AztecLayout, usize, f32)> {
        let center = (grid.width() / 2) as i32;
        let module = |dx: i32, dy: i32| grid.get_signed(center + dx, center + dy);
        let (layout, quality) = AztecLayout::for_size(grid.width())
            .map(|layout| (layout, core_quality(layout.compact, module)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if quality < MIN_BULLSEYE_QUALITY {
            trace!("aztec: core quality {quality:.2}");
            return None;
        }
        let (announced, data_words) = read_mode_message(layout.compact, module)?;
        if announced != layout {
            trace!("aztec: mode message announces {} layers", announced.layers);
            return None;
        }
        Some((layout, data_words, quality))
    }
}

impl SymbolDecoder for AztecDecoder {
    fn handles(&self, family: SymbologyFamily) -> bool {
        family == SymbologyFamily::Aztec
    }

    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload> {
        let (rows, cols) = candidate.grid?;
        if rows != cols {
            return None;
        }
        let transform =
            PerspectiveTransform::grid_to_quad(cols as f32, rows as f32, &candidate.quad)?;
        let Some(grid) = sample_grid(image, &transform, cols, rows, candidate.module_size) else {
            trace!("aztec: {rows}x{cols} grid leaves the image");
            return None;
        };
        let (layout, data_words, quality) = Self::read_header(&grid)?;
        let codewords = read_words(&layout, &grid);
        let ecc = codewords.len() - data_words;
        Some(RawPayload {
            symbology: Symbology::Aztec,
            quad: candidate.quad,
            quality,
            version: layout.layers,
            data: RawData::Symbols {
                codewords,
                ecc,
                field: layout.field(),
            },
        })
    }

    fn interpret(&self, payload: &CorrectedPayload) -> Option<String> {
        let bits = unstuff(&payload.symbols, word_size(payload.version))?;
        text::decode(&bits)
    }
}
