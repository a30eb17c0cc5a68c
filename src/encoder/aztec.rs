//! Aztec Code symbol construction
//!
//! Text goes through the character modes greedily: a character outside the
//! current mode latches to the mode that has it, punctuation uses a one-code
//! shift, and bytes no mode covers go behind a binary shift. The smallest
//! symbol leaving at least a third of its words for error correction is
//! chosen.

use log::trace;

use crate::correction::CodewordCodec;
use crate::decoder::aztec::text::{Mode, char_code};
use crate::decoder::aztec::{AztecLayout, mode_message, render_symbol};
use crate::error::{Error, Result};
use crate::models::{BitMatrix, Symbology};

/// Percentage of the data bits added as error correction, plus a fixed margin
const MIN_ECC_PERCENT: usize = 33;
const ECC_MARGIN_BITS: usize = 11;

/// Longest run a single binary shift can carry
const MAX_BINARY_RUN: usize = 2047 + 31;

const BINARY_SHIFT: u32 = 31;

#[derive(Debug, Default)]
struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    fn push(&mut self, value: u32, n: usize) {
        self.bits.extend((0..n).rev().map(|i| (value >> i) & 1 == 1));
    }
}

/// Codes that take `from` to `to`, each with its width
fn latch_codes(from: Mode, to: Mode) -> &'static [(u32, usize)] {
    match (from, to) {
        (Mode::Upper, Mode::Lower) => &[(28, 5)],
        (Mode::Upper | Mode::Lower, Mode::Mixed) => &[(29, 5)],
        (Mode::Upper | Mode::Lower, Mode::Digit) => &[(30, 5)],
        (Mode::Lower, Mode::Upper) => &[(30, 5), (14, 4)],
        (Mode::Mixed, Mode::Upper) => &[(29, 5)],
        (Mode::Mixed, Mode::Lower) => &[(28, 5)],
        (Mode::Mixed, Mode::Digit) => &[(29, 5), (30, 5)],
        (Mode::Digit, Mode::Upper) => &[(14, 4)],
        (Mode::Digit, Mode::Lower) => &[(14, 4), (28, 5)],
        (Mode::Digit, Mode::Mixed) => &[(14, 4), (29, 5)],
        _ => &[],
    }
}

fn in_any_mode(b: u8) -> bool {
    [Mode::Upper, Mode::Lower, Mode::Mixed, Mode::Punct, Mode::Digit]
        .into_iter()
        .any(|mode| char_code(mode, b).is_some())
}

/// Unstuffed data bits of `bytes`
fn high_level_bits(bytes: &[u8]) -> Vec<bool> {
    let mut out = BitWriter::default();
    let mut mode = Mode::Upper;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(code) = char_code(mode, b) {
            out.push(code, mode.bits());
            i += 1;
            continue;
        }
        let latch_to = [Mode::Upper, Mode::Lower, Mode::Mixed]
            .into_iter()
            .find(|&m| char_code(m, b).is_some());
        if let Some(target) = latch_to {
            for &(code, n) in latch_codes(mode, target) {
                out.push(code, n);
            }
            mode = target;
            continue;
        }
        if let Some(code) = char_code(Mode::Punct, b) {
            out.push(0, mode.bits());
            out.push(code, 5);
            i += 1;
            continue;
        }
        if char_code(Mode::Digit, b).is_some() {
            for &(code, n) in latch_codes(mode, Mode::Digit) {
                out.push(code, n);
            }
            mode = Mode::Digit;
            continue;
        }

        let run = bytes[i..]
            .iter()
            .take(MAX_BINARY_RUN)
            .take_while(|&&b| !in_any_mode(b))
            .count();
        if mode == Mode::Digit {
            for &(code, n) in latch_codes(mode, Mode::Upper) {
                out.push(code, n);
            }
            mode = Mode::Upper;
        }
        out.push(BINARY_SHIFT, 5);
        if run <= 31 {
            out.push(run as u32, 5);
        } else {
            out.push(0, 5);
            out.push((run - 31) as u32, 11);
        }
        for &byte in &bytes[i..i + run] {
            out.push(byte as u32, 8);
        }
        i += run;
    }
    out.bits
}

/// Split `bits` into words, stuffing so that no word is all zeros or all ones
///
/// The last word is padded with ones.
fn stuff_bits(bits: &[bool], word_size: usize) -> Vec<u16> {
    let mask = (1u16 << word_size) - 2;
    let mut words = Vec::with_capacity(bits.len() / word_size + 1);
    let mut i = 0;
    while i < bits.len() {
        let word = (0..word_size).fold(0u16, |acc, j| {
            (acc << 1) | bits.get(i + j).copied().unwrap_or(true) as u16
        });
        if word & mask == mask {
            words.push(word & mask);
            i += word_size - 1;
        } else if word & mask == 0 {
            words.push(word | 1);
            i += word_size - 1;
        } else {
            words.push(word);
            i += word_size;
        }
    }
    words
}

/// Module grid for `text`
pub fn encode(text: &str) -> Result<BitMatrix> {
    let bits = high_level_bits(text.as_bytes());
    let ecc_bits = bits.len() * MIN_ECC_PERCENT / 100 + ECC_MARGIN_BITS;

    for i in 0..=32 {
        let compact = i <= 3;
        let Some(layout) = AztecLayout::new(compact, if compact { i + 1 } else { i }) else {
            continue;
        };
        let total = layout.total_bits();
        if bits.len() + ecc_bits > total {
            continue;
        }
        let w = layout.word_size();
        let words = stuff_bits(&bits, w);
        if words.len() > layout.max_data_words() || words.len() * w + ecc_bits > total - total % w {
            continue;
        }

        let ecc_words = layout.total_words() - words.len();
        let ecc = CodewordCodec::new(layout.field(), ecc_words).encode(&words);
        let mut layer_bits = vec![false; total % w];
        for &word in words.iter().chain(&ecc) {
            layer_bits.extend((0..w).rev().map(|b| (word >> b) & 1 == 1));
        }
        trace!(
            "aztec: {} data words in {} {} layers",
            words.len(),
            layout.layers,
            if compact { "compact" } else { "full" }
        );
        return Ok(render_symbol(&layout, &mode_message(&layout, words.len()), &layer_bits));
    }
    Err(Error::encode(
        Symbology::Aztec,
        format!("{} data bits exceed capacity", bits.len()),
    ))
}
