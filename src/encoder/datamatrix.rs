//! Data Matrix ECC 200 symbol construction
//!
//! Text is encoded in ASCII mode: digit pairs share a codeword and bytes
//! above 127 go behind an upper shift, so any UTF-8 payload is
//! representable. The smallest square symbol holding the codewords is used.

use log::trace;

use crate::correction::ReedSolomonEncoder;
use crate::correction::galois::DATA_MATRIX_FIELD;
use crate::decoder::datamatrix::encodation::codeword::{DIGIT_PAIR_BASE, PAD, UPPER_SHIFT};
use crate::decoder::datamatrix::render_symbol;
use crate::decoder::datamatrix::tables::{SymbolSize, size_index, smallest_square_for};
use crate::error::{Error, Result};
use crate::models::{BitMatrix, Symbology};

/// ASCII mode codewords for `bytes`
fn ascii_codewords(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match bytes.get(i + 1) {
            Some(&next) if b.is_ascii_digit() && next.is_ascii_digit() => {
                out.push(DIGIT_PAIR_BASE + (b - b'0') * 10 + (next - b'0'));
                i += 2;
                continue;
            }
            _ => {}
        }
        if b < 128 {
            out.push(b + 1);
        } else {
            out.push(UPPER_SHIFT);
            out.push(b - 127);
        }
        i += 1;
    }
    out
}

/// Pad codeword at 1-based `position`, randomised after the first
fn pad_codeword(position: usize, first: bool) -> u8 {
    if first {
        return PAD;
    }
    let pseudo = (149 * position) % 253 + 1;
    let value = PAD as usize + pseudo;
    (if value > 254 { value - 254 } else { value }) as u8
}

/// Data codewords padded to `capacity`
fn padded(mut data: Vec<u8>, capacity: usize) -> Vec<u8> {
    let used = data.len();
    for position in used + 1..=capacity {
        data.push(pad_codeword(position, position == used + 1));
    }
    data
}

/// Data then check codewords in symbol order
fn symbol_codewords(size: &SymbolSize, data: &[u8]) -> Vec<u8> {
    let layout = size.layout();
    let encoder = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD, size.ecc_per_block);
    let blocks: Vec<Vec<u8>> = layout
        .split_data(data)
        .into_iter()
        .map(|mut block| {
            let ecc = encoder.encode(&block);
            block.extend_from_slice(&ecc);
            block
        })
        .collect();
    layout.interleave(&blocks)
}

/// Module grid for `text`, finder and timing borders included
pub fn encode(text: &str) -> Result<BitMatrix> {
    let data = ascii_codewords(text.as_bytes());
    let size = smallest_square_for(data.len()).ok_or_else(|| {
        Error::encode(
            Symbology::DataMatrix,
            format!("{} codewords exceed capacity", data.len()),
        )
    })?;
    let index = size_index(size.rows, size.cols)
        .ok_or_else(|| Error::encode(Symbology::DataMatrix, "symbol size not in table"))?;
    let data = padded(data, size.data_codewords());
    let codewords = symbol_codewords(size, &data);
    trace!("datamatrix: {} data codewords in {}x{}", data.len(), size.rows, size.cols);
    render_symbol(index, &codewords).ok_or_else(|| {
        Error::encode(
            Symbology::DataMatrix,
            format!("no placement for {}x{}", size.rows, size.cols),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::correction::{RawData, RawPayload, correct};
    use crate::decoder::SymbolDecoder;
    use crate::decoder::datamatrix::DataMatrixDecoder;
    use crate::decoder::datamatrix::tables::SYMBOL_SIZES;
    use crate::models::Quad;

    fn read_back(grid: &BitMatrix) -> Option<String> {
        let index = size_index(grid.height(), grid.width())?;
        let size = &SYMBOL_SIZES[index];
        let codewords = DataMatrixDecoder::read_grid(size, index, grid)?;
        let raw = RawPayload {
            symbology: Symbology::DataMatrix,
            quad: Quad::from_rect(0.0, 0.0, grid.width() as f32, grid.height() as f32),
            quality: 1.0,
            version: index,
            data: RawData::Codewords {
                codewords,
                layout: size.layout(),
                field: &DATA_MATRIX_FIELD,
            },
        };
        let corrected = correct(raw, &DecodeOptions::default()).ok()?;
        DataMatrixDecoder::new().interpret(&corrected)
    }

    #[test]
    fn test_digit_pairs_fill_smallest_symbol() {
        assert_eq!(ascii_codewords(b"123456"), vec![142, 164, 186]);
        let grid = encode("123456").unwrap();
        let expected = render_symbol(0, &[142, 164, 186, 114, 25, 5, 88, 102]).unwrap();
        assert_eq!(grid, expected);
    }

    #[test]
    fn test_ascii_codewords() {
        assert_eq!(ascii_codewords(b"A1b"), vec![66, 50, 99]);
        assert_eq!(ascii_codewords(b"12a3"), vec![142, 98, 52]);
        assert_eq!(ascii_codewords(&[0xE9]), vec![UPPER_SHIFT, 0xE9 - 127]);
    }

    #[test]
    fn test_pad_randomisation() {
        assert_eq!(padded(vec![66], 4), vec![66, 129, 70, 220]);
    }

    #[test]
    fn test_round_trips_across_sizes() {
        for text in [
            "A",
            "Hello, Data Matrix!",
            "0123456789012345678901234567890123456789",
            "Grüße",
        ] {
            let grid = encode(text).unwrap();
            assert_eq!(grid.width(), grid.height());
            assert_eq!(read_back(&grid).as_deref(), Some(text));
        }
        // Several interleaved blocks
        let long = "Data Matrix ".repeat(20);
        let grid = encode(&long).unwrap();
        let index = size_index(grid.height(), grid.width());
        assert!(index.is_some_and(|i| SYMBOL_SIZES[i].blocks > 1));
        assert_eq!(read_back(&grid).as_deref(), Some(long.as_str()));
    }

    #[test]
    fn test_capacity_exceeded() {
        let text = "x".repeat(2000);
        assert!(matches!(
            encode(&text),
            Err(Error::Encode {
                symbology: Symbology::DataMatrix,
                ..
            })
        ));
    }
}
