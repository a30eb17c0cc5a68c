//! Data Matrix ECC 200 decoding
//!
//! The candidate quad is already oriented with the solid L in the left
//! column and bottom row, and carries the module grid found by the locator.
//! Region borders are stripped to form the mapping matrix, which the
//! placement map turns into interleaved codewords.

/// Data encodation schemes (ASCII, C40, Text, X12, EDIFACT, Base256)
pub mod encodation;
/// Utah-shape module placement
pub mod placement;
/// Symbol size table
pub mod tables;

use log::trace;

use self::placement::placement_for;
use self::tables::{SYMBOL_SIZES, SymbolSize, size_index};
use super::SymbolDecoder;
use crate::correction::{CorrectedPayload, DATA_MATRIX_FIELD, RawData, RawPayload};
use crate::models::{BitMatrix, Candidate, Symbology, SymbologyFamily};
use crate::utils::geometry::{PerspectiveTransform, sample_grid};

/// Minimum fraction of finder and timing modules that must match
const MIN_BORDER_QUALITY: f32 = 0.85;

/// Decoder for Data Matrix ECC 200 symbols
#[derive(Debug, Default)]
pub struct DataMatrixDecoder;

impl DataMatrixDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Codewords of a sampled module grid in symbol order
    pub fn read_grid(
        size: &SymbolSize,
        placement_index: usize,
        grid: &BitMatrix,
    ) -> Option<Vec<u8>> {
        let placement = placement_for(placement_index)?;
        Some(placement.read(|r, c| {
            let (row, col) = size.physical(r, c);
            grid.get(col, row)
        }))
    }
}

/// Fraction of finder and timing modules of `grid` with the expected colour
pub fn border_quality(size: &SymbolSize, grid: &BitMatrix) -> f32 {
    let mut matches = 0usize;
    let mut total = 0usize;
    for row in 0..size.rows {
        for col in 0..size.cols {
            if let Some(expected) = size.border_module(row, col) {
                total += 1;
                matches += (grid.get(col, row) == expected) as usize;
            }
        }
    }
    if total == 0 { 0.0 } else { matches as f32 / total as f32 }
}

/// Module grid of a complete symbol from its codewords
pub fn render_symbol(size_index: usize, codewords: &[u8]) -> Option<BitMatrix> {
    let size = SYMBOL_SIZES.get(size_index)?;
    let placement = placement_for(size_index)?;
    let modules = placement.draw(codewords);
    let mut grid = BitMatrix::new(size.cols, size.rows);
    for row in 0..size.rows {
        for col in 0..size.cols {
            if let Some(dark) = size.border_module(row, col) {
                grid.set(col, row, dark);
            }
        }
    }
    for r in 0..placement.rows() {
        for c in 0..placement.cols() {
            let (row, col) = size.physical(r, c);
            grid.set(col, row, modules[r * placement.cols() + c]);
        }
    }
    Some(grid)
}

impl SymbolDecoder for DataMatrixDecoder {
    fn handles(&self, family: SymbologyFamily) -> bool {
        family == SymbologyFamily::DataMatrix
    }

    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload> {
        let (rows, cols) = candidate.grid?;
        let index = size_index(rows, cols)?;
        let size = &SYMBOL_SIZES[index];
        let transform =
            PerspectiveTransform::grid_to_quad(cols as f32, rows as f32, &candidate.quad)?;
        let Some(grid) = sample_grid(image, &transform, cols, rows, candidate.module_size) else {
            trace!("datamatrix: {rows}x{cols} grid leaves the image");
            return None;
        };

        let quality = border_quality(size, &grid);
        if quality < MIN_BORDER_QUALITY {
            trace!("datamatrix: border quality {quality:.2} for {rows}x{cols}");
            return None;
        }
        let codewords = Self::read_grid(size, index, &grid)?;
        Some(RawPayload {
            symbology: Symbology::DataMatrix,
            quad: candidate.quad,
            quality,
            version: index,
            data: RawData::Codewords {
                codewords,
                layout: size.layout(),
                field: &DATA_MATRIX_FIELD,
            },
        })
    }

    fn interpret(&self, payload: &CorrectedPayload) -> Option<String> {
        encodation::decode(&payload.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::correction::{ReedSolomonEncoder, correct};
    use crate::models::Quad;

    /// "123456" as digit pairs with its check codewords
    const CODEWORDS: [u8; 8] = [142, 164, 186, 114, 25, 5, 88, 102];

    fn scaled(grid: &BitMatrix, unit: usize, quiet: usize) -> BitMatrix {
        let mut image = BitMatrix::new(
            (grid.width() + 2 * quiet) * unit,
            (grid.height() + 2 * quiet) * unit,
        );
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.get(x, y) {
                    for py in 0..unit {
                        for px in 0..unit {
                            image.set((x + quiet) * unit + px, (y + quiet) * unit + py, true);
                        }
                    }
                }
            }
        }
        image
    }

    fn candidate(rows: usize, cols: usize, unit: usize, quiet: usize) -> Candidate {
        let (x0, y0) = ((quiet * unit) as f32, (quiet * unit) as f32);
        Candidate {
            family: SymbologyFamily::DataMatrix,
            quad: Quad::from_rect(x0, y0, x0 + (cols * unit) as f32, y0 + (rows * unit) as f32),
            module_size: unit as f32,
            confidence: 1.0,
            grid: Some((rows, cols)),
        }
    }

    #[test]
    fn test_render_read_roundtrip_10x10() {
        let grid = render_symbol(0, &CODEWORDS).unwrap();
        assert!((border_quality(&SYMBOL_SIZES[0], &grid) - 1.0).abs() < f32::EPSILON);
        assert_eq!(DataMatrixDecoder::read_grid(&SYMBOL_SIZES[0], 0, &grid).unwrap(), CODEWORDS);
    }

    #[test]
    fn test_decodes_sampled_symbol() {
        let image = scaled(&render_symbol(0, &CODEWORDS).unwrap(), 6, 2);
        let decoder = DataMatrixDecoder::new();
        let raw = decoder.try_decode(&candidate(10, 10, 6, 2), &image).unwrap();
        let corrected = correct(raw, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.data, vec![142, 164, 186]);
        assert_eq!(decoder.interpret(&corrected).as_deref(), Some("123456"));
    }

    #[test]
    fn test_rectangular_symbol_with_damage() {
        let index = size_index(8, 18).unwrap();
        let size = SYMBOL_SIZES[index];
        // "Hello" in ASCII
        let data = [73, 102, 109, 109, 112];
        let ecc = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD, size.ecc_per_block).encode(&data);
        let mut codewords = data.to_vec();
        codewords.extend_from_slice(&ecc);
        let mut grid = render_symbol(index, &codewords).unwrap();
        // One damaged data module
        grid.toggle(3, 3);

        let image = scaled(&grid, 5, 2);
        let decoder = DataMatrixDecoder::new();
        let raw = decoder.try_decode(&candidate(8, 18, 5, 2), &image).unwrap();
        let corrected = correct(raw, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.errors_corrected, 1);
        assert_eq!(decoder.interpret(&corrected).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let image = scaled(&render_symbol(0, &CODEWORDS).unwrap(), 6, 2);
        assert!(DataMatrixDecoder::new().try_decode(&candidate(12, 12, 5, 2), &image).is_none());
    }
}
