//! Linear symbol decoding
//!
//! A linear candidate is read along several lines across its quad, from the
//! start edge to the end edge. Each line is turned into bar and space widths
//! and handed to the family's demodulator, first in reading order and then
//! reversed for symbols scanned upside down. A line is only accepted when its
//! mandatory check character holds, so a damaged line falls through to the
//! next one.

/// Code 128 sets A, B and C
pub mod code128;
/// Code 39 and its full-ASCII extension
pub mod code39;
/// EAN-13, EAN-8, UPC-A, UPC-E
pub mod ean;
/// Interleaved 2 of 5
pub mod itf;
/// Width tables and pattern matching
pub mod patterns;

use log::trace;

use super::SymbolDecoder;
use crate::config::DecodeOptions;
use crate::correction::{CheckScheme, CorrectedPayload, RawData, RawPayload, verify_characters};
use crate::models::{BitMatrix, Candidate, Point, Quad, Symbology, SymbologyFamily};

/// Offsets across the quad (0 = top edge) of the lines tried in turn
const LINE_OFFSETS: [f32; 5] = [0.5, 0.3, 0.7, 0.15, 0.85];

/// Modules of quiet zone included beyond each end of a line
const LINE_MARGIN: f32 = 2.0;

/// Character values demodulated from one scan line
#[derive(Debug, Clone, PartialEq)]
pub struct Demodulated {
    /// Symbology the widths matched
    pub symbology: Symbology,
    /// Character values, check characters included
    pub values: Vec<u8>,
    /// Check carried by the values
    pub check: CheckScheme,
    /// Mean width deviation, lower is cleaner
    pub variance: f32,
}

/// Decoder for all linear families
#[derive(Debug, Clone)]
pub struct LinearDecoder {
    options: DecodeOptions,
}

impl LinearDecoder {
    pub fn new(options: &DecodeOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    fn demodulate(&self, family: SymbologyFamily, runs: &[f32]) -> Option<Demodulated> {
        let report_upca = self.options.is_enabled(Symbology::UpcA);
        let demodulated = match family {
            SymbologyFamily::EanUpc => ean::demodulate(runs, report_upca),
            SymbologyFamily::Code128 => code128::demodulate(runs),
            SymbologyFamily::Code39 => code39::demodulate(runs),
            SymbologyFamily::Itf => itf::demodulate(runs),
            SymbologyFamily::Qr
            | SymbologyFamily::DataMatrix
            | SymbologyFamily::Pdf417
            | SymbologyFamily::Aztec => None,
        }?;
        if !self.options.is_enabled(demodulated.symbology) {
            trace!("linear: {} is disabled", demodulated.symbology);
            return None;
        }
        let valid = verify_characters(
            demodulated.symbology,
            demodulated.values.clone(),
            demodulated.check,
            &self.options,
        )
        .is_ok();
        valid.then_some(demodulated)
    }
}

/// Bar and space widths along a line, from the first dark pixel to the last
pub fn line_runs(image: &BitMatrix, from: Point, to: Point) -> Vec<f32> {
    let length = from.distance(&to);
    if !length.is_finite() || length < 1.0 {
        return Vec::new();
    }
    let steps = length.ceil() as usize;
    let step = length / steps as f32;
    let (dx, dy) = ((to.x - from.x) / steps as f32, (to.y - from.y) / steps as f32);

    let mut runs: Vec<f32> = Vec::new();
    let mut current: Option<bool> = None;
    for i in 0..steps {
        let t = i as f32 + 0.5;
        let (x, y) = (from.x + dx * t, from.y + dy * t);
        let dark = image.get_signed(x.floor() as i32, y.floor() as i32);
        match current {
            Some(c) if c == dark => {
                if let Some(last) = runs.last_mut() {
                    *last += step;
                }
            }
            // Leading light pixels are quiet zone
            None if !dark => {}
            _ => {
                runs.push(step);
                current = Some(dark);
            }
        }
    }
    // Runs alternate starting with a bar, so a trailing space has an odd count
    if runs.len() % 2 == 0 {
        runs.pop();
    }
    runs
}

fn reversed(quad: &Quad) -> Quad {
    Quad::new(quad.bottom_right(), quad.bottom_left(), quad.top_left(), quad.top_right())
}

impl SymbolDecoder for LinearDecoder {
    fn handles(&self, family: SymbologyFamily) -> bool {
        family.is_linear()
    }

    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload> {
        let quad = &candidate.quad;
        let (tl, tr, br, bl) = (
            quad.top_left(),
            quad.top_right(),
            quad.bottom_right(),
            quad.bottom_left(),
        );

        for t in LINE_OFFSETS {
            let start = tl.lerp(&bl, t);
            let end = tr.lerp(&br, t);
            let length = start.distance(&end);
            if length < 1.0 {
                return None;
            }
            let margin = LINE_MARGIN * candidate.module_size / length;
            let from = start.lerp(&end, -margin);
            let to = start.lerp(&end, 1.0 + margin);

            let mut runs = line_runs(image, from, to);
            let (demodulated, flipped) = match self.demodulate(candidate.family, &runs) {
                Some(d) => (d, false),
                None => {
                    runs.reverse();
                    match self.demodulate(candidate.family, &runs) {
                        Some(d) => (d, true),
                        None => continue,
                    }
                }
            };
            trace!(
                "linear: {} on line {t:.2} ({} runs, variance {:.3})",
                demodulated.symbology,
                runs.len(),
                demodulated.variance
            );
            return Some(RawPayload {
                symbology: demodulated.symbology,
                quad: if flipped { reversed(quad) } else { *quad },
                quality: (1.0 - demodulated.variance).clamp(0.0, 1.0),
                version: 0,
                data: RawData::Characters {
                    values: demodulated.values,
                    check: demodulated.check,
                },
            });
        }
        None
    }

    fn interpret(&self, payload: &CorrectedPayload) -> Option<String> {
        match payload.symbology {
            Symbology::Code128 => code128::interpret(&payload.data),
            Symbology::Code39 => code39::interpret(&payload.data, self.options.code39_extended),
            Symbology::Ean13
            | Symbology::Ean8
            | Symbology::UpcA
            | Symbology::UpcE
            | Symbology::Itf => ean::interpret(&payload.data),
            Symbology::QrCode
            | Symbology::DataMatrix
            | Symbology::Pdf417
            | Symbology::Aztec => None,
        }
    }
}
