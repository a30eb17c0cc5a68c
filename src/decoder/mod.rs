//! Symbol decoding
//!
//! A decoder turns a located candidate into raw codewords or character
//! values (sampling, unmasking, demodulation) and, once those have been
//! verified, interprets the data into text:
//! - QR: grid sampling, format/version info, unmasking, segment parsing
//! - Data Matrix: grid sampling, module placement, encodation schemes
//! - Aztec: mode message, spiral layer reading, bit unstuffing, character modes
//! - PDF417: per-line codeword reading, row indicators, compaction modes
//! - Linear: bar width demodulation for EAN/UPC, Code 128, Code 39 and ITF

/// Aztec Code layers, mode message and character modes
pub mod aztec;
/// Data Matrix ECC 200 sampling and encodation
pub mod datamatrix;
/// 1D bar width demodulation
pub mod linear;
/// Data mode decoders (numeric, alphanumeric, byte)
pub mod modes;
/// PDF417 codeword reading and compaction
pub mod pdf417;
/// QR code sampling and segment parsing
pub mod qr;

use crate::config::DecodeOptions;
use crate::correction::{CorrectedPayload, RawPayload};
use crate::models::{BitMatrix, Candidate, SymbologyFamily};

/// Family-specific decoding of located candidates
pub trait SymbolDecoder: Send + Sync {
    /// Whether this decoder reads candidates of `family`
    fn handles(&self, family: SymbologyFamily) -> bool;

    /// Sample a candidate into unverified codewords, `None` if it is not a readable symbol
    fn try_decode(&self, candidate: &Candidate, image: &BitMatrix) -> Option<RawPayload>;

    /// Turn verified data into text, `None` on an invalid encodation
    fn interpret(&self, payload: &CorrectedPayload) -> Option<String>;
}

/// The decoders for every enabled family
pub fn decoders_for(options: &DecodeOptions) -> Vec<Box<dyn SymbolDecoder>> {
    let mut decoders: Vec<Box<dyn SymbolDecoder>> = Vec::with_capacity(5);
    if options.family_enabled(SymbologyFamily::Qr) {
        decoders.push(Box::new(qr::QrDecoder::new()));
    }
    if options.family_enabled(SymbologyFamily::DataMatrix) {
        decoders.push(Box::new(datamatrix::DataMatrixDecoder::new()));
    }
    if options.family_enabled(SymbologyFamily::Aztec) {
        decoders.push(Box::new(aztec::AztecDecoder::new()));
    }
    if options.family_enabled(SymbologyFamily::Pdf417) {
        decoders.push(Box::new(pdf417::Pdf417Decoder::new()));
    }
    decoders.push(Box::new(linear::LinearDecoder::new(options)));
    decoders
}
