//! Error correction and integrity checks
//!
//! Matrix symbologies hand over interleaved codewords together with their
//! block layout and Galois field; linear symbologies hand over character
//! values with the check scheme they carry. Either way the output is the
//! verified payload or a [`CorrectionError`], never a best guess.

pub mod checksum;
pub mod field;
pub mod galois;
pub mod reed_solomon;

use log::trace;

use crate::config::DecodeOptions;
use crate::error::CorrectionError;
use crate::models::{Quad, Symbology};

pub use checksum::CheckScheme;
pub use field::{
    AZTEC_FIELD_6, AZTEC_FIELD_8, AZTEC_FIELD_10, AZTEC_FIELD_12, AZTEC_MODE_FIELD, CodewordCodec,
    CodewordField, PDF417_FIELD,
};
pub use galois::{DATA_MATRIX_FIELD, GaloisField, QR_FIELD};
pub use reed_solomon::{ReedSolomonDecoder, ReedSolomonEncoder, RsError};

/// Data and check codeword counts of one Reed-Solomon block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Data codewords
    pub data: usize,
    /// Check codewords
    pub ecc: usize,
}

/// How the message data is spread over the blocks of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataOrder {
    /// Block 0 holds the first data codewords, block 1 the next, and so on
    #[default]
    Sequential,
    /// Data codeword k sits in block k % n at position k / n
    RoundRobin,
}

/// How a symbol's codewords split into interleaved Reed-Solomon blocks
///
/// Codewords are interleaved column-wise: the i-th data codeword of every
/// block that has one, for increasing i, then the check codewords likewise.
/// [`DataOrder`] says how the message itself was split before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    blocks: Vec<BlockSpec>,
    order: DataOrder,
}

impl BlockLayout {
    /// Layout from explicit blocks, in interleaving order
    pub fn new(blocks: Vec<BlockSpec>) -> Self {
        Self {
            blocks,
            order: DataOrder::Sequential,
        }
    }

    /// Same blocks, message data dealt out round-robin
    pub fn round_robin(mut self) -> Self {
        self.order = DataOrder::RoundRobin;
        self
    }

    /// How message data maps onto the blocks
    pub fn data_order(&self) -> DataOrder {
        self.order
    }

    /// `count` identical blocks
    pub fn uniform(count: usize, data: usize, ecc: usize) -> Self {
        Self::new(vec![BlockSpec { data, ecc }; count])
    }

    /// Blocks in interleaving order
    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Total codewords in the symbol
    pub fn total_codewords(&self) -> usize {
        self.blocks.iter().map(|b| b.data + b.ecc).sum()
    }

    /// Total data codewords in the symbol
    pub fn data_codewords(&self) -> usize {
        self.blocks.iter().map(|b| b.data).sum()
    }

    /// Maximum number of correctable codewords across all blocks
    pub fn ecc_capacity(&self) -> usize {
        self.blocks.iter().map(|b| b.ecc / 2).sum()
    }

    /// Interleave per-block `data ++ ecc` vectors into the symbol stream
    pub fn interleave(&self, blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_codewords());
        let max_data = self.blocks.iter().map(|b| b.data).max().unwrap_or(0);
        let max_ecc = self.blocks.iter().map(|b| b.ecc).max().unwrap_or(0);
        for i in 0..max_data {
            for (spec, block) in self.blocks.iter().zip(blocks) {
                if i < spec.data {
                    out.push(block[i]);
                }
            }
        }
        for i in 0..max_ecc {
            for (spec, block) in self.blocks.iter().zip(blocks) {
                if i < spec.ecc {
                    out.push(block[spec.data + i]);
                }
            }
        }
        out
    }

    /// Split message `data` into per-block data vectors
    pub fn split_data(&self, data: &[u8]) -> Vec<Vec<u8>> {
        match self.order {
            DataOrder::Sequential => {
                let mut rest = data;
                self.blocks
                    .iter()
                    .map(|spec| {
                        let (head, tail) = rest.split_at(spec.data.min(rest.len()));
                        rest = tail;
                        head.to_vec()
                    })
                    .collect()
            }
            DataOrder::RoundRobin => {
                let mut blocks: Vec<Vec<u8>> =
                    self.blocks.iter().map(|b| Vec::with_capacity(b.data)).collect();
                let mut stream = data.iter().copied();
                let max_data = self.blocks.iter().map(|b| b.data).max().unwrap_or(0);
                for i in 0..max_data {
                    for (spec, block) in self.blocks.iter().zip(blocks.iter_mut()) {
                        if i < spec.data {
                            block.extend(stream.next());
                        }
                    }
                }
                blocks
            }
        }
    }

    /// Message data of corrected per-block vectors, undoing [`Self::split_data`]
    pub fn join_data(&self, blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.data_codewords());
        match self.order {
            DataOrder::Sequential => {
                for (spec, block) in self.blocks.iter().zip(blocks) {
                    data.extend_from_slice(&block[..spec.data.min(block.len())]);
                }
            }
            DataOrder::RoundRobin => {
                let max_data = self.blocks.iter().map(|b| b.data).max().unwrap_or(0);
                for i in 0..max_data {
                    for (spec, block) in self.blocks.iter().zip(blocks) {
                        if i < spec.data {
                            data.extend(block.get(i).copied());
                        }
                    }
                }
            }
        }
        data
    }

    /// Split a symbol stream back into per-block `data ++ ecc` vectors
    pub fn deinterleave(&self, codewords: &[u8]) -> Result<Vec<Vec<u8>>, CorrectionError> {
        let expected = self.total_codewords();
        if codewords.len() != expected {
            return Err(CorrectionError::LayoutMismatch {
                expected,
                actual: codewords.len(),
            });
        }
        let mut blocks: Vec<Vec<u8>> = self
            .blocks
            .iter()
            .map(|b| Vec::with_capacity(b.data + b.ecc))
            .collect();
        let max_data = self.blocks.iter().map(|b| b.data).max().unwrap_or(0);
        let max_ecc = self.blocks.iter().map(|b| b.ecc).max().unwrap_or(0);
        let mut stream = codewords.iter().copied();
        for i in 0..max_data {
            for (spec, block) in self.blocks.iter().zip(blocks.iter_mut()) {
                if i < spec.data {
                    block.extend(stream.next());
                }
            }
        }
        for i in 0..max_ecc {
            for (spec, block) in self.blocks.iter().zip(blocks.iter_mut()) {
                if i < spec.ecc {
                    block.extend(stream.next());
                }
            }
        }
        Ok(blocks)
    }
}

/// Sampled, still unverified content of a candidate
#[derive(Debug, Clone)]
pub enum RawData {
    /// Interleaved data and check codewords
    Codewords {
        /// Codewords in symbol order
        codewords: Vec<u8>,
        /// Block structure of the symbol
        layout: BlockLayout,
        /// Field the check codewords were computed in
        field: &'static GaloisField,
    },
    /// One block of codewords wider than a byte, check words last
    Symbols {
        /// Data and check words in descending order
        codewords: Vec<u16>,
        /// Number of trailing check words
        ecc: usize,
        /// Field the check words were computed in
        field: &'static CodewordField,
    },
    /// Symbol character values of a linear symbol
    Characters {
        /// Character values in reading order
        values: Vec<u8>,
        /// Check carried by the values
        check: CheckScheme,
    },
}

/// Output of a symbol decoder, input of [`correct`]
#[derive(Debug, Clone)]
pub struct RawPayload {
    /// Symbology the decoder recognised
    pub symbology: Symbology,
    /// Refined symbol corners
    pub quad: Quad,
    /// Sampling quality in [0, 1]
    pub quality: f32,
    /// Symbology-specific size class (QR version, Data Matrix size index)
    pub version: usize,
    /// Sampled content
    pub data: RawData,
}

/// Verified payload ready for interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedPayload {
    /// Symbology of the symbol
    pub symbology: Symbology,
    /// Symbol corners
    pub quad: Quad,
    /// Size class carried over from the raw payload
    pub version: usize,
    /// Data codewords or character values with check characters removed
    pub data: Vec<u8>,
    /// Data words of a wide-codeword symbol (PDF417, Aztec), empty otherwise
    pub symbols: Vec<u16>,
    /// Codewords repaired by Reed-Solomon
    pub errors_corrected: usize,
    /// Codewords the symbol could have repaired
    pub ecc_capacity: usize,
    /// Sampling quality carried over from the raw payload
    pub quality: f32,
}

impl CorrectedPayload {
    /// Sampling quality, reduced by how much of the ECC budget was used
    pub fn confidence(&self) -> f32 {
        let used = if self.ecc_capacity == 0 {
            0.0
        } else {
            self.errors_corrected as f32 / self.ecc_capacity as f32
        };
        (self.quality * (1.0 - 0.5 * used)).clamp(0.0, 1.0)
    }
}

/// Verify and, where the symbology allows, repair a raw payload
pub fn correct(
    raw: RawPayload,
    options: &DecodeOptions,
) -> Result<CorrectedPayload, CorrectionError> {
    let symbology = raw.symbology;
    let mut symbols = Vec::new();
    let (data, errors_corrected, ecc_capacity) = match raw.data {
        RawData::Codewords {
            codewords,
            layout,
            field,
        } => {
            let mut blocks = layout.deinterleave(&codewords)?;
            let mut corrected = 0;
            for (block, spec) in blocks.iter_mut().zip(layout.blocks()) {
                let decoder = ReedSolomonDecoder::new(field, spec.ecc);
                corrected += decoder.decode(block).map_err(|err| {
                    trace!("{symbology}: {err}");
                    CorrectionError::ChecksumFailure {
                        symbology,
                        detail: "reed-solomon block uncorrectable",
                    }
                })?;
            }
            (layout.join_data(&blocks), corrected, layout.ecc_capacity())
        }
        RawData::Symbols {
            mut codewords,
            ecc,
            field,
        } => {
            let corrected = CodewordCodec::new(field, ecc)
                .decode(&mut codewords)
                .map_err(|err| {
                    trace!("{symbology}: {err}");
                    CorrectionError::ChecksumFailure {
                        symbology,
                        detail: "reed-solomon block uncorrectable",
                    }
                })?;
            codewords.truncate(codewords.len() - ecc);
            symbols = codewords;
            (Vec::new(), corrected, ecc / 2)
        }
        RawData::Characters { values, check } => {
            (verify_characters(symbology, values, check, options)?, 0, 0)
        }
    };

    Ok(CorrectedPayload {
        symbology,
        quad: raw.quad,
        version: raw.version,
        data,
        symbols,
        errors_corrected,
        ecc_capacity,
        quality: raw.quality,
    })
}

pub(crate) fn verify_characters(
    symbology: Symbology,
    mut values: Vec<u8>,
    check: CheckScheme,
    options: &DecodeOptions,
) -> Result<Vec<u8>, CorrectionError> {
    let fail = |detail| CorrectionError::ChecksumFailure { symbology, detail };
    match check {
        CheckScheme::Gtin => {
            if !checksum::gtin_is_valid(&values) {
                return Err(fail("GTIN check digit mismatch"));
            }
        }
        CheckScheme::UpcE => {
            let valid = checksum::upce_to_upca(&values)
                .is_some_and(|upca| checksum::gtin_is_valid(&upca));
            if !valid {
                return Err(fail("UPC-E check digit mismatch"));
            }
        }
        CheckScheme::Code128 => {
            if values.len() < 3 {
                return Err(fail("Code 128 symbol without data"));
            }
            let check_value = values.pop().unwrap_or_default();
            if checksum::code128_checksum(&values) != check_value {
                return Err(fail("mod-103 mismatch"));
            }
        }
        CheckScheme::Code39 => {
            if options.code39_check_digit {
                let Some(check_value) = values.pop() else {
                    return Err(fail("Code 39 symbol without data"));
                };
                if values.is_empty() || checksum::code39_checksum(&values) != check_value {
                    return Err(fail("mod-43 mismatch"));
                }
            }
        }
        CheckScheme::Itf => {
            if options.itf_check_digit && !checksum::gtin_is_valid(&values) {
                return Err(fail("ITF mod-10 mismatch"));
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(symbology: Symbology, data: RawData) -> RawPayload {
        RawPayload {
            symbology,
            quad: Quad::from_rect(0.0, 0.0, 10.0, 10.0),
            quality: 1.0,
            version: 0,
            data,
        }
    }

    #[test]
    fn test_interleave_round_trip_with_uneven_blocks() {
        let layout = BlockLayout::new(vec![
            BlockSpec { data: 2, ecc: 2 },
            BlockSpec { data: 3, ecc: 2 },
        ]);
        let blocks = vec![vec![1, 2, 10, 11], vec![3, 4, 5, 12, 13]];
        let stream = layout.interleave(&blocks);
        assert_eq!(stream, vec![1, 3, 2, 4, 5, 10, 12, 11, 13]);
        assert_eq!(layout.deinterleave(&stream).unwrap(), blocks);
        assert!(matches!(
            layout.deinterleave(&stream[1..]),
            Err(CorrectionError::LayoutMismatch { expected: 9, actual: 8 })
        ));
    }

    #[test]
    fn test_data_order_splits_and_joins() {
        let data: Vec<u8> = (1..=6).collect();
        let sequential = BlockLayout::uniform(2, 3, 2);
        assert_eq!(sequential.split_data(&data), vec![vec![1, 2, 3], vec![4, 5, 6]]);

        let round_robin = BlockLayout::uniform(2, 3, 2).round_robin();
        assert_eq!(round_robin.data_order(), DataOrder::RoundRobin);
        let blocks = round_robin.split_data(&data);
        assert_eq!(blocks, vec![vec![1, 3, 5], vec![2, 4, 6]]);
        assert_eq!(round_robin.join_data(&blocks), data);
        assert_eq!(sequential.join_data(&sequential.split_data(&data)), data);
    }

    #[test]
    fn test_round_robin_message_survives_correction() {
        let layout = BlockLayout::uniform(2, 4, 6).round_robin();
        let message: Vec<u8> = (10..18).collect();
        let encoder = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD, 6);
        let blocks: Vec<Vec<u8>> = layout
            .split_data(&message)
            .into_iter()
            .map(|mut block| {
                let ecc = encoder.encode(&block);
                block.extend(ecc);
                block
            })
            .collect();
        let mut codewords = layout.interleave(&blocks);
        codewords[1] ^= 0x11;
        codewords[6] ^= 0x80;

        let payload = raw(
            Symbology::DataMatrix,
            RawData::Codewords {
                codewords,
                layout,
                field: &DATA_MATRIX_FIELD,
            },
        );
        let corrected = correct(payload, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.data, message);
        assert_eq!(corrected.errors_corrected, 2);
    }

    #[test]
    fn test_correct_repairs_codewords() {
        let data = vec![142, 164, 186];
        let ecc = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD, 5).encode(&data);
        let mut codewords = data.clone();
        codewords.extend(ecc);
        codewords[0] ^= 0x40;

        let payload = raw(
            Symbology::DataMatrix,
            RawData::Codewords {
                codewords,
                layout: BlockLayout::uniform(1, 3, 5),
                field: &DATA_MATRIX_FIELD,
            },
        );
        let corrected = correct(payload, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.data, data);
        assert_eq!(corrected.errors_corrected, 1);
        assert_eq!(corrected.ecc_capacity, 2);
        assert!((corrected.confidence() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_raw_payload_debug_names_variant() {
        let payload = raw(
            Symbology::QrCode,
            RawData::Codewords {
                codewords: vec![0; 4],
                layout: BlockLayout::uniform(1, 2, 2),
                field: &QR_FIELD,
            },
        );
        assert!(format!("{payload:?}").contains("Codewords"));
    }

    #[test]
    fn test_wide_codewords_are_corrected() {
        let data: Vec<u16> = vec![6, 813, 29, 900, 470];
        let mut codewords = data.clone();
        codewords.extend(CodewordCodec::new(&PDF417_FIELD, 8).encode(&data));
        codewords[2] = 400;
        codewords[7] = 0;

        let payload = raw(
            Symbology::Pdf417,
            RawData::Symbols {
                codewords,
                ecc: 8,
                field: &PDF417_FIELD,
            },
        );
        let corrected = correct(payload, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.symbols, data);
        assert!(corrected.data.is_empty());
        assert_eq!(corrected.errors_corrected, 2);
        assert_eq!(corrected.ecc_capacity, 4);
    }

    #[test]
    fn test_gtin_failure_is_rejected() {
        let values = vec![5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5, 8];
        let payload = raw(
            Symbology::Ean13,
            RawData::Characters {
                values,
                check: CheckScheme::Gtin,
            },
        );
        assert!(matches!(
            correct(payload, &DecodeOptions::default()),
            Err(CorrectionError::ChecksumFailure { symbology: Symbology::Ean13, .. })
        ));
    }

    #[test]
    fn test_code128_check_is_stripped() {
        let payload = raw(
            Symbology::Code128,
            RawData::Characters {
                values: vec![104, 48, 42, 42, 17, 18, 19, 35, 55],
                check: CheckScheme::Code128,
            },
        );
        let corrected = correct(payload, &DecodeOptions::default()).unwrap();
        assert_eq!(corrected.data, vec![104, 48, 42, 42, 17, 18, 19, 35]);
        assert_eq!(corrected.confidence(), 1.0);
    }

    #[test]
    fn test_optional_checks_follow_options() {
        // "CODE39" followed by V where the mod-43 check is W
        let values = vec![12, 24, 13, 14, 3, 9, 31];
        let strict = DecodeOptions::default();
        let lenient = DecodeOptions::default().with_code39_check_digit(false);

        let payload = raw(
            Symbology::Code39,
            RawData::Characters {
                values: values.clone(),
                check: CheckScheme::Code39,
            },
        );
        assert_eq!(correct(payload.clone(), &lenient).unwrap().data, values);
        assert!(correct(payload, &strict).is_err());

        let mut valid = values[..6].to_vec();
        valid.push(32);
        let payload = raw(
            Symbology::Code39,
            RawData::Characters {
                values: valid,
                check: CheckScheme::Code39,
            },
        );
        assert_eq!(correct(payload, &strict).unwrap().data, &values[..6]);
    }

    #[test]
    fn test_itf_check_digit_is_required_by_default() {
        let itf = |values: Vec<u8>| {
            raw(
                Symbology::Itf,
                RawData::Characters {
                    values,
                    check: CheckScheme::Itf,
                },
            )
        };
        let defaults = DecodeOptions::default();
        assert!(correct(itf(vec![1, 2, 3, 4, 5, 6, 7, 8]), &defaults).is_err());
        assert_eq!(
            correct(itf(vec![1, 2, 3, 4, 5, 6, 7, 0]), &defaults).unwrap().data,
            vec![1, 2, 3, 4, 5, 6, 7, 0]
        );
        let lenient = DecodeOptions::default().with_itf_check_digit(false);
        assert!(correct(itf(vec![1, 2, 3, 4, 5, 6, 7, 8]), &lenient).is_ok());
    }
}
