//! QR segment stream interpretation

use log::trace;

use crate::decoder::modes::alphanumeric::AlphanumericDecoder;
use crate::decoder::modes::byte::{ByteDecoder, Charset};
use crate::decoder::modes::numeric::NumericDecoder;
use crate::decoder::modes::BitReader;

/// Segment mode indicators
pub mod mode {
    pub const TERMINATOR: u32 = 0b0000;
    pub const NUMERIC: u32 = 0b0001;
    pub const ALPHANUMERIC: u32 = 0b0010;
    pub const STRUCTURED_APPEND: u32 = 0b0011;
    pub const BYTE: u32 = 0b0100;
    pub const FNC1_FIRST: u32 = 0b0101;
    pub const ECI: u32 = 0b0111;
    pub const KANJI: u32 = 0b1000;
    pub const FNC1_SECOND: u32 = 0b1001;
    pub const HANZI: u32 = 0b1101;
}

/// Width of the character count field for `mode` at `version`
pub fn char_count_bits(mode_indicator: u32, version: u8) -> usize {
    let class = match version {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    match mode_indicator {
        mode::NUMERIC => [10, 12, 14][class],
        mode::ALPHANUMERIC => [9, 11, 13][class],
        mode::BYTE => [8, 16, 16][class],
        mode::KANJI | mode::HANZI => [8, 10, 12][class],
        _ => 0,
    }
}

/// Decode the data codewords of a symbol into text
///
/// Kanji and Hanzi segments are not supported and reject the symbol.
pub fn decode_segments(data: &[u8], version: u8) -> Option<String> {
    let mut reader = BitReader::new(data);
    let mut text = String::new();
    let mut charset = Charset::Auto;
    let mut fnc1 = false;

    while reader.remaining() >= 4 {
        let mode_indicator = reader.read_bits(4)?;
        match mode_indicator {
            mode::TERMINATOR => break,
            mode::NUMERIC => {
                let count = reader.read_bits(char_count_bits(mode_indicator, version))? as usize;
                NumericDecoder::decode(&mut reader, count, &mut text)?;
            }
            mode::ALPHANUMERIC => {
                let count = reader.read_bits(char_count_bits(mode_indicator, version))? as usize;
                AlphanumericDecoder::decode(&mut reader, count, fnc1, &mut text)?;
            }
            mode::BYTE => {
                let count = reader.read_bits(char_count_bits(mode_indicator, version))? as usize;
                ByteDecoder::decode(&mut reader, count, charset, &mut text)?;
            }
            mode::ECI => {
                let eci = read_eci(&mut reader)?;
                charset = Charset::from_eci(eci).or_else(|| {
                    trace!("unsupported ECI {eci}");
                    None
                })?;
            }
            mode::STRUCTURED_APPEND => {
                // Sequence index, total and parity; each symbol decodes on its own
                reader.read_bits(16)?;
            }
            mode::FNC1_FIRST => fnc1 = true,
            mode::FNC1_SECOND => {
                reader.read_bits(8)?;
                fnc1 = true;
            }
            mode::KANJI | mode::HANZI => {
                trace!("rejecting unsupported segment mode {mode_indicator:#06b}");
                return None;
            }
            _ => return None,
        }
    }

    Some(text)
}

fn read_eci(reader: &mut BitReader<'_>) -> Option<u32> {
    let first = reader.read_bits(8)?;
    if first & 0x80 == 0 {
        Some(first)
    } else if first & 0xC0 == 0x80 {
        Some(((first & 0x3F) << 8) | reader.read_bits(8)?)
    } else if first & 0xE0 == 0xC0 {
        Some(((first & 0x1F) << 16) | reader.read_bits(16)?)
    } else {
        None
    }
}
