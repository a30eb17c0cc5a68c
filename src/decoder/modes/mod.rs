//! QR code data mode decoders
//!
//! - Numeric: groups of three digits in 10 bits
//! - Alphanumeric: pairs from a 45-character set in 11 bits
//! - Byte: 8-bit data in the active character set

pub mod alphanumeric;
pub mod byte;
pub mod numeric;

/// MSB-first reader over a codeword stream
pub struct BitReader<'a> {
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0 }
    }

    pub fn remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.idx)
    }

    pub fn read_bits(&mut self, n: usize) -> Option<u32> {
        if n > 32 || n > self.remaining() {
            return None;
        }
        let mut val = 0u32;
        for _ in 0..n {
            let bit = (self.bytes[self.idx / 8] >> (7 - self.idx % 8)) & 1;
            val = (val << 1) | bit as u32;
            self.idx += 1;
        }
        Some(val)
    }
}
