//! Reed-Solomon coding over a [`GaloisField`]
//!
//! Blocks use the descending convention: `block[0]` is the coefficient of
//! x^(n-1) and the trailing `num_ecc` bytes are the check codewords.

use super::galois::GaloisField;

/// Why a block could not be corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RsError {
    /// Block longer than the field allows
    #[error("block of {0} codewords exceeds the field size")]
    BlockTooLong(usize),
    /// More errors than ⌊ecc/2⌋, or an inconsistent locator
    #[error("too many errors")]
    TooManyErrors,
}

/// Berlekamp-Massey / Chien / Forney decoder for one field and check length
pub struct ReedSolomonDecoder<'f> {
    field: &'f GaloisField,
    num_ecc_codewords: usize,
}

impl<'f> ReedSolomonDecoder<'f> {
    pub fn new(field: &'f GaloisField, num_ecc_codewords: usize) -> Self {
        Self {
            field,
            num_ecc_codewords,
        }
    }

    /// Correct `received` in place, returning the number of repaired codewords
    pub fn decode(&self, received: &mut [u8]) -> Result<usize, RsError> {
        let n = received.len();
        if n > 255 {
            return Err(RsError::BlockTooLong(n));
        }
        if n <= self.num_ecc_codewords {
            return Err(RsError::TooManyErrors);
        }

        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let (sigma, errors) = self.error_locator(&syndromes);
        if errors == 0 || 2 * errors > self.num_ecc_codewords {
            return Err(RsError::TooManyErrors);
        }

        let positions = self.error_positions(&sigma[..=errors], n);
        if positions.len() != errors {
            return Err(RsError::TooManyErrors);
        }

        let omega = self.error_evaluator(&syndromes, &sigma[..=errors]);
        let field = self.field;
        let base = field.generator_base() as i64;
        for &j in &positions {
            let power = n - 1 - j;
            let x_inv = field.exp(255 - power % 255);
            let numerator = field.eval_ascending(&omega, x_inv);

            // Formal derivative of sigma keeps only odd powers
            let mut denominator = 0u8;
            let mut i = 1;
            while i <= errors {
                denominator ^= field.mul(sigma[i], field.exp((255 - power % 255) * (i - 1)));
                i += 2;
            }
            if denominator == 0 {
                return Err(RsError::TooManyErrors);
            }

            let scale = field.exp((power as i64 * (1 - base)).rem_euclid(255) as usize);
            received[j] ^= field.mul(scale, field.div(numerator, denominator));
        }

        if self.syndromes(received).iter().any(|&s| s != 0) {
            return Err(RsError::TooManyErrors);
        }
        Ok(errors)
    }

    fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        let base = self.field.generator_base();
        (0..self.num_ecc_codewords)
            .map(|i| {
                self.field
                    .eval_descending(received, self.field.exp(base + i))
            })
            .collect()
    }

    /// Berlekamp-Massey: locator polynomial (ascending) and its degree
    fn error_locator(&self, syndromes: &[u8]) -> (Vec<u8>, usize) {
        let field = self.field;
        let len = self.num_ecc_codewords + 1;
        let mut sigma = vec![0u8; len];
        let mut prev = vec![0u8; len];
        sigma[0] = 1;
        prev[0] = 1;
        let mut l = 0usize;
        let mut m = 1usize;
        let mut prev_delta = 1u8;

        for k in 0..syndromes.len() {
            let mut delta = syndromes[k];
            for i in 1..=l {
                delta ^= field.mul(sigma[i], syndromes[k - i]);
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let coef = field.div(delta, prev_delta);
            if 2 * l <= k {
                let snapshot = sigma.clone();
                for i in 0..len - m {
                    sigma[i + m] ^= field.mul(coef, prev[i]);
                }
                l = k + 1 - l;
                prev = snapshot;
                prev_delta = delta;
                m = 1;
            } else {
                for i in 0..len - m {
                    sigma[i + m] ^= field.mul(coef, prev[i]);
                }
                m += 1;
            }
        }

        // A locator with stray terms above degree l is inconsistent
        if sigma[l + 1..].iter().any(|&c| c != 0) {
            return (sigma, 0);
        }
        (sigma, l)
    }

    /// Chien search: indices j where sigma(a^-(n-1-j)) == 0
    fn error_positions(&self, sigma: &[u8], n: usize) -> Vec<usize> {
        (0..n)
            .filter(|&j| {
                let power = n - 1 - j;
                self.field
                    .eval_ascending(sigma, self.field.exp(255 - power % 255))
                    == 0
            })
            .collect()
    }

    /// Omega = S(x) * sigma(x) mod x^(2t), ascending
    fn error_evaluator(&self, syndromes: &[u8], sigma: &[u8]) -> Vec<u8> {
        let t2 = self.num_ecc_codewords;
        let mut omega = vec![0u8; t2];
        for (k, out) in omega.iter_mut().enumerate() {
            let mut acc = 0u8;
            for (i, &s) in sigma.iter().enumerate().take(k + 1) {
                acc ^= self.field.mul(s, syndromes[k - i]);
            }
            *out = acc;
        }
        omega
    }
}

/// Systematic encoder producing the check codewords for a data block
pub struct ReedSolomonEncoder<'f> {
    field: &'f GaloisField,
    generator: Vec<u8>,
}

impl<'f> ReedSolomonEncoder<'f> {
    pub fn new(field: &'f GaloisField, num_ecc_codewords: usize) -> Self {
        // Descending coefficients of prod (x - a^(base + i))
        let mut generator = vec![1u8];
        for i in 0..num_ecc_codewords {
            let root = field.exp(field.generator_base() + i);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &g) in generator.iter().enumerate() {
                next[j] ^= g;
                next[j + 1] ^= field.mul(g, root);
            }
            generator = next;
        }
        Self { field, generator }
    }

    /// Check codewords for `data`
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let ecc_len = self.generator.len() - 1;
        let mut remainder = vec![0u8; ecc_len];
        if ecc_len == 0 {
            return remainder;
        }
        for &d in data {
            let factor = d ^ remainder[0];
            remainder.rotate_left(1);
            remainder[ecc_len - 1] = 0;
            for (r, &g) in remainder.iter_mut().zip(&self.generator[1..]) {
                *r ^= self.field.mul(g, factor);
            }
        }
        remainder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::galois::{DATA_MATRIX_FIELD, QR_FIELD};

    const HELLO_WORLD_DATA: [u8; 16] = [
        32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17,
    ];
    const HELLO_WORLD_ECC: [u8; 10] = [196, 35, 39, 119, 235, 215, 231, 226, 93, 23];

    fn hello_world_block() -> Vec<u8> {
        let mut block = HELLO_WORLD_DATA.to_vec();
        block.extend_from_slice(&HELLO_WORLD_ECC);
        block
    }

    #[test]
    fn test_qr_encoder_known_vector() {
        let ecc = ReedSolomonEncoder::new(&QR_FIELD, 10).encode(&HELLO_WORLD_DATA);
        assert_eq!(ecc, HELLO_WORLD_ECC);
    }

    #[test]
    fn test_data_matrix_encoder_known_vector() {
        // "123456" in a 10x10 symbol
        let ecc = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD, 5).encode(&[142, 164, 186]);
        assert_eq!(ecc, vec![114, 25, 5, 88, 102]);
    }

    #[test]
    fn test_clean_block_needs_no_correction() {
        let mut block = hello_world_block();
        let decoder = ReedSolomonDecoder::new(&QR_FIELD, 10);
        assert_eq!(decoder.decode(&mut block), Ok(0));
        assert_eq!(block, hello_world_block());
    }

    #[test]
    fn test_corrects_up_to_half_the_ecc() {
        let decoder = ReedSolomonDecoder::new(&QR_FIELD, 10);
        let mut block = hello_world_block();
        for (pos, err) in [(0usize, 0x55u8), (7, 0x01), (12, 0xFF), (20, 0x80), (25, 0x3C)] {
            block[pos] ^= err;
        }
        assert_eq!(decoder.decode(&mut block), Ok(5));
        assert_eq!(block, hello_world_block());
    }

    #[test]
    fn test_data_matrix_correction() {
        let mut block = vec![142, 164, 186, 114, 25, 5, 88, 102];
        block[1] ^= 0x11;
        block[6] ^= 0xA0;
        let decoder = ReedSolomonDecoder::new(&DATA_MATRIX_FIELD, 5);
        assert_eq!(decoder.decode(&mut block), Ok(2));
        assert_eq!(block, vec![142, 164, 186, 114, 25, 5, 88, 102]);
    }

    #[test]
    fn test_rejects_overlong_block() {
        let decoder = ReedSolomonDecoder::new(&QR_FIELD, 10);
        let mut block = vec![1u8; 300];
        assert_eq!(decoder.decode(&mut block), Err(RsError::BlockTooLong(300)));
    }
}
