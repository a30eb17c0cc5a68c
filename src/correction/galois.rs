/// GF(256) arithmetic through log/antilog tables
///
/// The tables are built at compile time from the field's primitive
/// polynomial, so every field is an immutable `static` shared by all threads.
#[derive(Debug)]
pub struct GaloisField {
    exp: [u8; 512],
    log: [u8; 256],
    generator_base: usize,
}

/// QR Code field: x^8 + x^4 + x^3 + x^2 + 1, generator roots start at a^0
pub static QR_FIELD: GaloisField = GaloisField::new(0x11D, 0);

/// Data Matrix field: x^8 + x^5 + x^3 + x^2 + 1, generator roots start at a^1
pub static DATA_MATRIX_FIELD: GaloisField = GaloisField::new(0x12D, 1);

impl GaloisField {
    /// Build the field for `primitive` (degree-8 polynomial, bit 8 set)
    pub const fn new(primitive: u16, generator_base: usize) -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < 255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= primitive;
            }
            i += 1;
        }
        // Doubled so that log(a) + log(b) indexes without a modulo
        while i < 512 {
            exp[i] = exp[i - 255];
            i += 1;
        }
        Self {
            exp,
            log,
            generator_base,
        }
    }

    /// First exponent of the generator polynomial's consecutive roots
    pub fn generator_base(&self) -> usize {
        self.generator_base
    }

    /// a^n
    #[inline]
    pub fn exp(&self, n: usize) -> u8 {
        self.exp[n % 255]
    }

    /// Discrete log of a non-zero element
    #[inline]
    pub fn log(&self, a: u8) -> usize {
        debug_assert!(a != 0, "log of zero");
        self.log[a as usize] as usize
    }

    #[inline]
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// a / b, `b` must be non-zero
    #[inline]
    pub fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "division by zero");
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + 255 - self.log[b as usize] as usize]
    }

    /// Multiplicative inverse of a non-zero element
    #[inline]
    pub fn inverse(&self, a: u8) -> u8 {
        self.div(1, a)
    }

    /// Evaluate a polynomial given lowest degree first
    pub fn eval_ascending(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }

    /// Evaluate a polynomial given highest degree first
    pub fn eval_descending(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_match_known_values() {
        assert_eq!(QR_FIELD.exp(8), 0x1D);
        assert_eq!(QR_FIELD.exp(255), 1);
        assert_eq!(QR_FIELD.log(2), 1);
        assert_eq!(DATA_MATRIX_FIELD.exp(8), 0x2D);
    }

    #[test]
    fn test_mul_div_inverse() {
        for field in [&QR_FIELD, &DATA_MATRIX_FIELD] {
            for a in 1..=255u8 {
                assert_eq!(field.mul(a, field.inverse(a)), 1);
                for b in [1u8, 2, 3, 0x53, 0xCA, 0xFF] {
                    assert_eq!(field.div(field.mul(a, b), b), a);
                }
            }
            assert_eq!(field.mul(0, 7), 0);
        }
    }

    #[test]
    fn test_eval_orders_agree() {
        let poly = [3u8, 0, 5, 1];
        let reversed: Vec<u8> = poly.iter().rev().copied().collect();
        for x in [0u8, 1, 2, 77] {
            assert_eq!(
                QR_FIELD.eval_ascending(&poly, x),
                QR_FIELD.eval_descending(&reversed, x)
            );
        }
    }
}
