//! Codeword fields wider than a byte
//!
//! Aztec words live in GF(2^m) for m of 4, 6, 8, 10 or 12 bits; PDF417
//! codewords live in the prime field GF(929). Both are served by the same
//! log/antilog tables, differing only in how elements add.

use super::reed_solomon::RsError;

/// Largest field any symbology needs
const MAX_SIZE: usize = 4096;

/// GF(2^m) or GF(p) arithmetic over `u16` elements
#[derive(Debug)]
pub struct CodewordField {
    size: usize,
    prime: bool,
    exp: [u16; MAX_SIZE],
    log: [u16; MAX_SIZE],
    generator_base: usize,
}

/// Aztec mode message field: x^4 + x + 1
pub static AZTEC_MODE_FIELD: CodewordField = CodewordField::binary(0x13, 16, 1);

/// Aztec data field for 1-2 layers: x^6 + x + 1
pub static AZTEC_FIELD_6: CodewordField = CodewordField::binary(0x43, 64, 1);

/// Aztec data field for 3-8 layers: x^8 + x^5 + x^3 + x^2 + 1
pub static AZTEC_FIELD_8: CodewordField = CodewordField::binary(0x12D, 256, 1);

/// Aztec data field for 9-22 layers: x^10 + x^3 + 1
pub static AZTEC_FIELD_10: CodewordField = CodewordField::binary(0x409, 1024, 1);

/// Aztec data field for 23-32 layers: x^12 + x^6 + x^5 + x^3 + 1
pub static AZTEC_FIELD_12: CodewordField = CodewordField::binary(0x1069, 4096, 1);

/// PDF417 field: integers mod 929, generated by 3
pub static PDF417_FIELD: CodewordField = CodewordField::prime(929, 3, 1);

impl CodewordField {
    /// GF(2^m) with `size` = 2^m elements from its primitive polynomial
    pub const fn binary(primitive: u32, size: usize, generator_base: usize) -> Self {
        let mut exp = [0u16; MAX_SIZE];
        let mut log = [0u16; MAX_SIZE];
        let mut x: u32 = 1;
        let mut i = 0;
        while i < size - 1 {
            exp[i] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x as usize >= size {
                x ^= primitive;
            }
            i += 1;
        }
        Self {
            size,
            prime: false,
            exp,
            log,
            generator_base,
        }
    }

    /// GF(p) for a prime `modulus` and one of its primitive roots
    pub const fn prime(modulus: u32, generator: u32, generator_base: usize) -> Self {
        let mut exp = [0u16; MAX_SIZE];
        let mut log = [0u16; MAX_SIZE];
        let mut x: u32 = 1;
        let mut i = 0;
        while i < modulus as usize - 1 {
            exp[i] = x as u16;
            log[x as usize] = i as u16;
            x = x * generator % modulus;
            i += 1;
        }
        Self {
            size: modulus as usize,
            prime: true,
            exp,
            log,
            generator_base,
        }
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.size
    }

    /// Order of the multiplicative group
    fn order(&self) -> usize {
        self.size - 1
    }

    /// First exponent of the generator polynomial's consecutive roots
    pub fn generator_base(&self) -> usize {
        self.generator_base
    }

    #[inline]
    pub fn add(&self, a: u16, b: u16) -> u16 {
        if self.prime {
            ((a as usize + b as usize) % self.size) as u16
        } else {
            a ^ b
        }
    }

    #[inline]
    pub fn sub(&self, a: u16, b: u16) -> u16 {
        if self.prime {
            ((a as usize + self.size - b as usize) % self.size) as u16
        } else {
            a ^ b
        }
    }

    #[inline]
    pub fn neg(&self, a: u16) -> u16 {
        self.sub(0, a)
    }

    /// Generator raised to `n`
    #[inline]
    pub fn exp(&self, n: usize) -> u16 {
        self.exp[n % self.order()]
    }

    /// Discrete log of a non-zero element
    #[inline]
    pub fn log(&self, a: u16) -> usize {
        debug_assert!(a != 0, "log of zero");
        self.log[a as usize] as usize
    }

    #[inline]
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp(self.log(a) + self.log(b))
    }

    /// a / b, `b` must be non-zero
    #[inline]
    pub fn div(&self, a: u16, b: u16) -> u16 {
        debug_assert!(b != 0, "division by zero");
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp(self.log(a) + self.order() - self.log(b))
    }

    /// Multiplicative inverse of a non-zero element
    #[inline]
    pub fn inverse(&self, a: u16) -> u16 {
        self.div(1, a)
    }

    /// `a` added to itself `n` times
    pub fn times(&self, n: usize, a: u16) -> u16 {
        if self.prime {
            ((n % self.size) * a as usize % self.size) as u16
        } else if n % 2 == 1 {
            a
        } else {
            0
        }
    }

    /// Evaluate a polynomial given lowest degree first
    pub fn eval_ascending(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter().rev().fold(0, |acc, &c| self.add(self.mul(acc, x), c))
    }

    /// Evaluate a polynomial given highest degree first
    pub fn eval_descending(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter().fold(0, |acc, &c| self.add(self.mul(acc, x), c))
    }
}

/// Reed-Solomon coding of `u16` codewords over a [`CodewordField`]
///
/// Blocks use the descending convention of the byte codec; check words are
/// the negated remainder so that every valid block is a multiple of the
/// generator polynomial.
pub struct CodewordCodec<'f> {
    field: &'f CodewordField,
    num_ecc: usize,
}

impl<'f> CodewordCodec<'f> {
    pub fn new(field: &'f CodewordField, num_ecc: usize) -> Self {
        Self { field, num_ecc }
    }

    /// Check words for `data`
    pub fn encode(&self, data: &[u16]) -> Vec<u16> {
        let field = self.field;
        // Descending coefficients of prod (x - g^(base + i))
        let mut generator = vec![1u16];
        for i in 0..self.num_ecc {
            let root = field.neg(field.exp(field.generator_base() + i));
            let mut next = vec![0u16; generator.len() + 1];
            for (j, &g) in generator.iter().enumerate() {
                next[j] = field.add(next[j], g);
                next[j + 1] = field.add(next[j + 1], field.mul(g, root));
            }
            generator = next;
        }

        let mut remainder = vec![0u16; self.num_ecc];
        if self.num_ecc == 0 {
            return remainder;
        }
        for &d in data {
            let factor = field.add(d, remainder[0]);
            remainder.rotate_left(1);
            remainder[self.num_ecc - 1] = 0;
            for (r, &g) in remainder.iter_mut().zip(&generator[1..]) {
                *r = field.sub(*r, field.mul(factor, g));
            }
        }
        remainder.into_iter().map(|r| field.neg(r)).collect()
    }

    /// Correct `received` in place, returning the number of repaired words
    pub fn decode(&self, received: &mut [u16]) -> Result<usize, RsError> {
        let field = self.field;
        let n = received.len();
        if n >= field.size() {
            return Err(RsError::BlockTooLong(n));
        }
        if n <= self.num_ecc || received.iter().any(|&w| w as usize >= field.size()) {
            return Err(RsError::TooManyErrors);
        }

        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let (locator, errors) = self.error_locator(&syndromes);
        if errors == 0 || 2 * errors > self.num_ecc {
            return Err(RsError::TooManyErrors);
        }
        let locator = &locator[..=errors];

        let positions: Vec<usize> = (0..n)
            .filter(|&j| {
                let power = n - 1 - j;
                field.eval_ascending(locator, field.inverse(field.exp(power))) == 0
            })
            .collect();
        if positions.len() != errors {
            return Err(RsError::TooManyErrors);
        }

        // Omega = S(x) * locator(x) mod x^(2t), ascending
        let evaluator: Vec<u16> = (0..self.num_ecc)
            .map(|k| {
                locator
                    .iter()
                    .enumerate()
                    .take(k + 1)
                    .fold(0, |acc, (i, &c)| field.add(acc, field.mul(c, syndromes[k - i])))
            })
            .collect();
        let derivative: Vec<u16> = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| field.times(i, c))
            .collect();

        let base = field.generator_base() as i64;
        let group = (field.size() - 1) as i64;
        for &j in &positions {
            let power = n - 1 - j;
            let x_inv = field.inverse(field.exp(power));
            let denominator = field.eval_ascending(&derivative, x_inv);
            if denominator == 0 {
                return Err(RsError::TooManyErrors);
            }
            let scale = field.exp((power as i64 * (1 - base)).rem_euclid(group) as usize);
            let value = field.eval_ascending(&evaluator, x_inv);
            let magnitude = field.mul(scale, field.div(value, denominator));
            received[j] = field.add(received[j], magnitude);
        }

        if self.syndromes(received).iter().any(|&s| s != 0) {
            return Err(RsError::TooManyErrors);
        }
        Ok(errors)
    }

    fn syndromes(&self, received: &[u16]) -> Vec<u16> {
        let field = self.field;
        (0..self.num_ecc)
            .map(|i| field.eval_descending(received, field.exp(field.generator_base() + i)))
            .collect()
    }

    /// Berlekamp-Massey: locator polynomial (ascending) and its degree
    fn error_locator(&self, syndromes: &[u16]) -> (Vec<u16>, usize) {
        let field = self.field;
        let len = self.num_ecc + 1;
        let mut locator = vec![0u16; len];
        let mut prev = vec![0u16; len];
        locator[0] = 1;
        prev[0] = 1;
        let mut l = 0usize;
        let mut m = 1usize;
        let mut prev_delta = 1u16;

        for k in 0..syndromes.len() {
            let delta = (1..=l).fold(syndromes[k], |acc, i| {
                field.add(acc, field.mul(locator[i], syndromes[k - i]))
            });
            if delta == 0 {
                m += 1;
                continue;
            }

            let coef = field.div(delta, prev_delta);
            let snapshot = (2 * l <= k).then(|| locator.clone());
            for i in 0..len - m {
                locator[i + m] = field.sub(locator[i + m], field.mul(coef, prev[i]));
            }
            match snapshot {
                Some(snapshot) => {
                    l = k + 1 - l;
                    prev = snapshot;
                    prev_delta = delta;
                    m = 1;
                }
                None => m += 1,
            }
        }

        if locator[l + 1..].iter().any(|&c| c != 0) {
            return (locator, 0);
        }
        (locator, l)
    }
}
