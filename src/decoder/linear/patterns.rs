//! Bar/space width tables and pattern matching for linear symbologies

/// Code 128 symbol characters 0..=105 (start A/B/C are 103..=105), 11 modules each
pub const CODE128_PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2],
];

/// Code 128 stop pattern, 13 modules including the final bar
pub const CODE128_STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

pub const CODE128_START_A: u8 = 103;
pub const CODE128_START_B: u8 = 104;
pub const CODE128_START_C: u8 = 105;

/// EAN/UPC L-code digit widths (space, bar, space, bar); G-codes are these reversed
pub const EAN_L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// G-code parity of the six left digits (bit 5 = first digit) per EAN-13 leading digit
pub const EAN13_FIRST_DIGIT_PARITY: [u8; 10] =
    [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

/// G-code parity of UPC-E digits for number system 0, indexed by check digit
pub const UPCE_NS0_PARITY: [u8; 10] = [0x38, 0x34, 0x32, 0x31, 0x2C, 0x26, 0x23, 0x2A, 0x29, 0x25];

pub const EAN_START_GUARD: [u8; 3] = [1, 1, 1];
pub const EAN_MIDDLE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];
pub const UPCE_END_GUARD: [u8; 6] = [1, 1, 1, 1, 1, 1];

/// Run counts from the first to the last bar
pub const EAN13_RUNS: usize = 59;
pub const EAN8_RUNS: usize = 43;
pub const UPCE_RUNS: usize = 33;

/// Code 39 alphabet in value order (value = index, as used by the mod-43 check)
pub const CODE39_ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Code 39 wide/narrow patterns, 9 elements MSB first, 1 = wide
pub const CODE39_ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, // /+%
];

/// Code 39 start/stop character
pub const CODE39_ASTERISK: u16 = 0x094;

/// ITF digit patterns, 5 elements MSB first, 1 = wide
pub const ITF_PATTERNS: [u8; 10] = [
    0b00110, 0b10001, 0b01001, 0b11000, 0b00101, 0b10100, 0b01100, 0b00011, 0b10010, 0b01010,
];

pub const ITF_START: [u8; 4] = [1, 1, 1, 1];
pub const ITF_STOP: [u8; 3] = [3, 1, 1];

/// Wide element width in narrow units when rendering Code 39 and ITF
pub const WIDE_RATIO: u8 = 3;

/// Variance of observed widths against a pattern, `f32::INFINITY` on a bad element
///
/// Widths are normalised to the pattern's module count. Each element may be
/// off by at most `max_individual` modules; the result is the total deviation
/// per module.
pub fn pattern_variance(counters: &[f32], pattern: &[u8], max_individual: f32) -> f32 {
    if counters.len() != pattern.len() {
        return f32::INFINITY;
    }
    let total: f32 = counters.iter().sum();
    let pattern_len: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total < pattern_len as f32 {
        return f32::INFINITY;
    }
    let unit = total / pattern_len as f32;
    let max_individual = max_individual * unit;

    let mut total_variance = 0.0f32;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let variance = (counter - expected as f32 * unit).abs();
        if variance > max_individual {
            return f32::INFINITY;
        }
        total_variance += variance;
    }
    total_variance / total
}

/// Best matching pattern index and its variance
pub fn best_match<const N: usize>(
    counters: &[f32],
    patterns: &[[u8; N]],
    max_individual: f32,
) -> Option<(usize, f32)> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| (i, pattern_variance(counters, p, max_individual)))
        .filter(|(_, v)| v.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Classify `counters` into narrow (0) and wide (1) with exactly `wide` wide elements
///
/// Returns the MSB-first bit pattern, or `None` if the widths do not split
/// cleanly into two classes.
pub fn narrow_wide_pattern(counters: &[f32], wide: usize) -> Option<u16> {
    if wide == 0 || wide >= counters.len() || counters.len() > 16 {
        return None;
    }
    let mut sorted: Vec<f32> = counters.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let narrow_max = sorted[counters.len() - wide - 1];
    let wide_min = sorted[counters.len() - wide];
    // Wide elements must be clearly wider than narrow ones
    if wide_min < narrow_max * 1.5 {
        return None;
    }
    let threshold = (narrow_max + wide_min) / 2.0;
    Some(
        counters
            .iter()
            .fold(0u16, |acc, &c| (acc << 1) | (c > threshold) as u16),
    )
}

/// Deviation of each element from the mean width of its class, per unit of total width
pub fn narrow_wide_variance(counters: &[f32], bits: u16) -> f32 {
    let n = counters.len();
    let is_wide = |i: usize| (bits >> (n - 1 - i)) & 1 == 1;
    let (mut narrow_sum, mut narrow_count, mut wide_sum, mut wide_count) = (0.0, 0, 0.0, 0);
    for (i, &c) in counters.iter().enumerate() {
        if is_wide(i) {
            wide_sum += c;
            wide_count += 1;
        } else {
            narrow_sum += c;
            narrow_count += 1;
        }
    }
    let total: f32 = counters.iter().sum();
    if narrow_count == 0 || wide_count == 0 || total <= 0.0 {
        return f32::INFINITY;
    }
    let (narrow, wide) = (narrow_sum / narrow_count as f32, wide_sum / wide_count as f32);
    counters
        .iter()
        .enumerate()
        .map(|(i, &c)| (c - if is_wide(i) { wide } else { narrow }).abs())
        .sum::<f32>()
        / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code128_patterns_are_11_modules() {
        for (i, p) in CODE128_PATTERNS.iter().enumerate() {
            assert_eq!(p.iter().map(|&v| v as u32).sum::<u32>(), 11, "pattern {i}");
        }
        assert_eq!(CODE128_STOP.iter().map(|&v| v as u32).sum::<u32>(), 13);
    }

    #[test]
    fn test_pattern_variance() {
        let exact = [4.0, 2.0, 4.0, 4.0, 4.0, 4.0];
        assert!(pattern_variance(&exact, &CODE128_PATTERNS[0], 0.7) < 1e-6);
        let (index, _) = best_match(&exact, &CODE128_PATTERNS, 0.7).unwrap();
        assert_eq!(index, 0);
        assert!(pattern_variance(&[1.0, 1.0], &[1, 1, 1], 0.7).is_infinite());
    }

    #[test]
    fn test_narrow_wide_classification() {
        // '*' = n w n n w n w n n
        let widths = [2.0, 6.0, 2.0, 2.0, 5.0, 2.0, 7.0, 2.0, 3.0];
        assert_eq!(narrow_wide_pattern(&widths, 3), Some(CODE39_ASTERISK));
        assert_eq!(narrow_wide_pattern(&[2.0; 9], 3), None);
        let clean = [2.0, 6.0, 2.0, 2.0, 6.0, 2.0, 6.0, 2.0, 2.0];
        assert!(narrow_wide_variance(&clean, CODE39_ASTERISK) < 1e-6);
        assert!(narrow_wide_variance(&widths, CODE39_ASTERISK) > 0.05);
    }
}
