//! Check characters of the linear symbologies

/// Integrity check attached to a linear payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScheme {
    /// GTIN mod-10 over all digits (EAN-13, EAN-8, UPC-A)
    Gtin,
    /// GTIN mod-10 over the UPC-A expansion of an 8-digit UPC-E
    UpcE,
    /// Weighted mod-103 over start and data values, check value last
    Code128,
    /// Mod-43 over data values, check value last (when enabled)
    Code39,
    /// GTIN-style mod-10 over the digits (when enabled)
    Itf,
}

/// GTIN check digit for `digits` (payload without its check digit)
///
/// Weights alternate 3, 1, 3, ... starting from the rightmost payload digit.
pub fn gtin_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Whether the last digit is the GTIN check digit of the others
pub fn gtin_is_valid(digits: &[u8]) -> bool {
    match digits.split_last() {
        Some((&check, payload)) if !payload.is_empty() => gtin_check_digit(payload) == check,
        _ => false,
    }
}

/// Expand UPC-E (number system, six digits, check) to the 12-digit UPC-A
pub fn upce_to_upca(upce: &[u8]) -> Option<Vec<u8>> {
    if upce.len() != 8 || upce[0] > 1 {
        return None;
    }
    let d = &upce[1..7];
    let mut upca = Vec::with_capacity(12);
    upca.push(upce[0]);
    match d[5] {
        0..=2 => {
            upca.extend_from_slice(&[d[0], d[1], d[5], 0, 0, 0, 0, d[2], d[3], d[4]]);
        }
        3 => upca.extend_from_slice(&[d[0], d[1], d[2], 0, 0, 0, 0, 0, d[3], d[4]]),
        4 => upca.extend_from_slice(&[d[0], d[1], d[2], d[3], 0, 0, 0, 0, 0, d[4]]),
        _ => upca.extend_from_slice(&[d[0], d[1], d[2], d[3], d[4], 0, 0, 0, 0, d[5]]),
    }
    upca.push(upce[7]);
    Some(upca)
}

/// Code 128 checksum value over `[start, data...]`
pub fn code128_checksum(values: &[u8]) -> u8 {
    let sum: u32 = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as u32 * (i as u32).max(1))
        .sum();
    (sum % 103) as u8
}

/// Code 39 mod-43 check value over data character values
pub fn code39_checksum(values: &[u8]) -> u8 {
    (values.iter().map(|&v| v as u32).sum::<u32>() % 43) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(s: &str) -> Vec<u8> {
        s.bytes().map(|b| b - b'0').collect()
    }

    #[test]
    fn test_gtin_check_digit() {
        assert_eq!(gtin_check_digit(&digits("590123412345")), 7);
        assert!(gtin_is_valid(&digits("5901234123457")));
        assert!(!gtin_is_valid(&digits("5901234123458")));
        assert!(gtin_is_valid(&digits("96385074")));
        assert!(gtin_is_valid(&digits("036000291452")));
        assert!(!gtin_is_valid(&[]));
    }

    #[test]
    fn test_upce_expansion() {
        // 0 425261 4 expands to 0 42100 00526 4
        assert_eq!(upce_to_upca(&digits("04252614")), Some(digits("042100005264")));
        assert_eq!(upce_to_upca(&digits("01234565")), Some(digits("012345000065")));
        assert!(gtin_is_valid(&digits("012345000065")));
        assert_eq!(upce_to_upca(&digits("21234565")), None);
    }

    #[test]
    fn test_code128_checksum() {
        // Start B, "PJJ123C": 879 mod 103
        let values = [104, 48, 42, 42, 17, 18, 19, 35];
        assert_eq!(code128_checksum(&values), 55);
    }

    #[test]
    fn test_code39_checksum() {
        // "CODE39" -> check character 'W' (value 32)
        let values = [12, 24, 13, 14, 3, 9];
        assert_eq!(code39_checksum(&values), 32);
    }
}
