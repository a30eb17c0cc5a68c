/// EAN-13, EAN-8, UPC-A and UPC-E demodulation
use super::Demodulated;
use super::patterns::{
    EAN_L_PATTERNS, EAN_MIDDLE_GUARD, EAN_START_GUARD, EAN8_RUNS, EAN13_FIRST_DIGIT_PARITY,
    EAN13_RUNS, UPCE_END_GUARD, UPCE_NS0_PARITY, UPCE_RUNS, pattern_variance,
};
use crate::correction::CheckScheme;
use crate::models::Symbology;

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// G-code patterns: L-code widths read backwards
const fn g_patterns() -> [[u8; 4]; 10] {
    let mut out = [[0u8; 4]; 10];
    let mut i = 0;
    while i < 10 {
        let l = EAN_L_PATTERNS[i];
        out[i] = [l[3], l[2], l[1], l[0]];
        i += 1;
    }
    out
}

const EAN_G_PATTERNS: [[u8; 4]; 10] = g_patterns();

/// Digit value, whether it used G parity, and its variance
fn decode_digit(counters: &[f32], allow_g: bool) -> Option<(u8, bool, f32)> {
    let mut best: Option<(u8, bool, f32)> = None;
    let tables: &[(&[[u8; 4]; 10], bool)] = if allow_g {
        &[(&EAN_L_PATTERNS, false), (&EAN_G_PATTERNS, true)]
    } else {
        &[(&EAN_L_PATTERNS, false)]
    };
    for &(table, parity) in tables {
        for (digit, pattern) in table.iter().enumerate() {
            let variance = pattern_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
            if variance < MAX_AVG_VARIANCE && best.is_none_or(|(_, _, v)| variance < v) {
                best = Some((digit as u8, parity, variance));
            }
        }
    }
    best
}

fn guard_ok(counters: &[f32], pattern: &[u8]) -> bool {
    pattern_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE
}

/// Decode `count` digits starting at run `start`, returning digits, parity bits and variance sum
fn decode_half(
    runs: &[f32],
    start: usize,
    count: usize,
    allow_g: bool,
) -> Option<(Vec<u8>, u8, f32)> {
    let mut digits = Vec::with_capacity(count);
    let mut parity = 0u8;
    let mut variance = 0.0;
    for i in 0..count {
        let at = start + 4 * i;
        let (digit, g, v) = decode_digit(runs.get(at..at + 4)?, allow_g)?;
        digits.push(digit);
        parity = (parity << 1) | g as u8;
        variance += v;
    }
    Some((digits, parity, variance))
}

/// Demodulate runs from the first to the last bar of an EAN/UPC symbol
///
/// An EAN-13 with leading zero is reported as UPC-A when `report_upca` is set.
pub fn demodulate(runs: &[f32], report_upca: bool) -> Option<Demodulated> {
    if !guard_ok(runs.get(0..3)?, &EAN_START_GUARD) {
        return None;
    }
    match runs.len() {
        EAN13_RUNS => {
            let (mut left, parity, v1) = decode_half(runs, 3, 6, true)?;
            if !guard_ok(&runs[27..32], &EAN_MIDDLE_GUARD) {
                return None;
            }
            let (right, _, v2) = decode_half(runs, 32, 6, false)?;
            if !guard_ok(&runs[56..59], &EAN_START_GUARD) {
                return None;
            }
            let first = EAN13_FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;
            let mut values = Vec::with_capacity(13);
            values.push(first);
            values.append(&mut left);
            values.extend(right);

            let symbology = if first == 0 && report_upca {
                values.remove(0);
                Symbology::UpcA
            } else {
                Symbology::Ean13
            };
            Some(Demodulated {
                symbology,
                values,
                check: CheckScheme::Gtin,
                variance: (v1 + v2) / 12.0,
            })
        }
        EAN8_RUNS => {
            let (mut left, parity, v1) = decode_half(runs, 3, 4, false)?;
            if parity != 0 || !guard_ok(&runs[19..24], &EAN_MIDDLE_GUARD) {
                return None;
            }
            let (right, _, v2) = decode_half(runs, 24, 4, false)?;
            if !guard_ok(&runs[40..43], &EAN_START_GUARD) {
                return None;
            }
            left.extend(right);
            Some(Demodulated {
                symbology: Symbology::Ean8,
                values: left,
                check: CheckScheme::Gtin,
                variance: (v1 + v2) / 8.0,
            })
        }
        UPCE_RUNS => {
            let (digits, parity, v) = decode_half(runs, 3, 6, true)?;
            if !guard_ok(&runs[27..33], &UPCE_END_GUARD) {
                return None;
            }
            let (number_system, check) = UPCE_NS0_PARITY
                .iter()
                .position(|&p| p == parity)
                .map(|c| (0u8, c as u8))
                .or_else(|| {
                    UPCE_NS0_PARITY
                        .iter()
                        .position(|&p| p ^ 0x3F == parity)
                        .map(|c| (1u8, c as u8))
                })?;
            let mut values = Vec::with_capacity(8);
            values.push(number_system);
            values.extend(digits);
            values.push(check);
            Some(Demodulated {
                symbology: Symbology::UpcE,
                values,
                check: CheckScheme::UpcE,
                variance: v / 6.0,
            })
        }
        _ => None,
    }
}

/// Digits as text
pub fn interpret(values: &[u8]) -> Option<String> {
    values
        .iter()
        .map(|&d| (d < 10).then_some((b'0' + d) as char))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::linear::{ean13_modules, modules_to_runs};

    #[test]
    fn test_ean13_runs() {
        let runs = modules_to_runs(&ean13_modules(&[5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5, 7]), 2.0);
        assert_eq!(runs.len(), EAN13_RUNS);
        let d = demodulate(&runs, true).unwrap();
        assert_eq!(d.symbology, Symbology::Ean13);
        assert_eq!(interpret(&d.values).as_deref(), Some("5901234123457"));
    }

    #[test]
    fn test_leading_zero_is_upca() {
        let runs = modules_to_runs(&ean13_modules(&[0, 0, 3, 6, 0, 0, 0, 2, 9, 1, 4, 5, 2]), 3.0);
        let d = demodulate(&runs, true).unwrap();
        assert_eq!(d.symbology, Symbology::UpcA);
        assert_eq!(d.values.len(), 12);
        let d = demodulate(&runs, false).unwrap();
        assert_eq!(d.symbology, Symbology::Ean13);
    }

    #[test]
    fn test_reversed_runs_do_not_decode() {
        let modules = ean13_modules(&[5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5, 7]);
        let mut runs = modules_to_runs(&modules, 2.0);
        runs.reverse();
        assert!(demodulate(&runs, true).is_none());
    }
}
