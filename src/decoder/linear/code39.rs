/// Code 39 demodulation and full-ASCII interpretation
use super::Demodulated;
use super::patterns::{
    CODE39_ALPHABET, CODE39_ASTERISK, CODE39_ENCODINGS, narrow_wide_pattern, narrow_wide_variance,
};
use crate::correction::CheckScheme;
use crate::models::Symbology;

const MAX_AVG_VARIANCE: f32 = 0.2;

/// Elements per character, followed by a narrow inter-character gap
const CHARACTER_RUNS: usize = 9;

fn decode_character(counters: &[f32]) -> Option<(u16, f32)> {
    let bits = narrow_wide_pattern(counters, 3)?;
    let variance = narrow_wide_variance(counters, bits);
    (variance < MAX_AVG_VARIANCE).then_some((bits, variance))
}

/// Runs of `*data*`, bar to bar
pub fn demodulate(runs: &[f32]) -> Option<Demodulated> {
    if runs.len() < 29 || (runs.len() + 1) % 10 != 0 {
        return None;
    }
    let characters = (runs.len() + 1) / 10;
    let mut values = Vec::with_capacity(characters - 2);
    let mut variance = 0.0;
    for i in 0..characters {
        let counters = &runs[10 * i..10 * i + CHARACTER_RUNS];
        let (bits, v) = decode_character(counters)?;
        variance += v;
        let is_edge = i == 0 || i == characters - 1;
        if is_edge != (bits == CODE39_ASTERISK) {
            return None;
        }
        if !is_edge {
            values.push(CODE39_ENCODINGS.iter().position(|&e| e == bits)? as u8);
        }
        // The gap must stay narrow
        if let Some(&gap) = runs.get(10 * i + CHARACTER_RUNS) {
            let narrow = counters.iter().copied().fold(f32::INFINITY, f32::min);
            if gap > narrow * 2.5 {
                return None;
            }
        }
    }
    Some(Demodulated {
        symbology: Symbology::Code39,
        values,
        check: CheckScheme::Code39,
        variance: variance / characters as f32,
    })
}

/// Text of the data values, expanding shift pairs when `extended` is set
///
/// Returns `None` for a malformed shift pair in extended mode.
pub fn interpret(values: &[u8], extended: bool) -> Option<String> {
    let plain: Vec<u8> = values
        .iter()
        .map(|&v| CODE39_ALPHABET.get(v as usize).copied())
        .collect::<Option<_>>()?;
    if !extended {
        return Some(plain.into_iter().map(char::from).collect());
    }

    let mut text = String::with_capacity(plain.len());
    let mut iter = plain.into_iter();
    while let Some(c) = iter.next() {
        if !matches!(c, b'+' | b'$' | b'%' | b'/') {
            text.push(c as char);
            continue;
        }
        let next = iter.next()?;
        let decoded = match (c, next) {
            (b'+', b'A'..=b'Z') => next + 32,
            (b'$', b'A'..=b'Z') => next - 64,
            (b'%', b'A'..=b'E') => next - 38,
            (b'%', b'F'..=b'J') => next - 11,
            (b'%', b'K'..=b'O') => next + 16,
            (b'%', b'P'..=b'T') => next + 43,
            (b'%', b'U') => 0,
            (b'%', b'V') => b'@',
            (b'%', b'W') => b'`',
            (b'%', b'X'..=b'Z') => 127,
            (b'/', b'A'..=b'O') => next - 32,
            (b'/', b'Z') => b':',
            _ => return None,
        };
        text.push(decoded as char);
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::linear::{code39_modules, modules_to_runs};

    fn values(text: &str) -> Vec<u8> {
        text.bytes()
            .map(|b| CODE39_ALPHABET.iter().position(|&c| c == b).unwrap() as u8)
            .collect()
    }

    #[test]
    fn test_demodulate_rendered_symbol() {
        let modules = code39_modules("CODE39", false).unwrap();
        let runs = modules_to_runs(&modules, 2.0);
        let d = demodulate(&runs).unwrap();
        assert_eq!(d.values, values("CODE39"));
        assert_eq!(interpret(&d.values, false).as_deref(), Some("CODE39"));

        let mut reversed = runs;
        reversed.reverse();
        assert!(demodulate(&reversed).is_none());
    }

    #[test]
    fn test_extended_pairs() {
        assert_eq!(interpret(&values("+A+B$M%U/Z%V"), true).as_deref(), Some("ab\r\0:@"));
        assert_eq!(interpret(&values("%A%F%K%P"), true).as_deref(), Some("\x1b;[{"));
        assert_eq!(interpret(&values("+A"), false).as_deref(), Some("+A"));
        assert!(interpret(&values("+1"), true).is_none());
        assert!(interpret(&values("AB/"), true).is_none());
    }
}
