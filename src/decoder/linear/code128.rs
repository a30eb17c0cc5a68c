/// Code 128 demodulation and code set interpretation
use super::Demodulated;
use super::patterns::{
    CODE128_PATTERNS, CODE128_START_A, CODE128_START_B, CODE128_START_C, CODE128_STOP, best_match,
    pattern_variance,
};
use crate::correction::CheckScheme;
use crate::models::Symbology;

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

const CODE_SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const FNC_1: u8 = 102;
const FNC_2: u8 = 97;
const FNC_3: u8 = 96;

const GS: char = '\u{1D}';

/// Runs of a symbol: start, data and check characters, then the stop pattern
pub fn demodulate(runs: &[f32]) -> Option<Demodulated> {
    if runs.len() < 6 * 3 + 7 || (runs.len() - 7) % 6 != 0 {
        return None;
    }
    let characters = (runs.len() - 7) / 6;
    let mut values = Vec::with_capacity(characters);
    let mut variance = 0.0;
    for i in 0..characters {
        let (value, v) =
            best_match(&runs[6 * i..6 * i + 6], &CODE128_PATTERNS, MAX_INDIVIDUAL_VARIANCE)?;
        if v >= MAX_AVG_VARIANCE {
            return None;
        }
        values.push(value as u8);
        variance += v;
    }
    if !(CODE128_START_A..=CODE128_START_C).contains(&values[0]) {
        return None;
    }
    // Start codes are only valid in front
    if values[1..].iter().any(|&v| v >= CODE128_START_A) {
        return None;
    }
    let stop = pattern_variance(&runs[runs.len() - 7..], &CODE128_STOP, MAX_INDIVIDUAL_VARIANCE);
    if stop >= MAX_AVG_VARIANCE {
        return None;
    }
    Some(Demodulated {
        symbology: Symbology::Code128,
        values,
        check: CheckScheme::Code128,
        variance: (variance + stop) / (characters + 1) as f32,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// Text of `[start, data...]` values, check character already removed
pub fn interpret(values: &[u8]) -> Option<String> {
    let (&start, data) = values.split_first()?;
    let mut set = match start {
        CODE128_START_A => CodeSet::A,
        CODE128_START_B => CodeSet::B,
        CODE128_START_C => CodeSet::C,
        _ => return None,
    };
    let mut text = String::with_capacity(data.len() * 2);
    let mut shifted = false;
    let mut fnc4 = false;

    for (i, &value) in data.iter().enumerate() {
        let current = if shifted {
            match set {
                CodeSet::A => CodeSet::B,
                CodeSet::B => CodeSet::A,
                CodeSet::C => CodeSet::C,
            }
        } else {
            set
        };
        shifted = false;

        if value == FNC_1 {
            // A leading FNC1 marks GS1 data and is not transmitted
            if i > 0 {
                text.push(GS);
            }
            continue;
        }

        match current {
            CodeSet::A | CodeSet::B => {
                let ascii = match (current, value) {
                    (CodeSet::A, 0..=63) => Some(value + 32),
                    (CodeSet::A, 64..=95) => Some(value - 64),
                    (CodeSet::B, 0..=95) => Some(value + 32),
                    _ => None,
                };
                if let Some(ascii) = ascii {
                    let byte = if fnc4 { ascii | 0x80 } else { ascii };
                    fnc4 = false;
                    text.push(byte as char);
                    continue;
                }
                match value {
                    FNC_2 | FNC_3 => {}
                    CODE_SHIFT => shifted = true,
                    CODE_C => set = CodeSet::C,
                    // FNC4 in the current set, otherwise a switch
                    CODE_B if current == CodeSet::B => fnc4 = true,
                    CODE_A if current == CodeSet::A => fnc4 = true,
                    CODE_B => set = CodeSet::B,
                    CODE_A => set = CodeSet::A,
                    _ => return None,
                }
            }
            CodeSet::C => match value {
                0..=99 => {
                    text.push((b'0' + value / 10) as char);
                    text.push((b'0' + value % 10) as char);
                }
                CODE_B => set = CodeSet::B,
                CODE_A => set = CodeSet::A,
                _ => return None,
            },
        }
    }
    Some(text)
}
