/// Interleaved 2 of 5 demodulation
use super::Demodulated;
use super::patterns::{
    ITF_PATTERNS, ITF_START, ITF_STOP, narrow_wide_pattern, narrow_wide_variance, pattern_variance,
};
use crate::correction::CheckScheme;
use crate::models::Symbology;

const MAX_AVG_VARIANCE: f32 = 0.38;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.5;

/// Stop bar at 2:1 and 3:1 wide ratios
const STOP_PATTERNS: [[u8; 3]; 2] = [ITF_STOP, [2, 1, 1]];

fn decode_digit(counters: [f32; 5]) -> Option<(u8, f32)> {
    let bits = narrow_wide_pattern(&counters, 2)?;
    let digit = ITF_PATTERNS.iter().position(|&p| p as u16 == bits)?;
    Some((digit as u8, narrow_wide_variance(&counters, bits)))
}

/// Runs of start, digit pairs and stop, bar to bar
pub fn demodulate(runs: &[f32]) -> Option<Demodulated> {
    if runs.len() < 37 || (runs.len() - 7) % 10 != 0 {
        return None;
    }
    if pattern_variance(&runs[..4], &ITF_START, MAX_INDIVIDUAL_VARIANCE) >= MAX_AVG_VARIANCE {
        return None;
    }
    let stop = &runs[runs.len() - 3..];
    let stop_variance = STOP_PATTERNS
        .iter()
        .map(|p| pattern_variance(stop, p, MAX_INDIVIDUAL_VARIANCE))
        .fold(f32::INFINITY, f32::min);
    if stop_variance >= MAX_AVG_VARIANCE {
        return None;
    }

    let pairs = (runs.len() - 7) / 10;
    let mut values = Vec::with_capacity(2 * pairs);
    let mut variance = 0.0;
    for pair in runs[4..runs.len() - 3].chunks_exact(10) {
        // Bars carry the first digit, spaces the second
        let bars = [pair[0], pair[2], pair[4], pair[6], pair[8]];
        let spaces = [pair[1], pair[3], pair[5], pair[7], pair[9]];
        for counters in [bars, spaces] {
            let (digit, v) = decode_digit(counters)?;
            if v >= MAX_AVG_VARIANCE {
                return None;
            }
            values.push(digit);
            variance += v;
        }
    }
    Some(Demodulated {
        symbology: Symbology::Itf,
        values,
        check: CheckScheme::Itf,
        variance: variance / (2 * pairs) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::linear::{itf_modules, modules_to_runs};

    #[test]
    fn test_demodulate_rendered_symbol() {
        let runs = modules_to_runs(&itf_modules("12345678", false).unwrap(), 2.0);
        assert_eq!(runs.len(), 7 + 40);
        let d = demodulate(&runs).unwrap();
        assert_eq!(d.values, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut reversed = runs;
        reversed.reverse();
        assert!(demodulate(&reversed).is_none());
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        assert!(demodulate(&[2.0; 27]).is_none());
        assert!(demodulate(&[2.0; 40]).is_none());
    }
}
