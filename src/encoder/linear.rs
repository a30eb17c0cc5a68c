//! Module patterns of the linear symbologies

use crate::correction::checksum::{
    code39_checksum, code128_checksum, gtin_check_digit, upce_to_upca,
};
use crate::decoder::linear::patterns::{
    CODE39_ALPHABET, CODE39_ASTERISK, CODE39_ENCODINGS, CODE128_PATTERNS, CODE128_START_A,
    CODE128_START_B, CODE128_START_C, CODE128_STOP, EAN_L_PATTERNS, EAN_MIDDLE_GUARD,
    EAN_START_GUARD, EAN13_FIRST_DIGIT_PARITY, ITF_PATTERNS, ITF_START, ITF_STOP, UPCE_END_GUARD,
    UPCE_NS0_PARITY, WIDE_RATIO,
};
use crate::error::{Error, Result};
use crate::models::Symbology;

/// Append elements of `widths` modules, alternating colour from `dark`
fn push_widths(modules: &mut Vec<bool>, widths: &[u8], mut dark: bool) {
    for &w in widths {
        modules.extend(std::iter::repeat_n(dark, w as usize));
        dark = !dark;
    }
}

fn l_pattern(digit: u8) -> [u8; 4] {
    EAN_L_PATTERNS[usize::from(digit.min(9))]
}

/// Left-half digit, G parity reads the L widths backwards
fn push_left_digit(modules: &mut Vec<bool>, digit: u8, g_parity: bool) {
    let mut widths = l_pattern(digit);
    if g_parity {
        widths.reverse();
    }
    push_widths(modules, &widths, false);
}

/// EAN-13 modules for 13 digits, check digit included
pub fn ean13_modules(digits: &[u8; 13]) -> Vec<bool> {
    let mut modules = Vec::with_capacity(95);
    let parity = EAN13_FIRST_DIGIT_PARITY[usize::from(digits[0].min(9))];
    push_widths(&mut modules, &EAN_START_GUARD, true);
    for (i, &d) in digits[1..7].iter().enumerate() {
        push_left_digit(&mut modules, d, (parity >> (5 - i)) & 1 == 1);
    }
    push_widths(&mut modules, &EAN_MIDDLE_GUARD, false);
    for &d in &digits[7..] {
        push_widths(&mut modules, &l_pattern(d), true);
    }
    push_widths(&mut modules, &EAN_START_GUARD, true);
    modules
}

/// EAN-8 modules for 8 digits, check digit included
pub fn ean8_modules(digits: &[u8; 8]) -> Vec<bool> {
    let mut modules = Vec::with_capacity(67);
    push_widths(&mut modules, &EAN_START_GUARD, true);
    for &d in &digits[..4] {
        push_left_digit(&mut modules, d, false);
    }
    push_widths(&mut modules, &EAN_MIDDLE_GUARD, false);
    for &d in &digits[4..] {
        push_widths(&mut modules, &l_pattern(d), true);
    }
    push_widths(&mut modules, &EAN_START_GUARD, true);
    modules
}

/// UPC-E modules for number system, six digits and check digit
pub fn upce_modules(digits: &[u8; 8]) -> Vec<bool> {
    let mut parity = UPCE_NS0_PARITY[usize::from(digits[7].min(9))];
    if digits[0] == 1 {
        parity ^= 0x3F;
    }
    let mut modules = Vec::with_capacity(51);
    push_widths(&mut modules, &EAN_START_GUARD, true);
    for (i, &d) in digits[1..7].iter().enumerate() {
        push_left_digit(&mut modules, d, (parity >> (5 - i)) & 1 == 1);
    }
    push_widths(&mut modules, &UPCE_END_GUARD, false);
    modules
}

/// Parse a GTIN payload of `N` digits, computing or verifying the check digit
pub fn gtin_digits<const N: usize>(text: &str, symbology: Symbology) -> Result<[u8; N]> {
    let digits = parse_digits(text, symbology)?;
    let mut out = [0u8; N];
    match digits.len() {
        n if n == N - 1 => {
            out[..N - 1].copy_from_slice(&digits);
            out[N - 1] = gtin_check_digit(&digits);
        }
        n if n == N => {
            if gtin_check_digit(&digits[..N - 1]) != digits[N - 1] {
                return Err(Error::encode(symbology, "check digit mismatch"));
            }
            out.copy_from_slice(&digits);
        }
        n => {
            return Err(Error::encode(
                symbology,
                format!("expected {} or {N} digits, got {n}", N - 1),
            ));
        }
    }
    Ok(out)
}

/// Parse a UPC-E payload (number system, six digits, optional check digit)
pub fn upce_digits(text: &str) -> Result<[u8; 8]> {
    let digits = parse_digits(text, Symbology::UpcE)?;
    if !(7..=8).contains(&digits.len()) {
        return Err(Error::encode(Symbology::UpcE, "expected 7 or 8 digits"));
    }
    let mut out = [0u8; 8];
    out[..7].copy_from_slice(&digits[..7]);
    let upca = upce_to_upca(&out)
        .ok_or_else(|| Error::encode(Symbology::UpcE, "number system must be 0 or 1"))?;
    let check = gtin_check_digit(&upca[..11]);
    if digits.len() == 8 && digits[7] != check {
        return Err(Error::encode(Symbology::UpcE, "check digit mismatch"));
    }
    out[7] = check;
    Ok(out)
}

fn parse_digits(text: &str, symbology: Symbology) -> Result<Vec<u8>> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::encode(symbology, "payload must be digits"));
    }
    Ok(text.bytes().map(|b| b - b'0').collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;

fn switch_set(values: &mut Vec<u8>, current: &mut Option<CodeSet>, wanted: CodeSet) {
    if *current == Some(wanted) {
        return;
    }
    let value = match (*current, wanted) {
        (None, CodeSet::A) => CODE128_START_A,
        (None, CodeSet::B) => CODE128_START_B,
        (None, CodeSet::C) => CODE128_START_C,
        (Some(_), CodeSet::A) => CODE_A,
        (Some(_), CodeSet::B) => CODE_B,
        (Some(_), CodeSet::C) => CODE_C,
    };
    values.push(value);
    *current = Some(wanted);
}

/// Code 128 symbol values: start, data and check, without the stop pattern
///
/// Runs of four or more digits use set C; control characters use set A.
/// Characters 128..=255 are sent with FNC4.
pub fn code128_values(text: &str) -> Result<Vec<u8>> {
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<_>>()
        .ok_or_else(|| Error::encode(Symbology::Code128, "characters outside ISO-8859-1"))?;
    if bytes.is_empty() {
        return Err(Error::encode(Symbology::Code128, "empty payload"));
    }

    let mut values = Vec::with_capacity(bytes.len() + 3);
    let mut set: Option<CodeSet> = None;
    let mut i = 0;
    while i < bytes.len() {
        let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        let whole_even = set.is_none() && digits == bytes.len() && digits % 2 == 0;
        if digits >= 4 || (digits >= 2 && (set == Some(CodeSet::C) || whole_even)) {
            switch_set(&mut values, &mut set, CodeSet::C);
            for pair in bytes[i..i + digits / 2 * 2].chunks_exact(2) {
                values.push((pair[0] - b'0') * 10 + pair[1] - b'0');
            }
            i += digits / 2 * 2;
            continue;
        }

        let byte = bytes[i];
        let (base, extended) = if byte >= 128 { (byte - 128, true) } else { (byte, false) };
        let wanted = match (base, set) {
            (0..=31, _) => CodeSet::A,
            (96..=127, _) => CodeSet::B,
            (_, Some(CodeSet::A)) => CodeSet::A,
            _ => CodeSet::B,
        };
        switch_set(&mut values, &mut set, wanted);
        if extended {
            // FNC4 shares its value with the switch to the current set
            values.push(if wanted == CodeSet::A { CODE_A } else { CODE_B });
        }
        values.push(if base < 32 { base + 64 } else { base - 32 });
        i += 1;
    }
    values.push(code128_checksum(&values));
    Ok(values)
}

/// Code 128 modules, first bar to last bar
pub fn code128_modules(text: &str) -> Result<Vec<bool>> {
    let values = code128_values(text)?;
    let mut modules = Vec::with_capacity(values.len() * 11 + 13);
    for &v in &values {
        push_widths(&mut modules, &CODE128_PATTERNS[usize::from(v)], true);
    }
    push_widths(&mut modules, &CODE128_STOP, true);
    Ok(modules)
}

fn push_narrow_wide(modules: &mut Vec<bool>, bits: u16, count: usize) {
    let widths: Vec<u8> = (0..count)
        .map(|e| if (bits >> (count - 1 - e)) & 1 == 1 { WIDE_RATIO } else { 1 })
        .collect();
    push_widths(modules, &widths, true);
}

/// Code 39 modules of `*text*`, optionally with the mod-43 check character
pub fn code39_modules(text: &str, check_digit: bool) -> Result<Vec<bool>> {
    if text.is_empty() {
        return Err(Error::encode(Symbology::Code39, "empty payload"));
    }
    let mut values: Vec<u8> = text
        .bytes()
        .map(|b| CODE39_ALPHABET.iter().position(|&c| c == b).map(|v| v as u8))
        .collect::<Option<_>>()
        .ok_or_else(|| Error::encode(Symbology::Code39, "characters outside the Code 39 set"))?;
    if check_digit {
        values.push(code39_checksum(&values));
    }

    let encodings = std::iter::once(CODE39_ASTERISK)
        .chain(values.iter().map(|&v| CODE39_ENCODINGS[usize::from(v)]))
        .chain(std::iter::once(CODE39_ASTERISK));
    let mut modules = Vec::with_capacity((values.len() + 2) * 16);
    for (k, bits) in encodings.enumerate() {
        if k > 0 {
            modules.push(false);
        }
        push_narrow_wide(&mut modules, bits, 9);
    }
    Ok(modules)
}

/// Interleaved 2 of 5 modules for an even number of at least six digits
///
/// With `check_digit` an odd-length payload gets its mod-10 check digit
/// appended, and an even-length payload must already end in a valid one.
pub fn itf_modules(text: &str, check_digit: bool) -> Result<Vec<bool>> {
    let mut digits = parse_digits(text, Symbology::Itf)?;
    if check_digit && digits.len() % 2 == 1 {
        digits.push(gtin_check_digit(&digits));
    } else if check_digit && !digits.is_empty() {
        let (body, check) = digits.split_at(digits.len() - 1);
        if gtin_check_digit(body) != check[0] {
            return Err(Error::encode(Symbology::Itf, "check digit mismatch"));
        }
    }
    if digits.len() % 2 != 0 || digits.len() < 6 {
        return Err(Error::encode(
            Symbology::Itf,
            "needs an even count of at least 6 digits",
        ));
    }
    let mut modules = Vec::with_capacity(digits.len() * 9 + 9);
    push_widths(&mut modules, &ITF_START, true);
    for pair in digits.chunks_exact(2) {
        let bars = ITF_PATTERNS[usize::from(pair[0])];
        let spaces = ITF_PATTERNS[usize::from(pair[1])];
        let mut widths = [0u8; 10];
        for e in 0..5 {
            let wide = |p: u8| if (p >> (4 - e)) & 1 == 1 { WIDE_RATIO } else { 1 };
            widths[2 * e] = wide(bars);
            widths[2 * e + 1] = wide(spaces);
        }
        push_widths(&mut modules, &widths, true);
    }
    push_widths(&mut modules, &ITF_STOP, true);
    Ok(modules)
}

/// Element widths of `modules` from the first to the last dark module, scaled by `unit`
pub fn modules_to_runs(modules: &[bool], unit: f32) -> Vec<f32> {
    let (Some(first), Some(last)) = (
        modules.iter().position(|&m| m),
        modules.iter().rposition(|&m| m),
    ) else {
        return Vec::new();
    };
    let mut runs = Vec::new();
    let mut current = true;
    let mut len = 0usize;
    for &m in &modules[first..=last] {
        if m == current {
            len += 1;
        } else {
            runs.push(len as f32 * unit);
            current = m;
            len = 1;
        }
    }
    runs.push(len as f32 * unit);
    runs
}

/// Module pattern of a linear symbol for `text`
pub fn modules_for(text: &str, symbology: Symbology) -> Result<Vec<bool>> {
    match symbology {
        Symbology::Ean13 => Ok(ean13_modules(&gtin_digits::<13>(text, symbology)?)),
        Symbology::UpcA => {
            let upca = gtin_digits::<12>(text, symbology)?;
            let mut digits = [0u8; 13];
            digits[1..].copy_from_slice(&upca);
            Ok(ean13_modules(&digits))
        }
        Symbology::Ean8 => Ok(ean8_modules(&gtin_digits::<8>(text, symbology)?)),
        Symbology::UpcE => Ok(upce_modules(&upce_digits(text)?)),
        Symbology::Code128 => code128_modules(text),
        Symbology::Code39 => code39_modules(text, true),
        Symbology::Itf => itf_modules(text, true),
        Symbology::QrCode | Symbology::DataMatrix | Symbology::Pdf417 | Symbology::Aztec => {
            Err(Error::encode(symbology, "not a linear symbology"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_widths_in_modules() {
        assert_eq!(ean13_modules(&[5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5, 7]).len(), 95);
        assert_eq!(ean8_modules(&[9, 6, 3, 8, 5, 0, 7, 4]).len(), 67);
        assert_eq!(upce_modules(&[0, 4, 2, 5, 2, 6, 1, 4]).len(), 51);
        // Start, 4 pairs, check, stop
        assert_eq!(code128_modules("12345678").unwrap().len(), 11 * 6 + 13);
    }

    #[test]
    fn test_code128_set_selection() {
        assert_eq!(code128_values("12345678").unwrap()[..5], [CODE128_START_C, 12, 34, 56, 78]);
        let values = code128_values("Hello 2024").unwrap();
        assert_eq!(values[0], CODE128_START_B);
        assert_eq!(values[7..10], [CODE_C, 20, 24]);
        let values = code128_values("a\tb").unwrap();
        assert_eq!(values[..5], [CODE128_START_B, 65, CODE_A, 73, CODE_B]);
        assert!(code128_values("").is_err());
        assert!(code128_values("€").is_err());
    }

    #[test]
    fn test_gtin_payloads() {
        assert_eq!(
            gtin_digits::<13>("590123412345", Symbology::Ean13).unwrap(),
            [5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5, 7]
        );
        assert!(gtin_digits::<13>("5901234123458", Symbology::Ean13).is_err());
        assert!(gtin_digits::<8>("12ab", Symbology::Ean8).is_err());
        assert_eq!(upce_digits("0425261").unwrap()[7], 4);
        assert!(upce_digits("04252615").is_err());
        assert!(upce_digits("2425261").is_err());
    }

    #[test]
    fn test_code39_and_itf_rules() {
        assert!(code39_modules("code", false).is_err());
        assert!(code39_modules("A*B", false).is_err());
        // 3 characters of 15 modules plus 2 gaps
        assert_eq!(code39_modules("A", false).unwrap().len(), 3 * 15 + 2);
        assert_eq!(code39_modules("A", true).unwrap().len(), 4 * 15 + 3);
        assert!(itf_modules("12345", false).is_err());
        assert!(itf_modules("1234", false).is_err());
        // Start of 4 modules, three digit pairs of 18 and a stop of 5
        assert_eq!(itf_modules("123456", false).unwrap().len(), 4 + 3 * 18 + 5);
        // 1234567 gains check digit 0
        assert_eq!(itf_modules("1234567", true).unwrap(), itf_modules("12345670", false).unwrap());
        assert!(itf_modules("12345670", true).is_ok());
        assert!(itf_modules("12345678", true).is_err());
    }

    #[test]
    fn test_modules_to_runs() {
        let modules = [false, true, true, false, true, false, false];
        assert_eq!(modules_to_runs(&modules, 2.0), vec![4.0, 2.0, 2.0]);
        assert!(modules_to_runs(&[false; 4], 1.0).is_empty());
    }
}
