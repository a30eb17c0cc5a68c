//! Aztec character modes
//!
//! Text is a stream of 5-bit codes (4-bit in Digit mode) whose meaning
//! depends on the current mode. Latches change the mode until the next
//! latch, shifts for one code only. A binary shift inserts a run of raw
//! bytes.

use crate::decoder::modes::byte::Charset;

/// Group separator emitted for FLG(0)
const GS: u8 = 0x1D;

/// Character mode of the high-level encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Upper,
    Lower,
    Mixed,
    Punct,
    Digit,
}

impl Mode {
    /// Width of one code in this mode
    pub fn bits(self) -> usize {
        match self {
            Mode::Digit => 4,
            _ => 5,
        }
    }
}

/// Meaning of one code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Byte(u8),
    Text(&'static [u8]),
    Shift(Mode),
    Latch(Mode),
    BinaryShift,
    Flag,
}

fn entry(mode: Mode, code: u32) -> Option<Entry> {
    let byte = |offset: u8, base: u32| Entry::Byte(offset + (code - base) as u8);
    let entry = match (mode, code) {
        (Mode::Punct, 0) => Entry::Flag,
        (_, 0) => Entry::Shift(Mode::Punct),
        (Mode::Punct, 1) => Entry::Byte(b'\r'),
        (_, 1) => Entry::Byte(b' '),

        (Mode::Upper, 2..=27) => byte(b'A', 2),
        (Mode::Upper, 28) => Entry::Latch(Mode::Lower),
        (Mode::Lower, 2..=27) => byte(b'a', 2),
        (Mode::Lower, 28) => Entry::Shift(Mode::Upper),
        (Mode::Upper | Mode::Lower, 29) => Entry::Latch(Mode::Mixed),
        (Mode::Upper | Mode::Lower, 30) => Entry::Latch(Mode::Digit),

        (Mode::Mixed, 2..=14) => byte(1, 2),
        (Mode::Mixed, 15..=19) => byte(27, 15),
        (Mode::Mixed, 20..=27) => Entry::Byte(MIXED_SYMBOLS[(code - 20) as usize]),
        (Mode::Mixed, 28) => Entry::Latch(Mode::Lower),
        (Mode::Mixed, 29) => Entry::Latch(Mode::Upper),
        (Mode::Mixed, 30) => Entry::Latch(Mode::Punct),
        (Mode::Upper | Mode::Lower | Mode::Mixed, 31) => Entry::BinaryShift,

        (Mode::Punct, 2) => Entry::Text(b"\r\n"),
        (Mode::Punct, 3) => Entry::Text(b". "),
        (Mode::Punct, 4) => Entry::Text(b", "),
        (Mode::Punct, 5) => Entry::Text(b": "),
        (Mode::Punct, 6..=20) => byte(b'!', 6),
        (Mode::Punct, 21..=26) => byte(b':', 21),
        (Mode::Punct, 27..=30) => Entry::Byte(PUNCT_BRACKETS[(code - 27) as usize]),
        (Mode::Punct, 31) => Entry::Latch(Mode::Upper),

        (Mode::Digit, 2..=11) => byte(b'0', 2),
        (Mode::Digit, 12) => Entry::Byte(b','),
        (Mode::Digit, 13) => Entry::Byte(b'.'),
        (Mode::Digit, 14) => Entry::Latch(Mode::Upper),
        (Mode::Digit, 15) => Entry::Shift(Mode::Upper),
        _ => return None,
    };
    Some(entry)
}

const MIXED_SYMBOLS: [u8; 8] = [b'@', b'\\', b'^', b'_', b'`', b'|', b'~', 0x7F];

const PUNCT_BRACKETS: [u8; 4] = [b'[', b']', b'{', b'}'];

/// Code of a single byte in `mode`, if the mode has one
pub fn char_code(mode: Mode, b: u8) -> Option<u32> {
    let code = match (mode, b) {
        (Mode::Upper | Mode::Lower | Mode::Mixed | Mode::Digit, b' ') => 1,
        (Mode::Upper, b'A'..=b'Z') => (b - b'A') as u32 + 2,
        (Mode::Lower, b'a'..=b'z') => (b - b'a') as u32 + 2,
        (Mode::Mixed, 1..=13) => b as u32 + 1,
        (Mode::Mixed, 27..=31) => (b - 27) as u32 + 15,
        (Mode::Mixed, _) => MIXED_SYMBOLS.iter().position(|&s| s == b)? as u32 + 20,
        (Mode::Punct, b'\r') => 1,
        (Mode::Punct, b'!'..=b'/') => (b - b'!') as u32 + 6,
        (Mode::Punct, b':'..=b'?') => (b - b':') as u32 + 21,
        (Mode::Punct, _) => PUNCT_BRACKETS.iter().position(|&s| s == b)? as u32 + 27,
        (Mode::Digit, b'0'..=b'9') => (b - b'0') as u32 + 2,
        (Mode::Digit, b',') => 12,
        (Mode::Digit, b'.') => 13,
        _ => return None,
    };
    Some(code)
}

/// MSB-first reader over unstuffed bits
struct BitCursor<'a> {
    bits: &'a [bool],
    pos: usize,
}

impl BitCursor<'_> {
    fn read(&mut self, n: usize) -> Option<u32> {
        let chunk = self.bits.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(chunk.iter().fold(0, |acc, &bit| (acc << 1) | bit as u32))
    }
}

/// Text of the unstuffed data bits, `None` on an invalid code sequence
///
/// Trailing bits too short for a whole code are padding and ignored.
pub fn decode(bits: &[bool]) -> Option<String> {
    let mut cursor = BitCursor { bits, pos: 0 };
    let mut latch = Mode::Upper;
    let mut shift: Option<Mode> = None;
    let mut charset = Charset::Auto;
    let mut bytes = Vec::new();
    let mut out = String::new();

    loop {
        let mode = shift.take().unwrap_or(latch);
        let Some(code) = cursor.read(mode.bits()) else {
            break;
        };
        match entry(mode, code)? {
            Entry::Byte(b) => bytes.push(b),
            Entry::Text(text) => bytes.extend_from_slice(text),
            Entry::Shift(next) => {
                latch = mode;
                shift = Some(next);
            }
            Entry::Latch(next) => latch = next,
            Entry::BinaryShift => {
                latch = mode;
                let Some(mut len) = cursor.read(5) else {
                    break;
                };
                if len == 0 {
                    let Some(extra) = cursor.read(11) else {
                        break;
                    };
                    len = extra + 31;
                }
                for _ in 0..len {
                    let Some(b) = cursor.read(8) else {
                        break;
                    };
                    bytes.push(b as u8);
                }
            }
            Entry::Flag => {
                let Some(n) = cursor.read(3) else {
                    break;
                };
                match n {
                    0 => bytes.push(GS),
                    7 => return None,
                    _ => {
                        let mut eci = 0u32;
                        for _ in 0..n {
                            let digit = cursor.read(4)?;
                            if !(2..=11).contains(&digit) {
                                return None;
                            }
                            eci = eci * 10 + digit - 2;
                        }
                        out.push_str(&charset.decode(&bytes)?);
                        bytes.clear();
                        charset = Charset::from_eci(eci)?;
                    }
                }
            }
        }
    }
    out.push_str(&charset.decode(&bytes)?);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(codes: &[(u32, usize)]) -> Vec<bool> {
        codes
            .iter()
            .flat_map(|&(value, n)| (0..n).rev().map(move |i| (value >> i) & 1 == 1))
            .collect()
    }

    #[test]
    fn test_upper_lower_and_digits() {
        // "Ab 12" : A, L/L, b, space, D/L, 1, 2
        let stream = bits(&[(2, 5), (28, 5), (3, 5), (1, 5), (30, 5), (3, 4), (4, 4)]);
        assert_eq!(decode(&stream).as_deref(), Some("Ab 12"));
    }

    #[test]
    fn test_shifts_return_to_latched_mode() {
        // a, U/S, B, c, P/S, "!", d
        let stream = bits(&[
            (28, 5),
            (2, 5),
            (28, 5),
            (3, 5),
            (4, 5),
            (0, 5),
            (6, 5),
            (5, 5),
        ]);
        assert_eq!(decode(&stream).as_deref(), Some("aBc!d"));
    }

    #[test]
    fn test_binary_shift_and_padding() {
        // B/S of two UTF-8 bytes for 'é', then Z, then padding ones
        let stream = bits(&[(31, 5), (2, 5), (0xC3, 8), (0xA9, 8), (27, 5), (0b111, 3)]);
        assert_eq!(decode(&stream).as_deref(), Some("éZ"));
    }

    #[test]
    fn test_mixed_and_punct_codes() {
        assert_eq!(char_code(Mode::Mixed, b'\n'), Some(11));
        assert_eq!(char_code(Mode::Mixed, b'@'), Some(20));
        assert_eq!(char_code(Mode::Punct, b'/'), Some(20));
        assert_eq!(char_code(Mode::Punct, b'}'), Some(30));
        assert_eq!(char_code(Mode::Digit, b'.'), Some(13));
        assert_eq!(char_code(Mode::Upper, b'a'), None);
        for mode in [Mode::Upper, Mode::Lower, Mode::Mixed, Mode::Punct, Mode::Digit] {
            for b in 0..=127u8 {
                if let Some(code) = char_code(mode, b) {
                    assert_eq!(entry(mode, code), Some(Entry::Byte(b)), "{mode:?} {b}");
                }
            }
        }
    }

    #[test]
    fn test_flag_zero_is_group_separator() {
        // P/S, FLG(0), A
        let stream = bits(&[(0, 5), (0, 5), (0, 3), (2, 5)]);
        assert_eq!(decode(&stream).as_deref(), Some("\u{1d}A"));
        let invalid = bits(&[(0, 5), (0, 5), (7, 3)]);
        assert_eq!(decode(&invalid), None);
    }
}
