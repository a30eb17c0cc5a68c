//! PDF417 compaction modes
//!
//! Data codewords start out in text compaction. Codewords 900 and above
//! switch modes: 900 text, 901/924 byte, 902 numeric, 913 a single byte
//! inside text, 927 an ECI designator.

use crate::decoder::modes::byte::Charset;

pub const TEXT_LATCH: u16 = 900;
pub const BYTE_LATCH: u16 = 901;
pub const NUMERIC_LATCH: u16 = 902;
pub const BYTE_SHIFT: u16 = 913;
/// Byte compaction of a multiple of six bytes
pub const BYTE_LATCH_6: u16 = 924;
pub const ECI_CHARSET: u16 = 927;

/// Digits carried by one numeric chunk of at most 15 codewords
pub const NUMERIC_CHUNK_DIGITS: usize = 44;
const NUMERIC_CHUNK_CODEWORDS: usize = 15;

/// Text sub-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMode {
    Alpha,
    Lower,
    Mixed,
    Punct,
}

/// Characters of Mixed values 0..=24
pub const MIXED: &[u8; 25] = b"0123456789&\r\t,:#-.$/+%*=^";
/// Characters of Punct values 0..=28
pub const PUNCT: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

/// Value of `b` in `mode`, `None` if the sub-mode lacks it
pub fn text_value(mode: SubMode, b: u8) -> Option<u16> {
    let value = match (mode, b) {
        (SubMode::Alpha | SubMode::Lower | SubMode::Mixed, b' ') => 26,
        (SubMode::Alpha, b'A'..=b'Z') => (b - b'A') as u16,
        (SubMode::Lower, b'a'..=b'z') => (b - b'a') as u16,
        (SubMode::Mixed, _) => MIXED.iter().position(|&c| c == b)? as u16,
        (SubMode::Punct, _) => PUNCT.iter().position(|&c| c == b)? as u16,
        _ => return None,
    };
    Some(value)
}

/// Text compaction state carried across the values of a segment
#[derive(Debug)]
struct TextState {
    mode: SubMode,
    shift: Option<SubMode>,
}

impl TextState {
    fn new() -> Self {
        Self {
            mode: SubMode::Alpha,
            shift: None,
        }
    }

    fn push(&mut self, value: u16, out: &mut Vec<u8>) {
        let mode = self.shift.take().unwrap_or(self.mode);
        match (mode, value) {
            (SubMode::Alpha, 0..=25) => out.push(b'A' + value as u8),
            (SubMode::Lower, 0..=25) => out.push(b'a' + value as u8),
            (SubMode::Mixed, 0..=24) => out.push(MIXED[value as usize]),
            (SubMode::Punct, 0..=28) => out.push(PUNCT[value as usize]),
            (SubMode::Alpha | SubMode::Lower | SubMode::Mixed, 26) => out.push(b' '),
            (SubMode::Alpha | SubMode::Lower | SubMode::Mixed, 29) => {
                self.shift = Some(SubMode::Punct)
            }
            (SubMode::Alpha, 27) | (SubMode::Mixed, 27) => self.mode = SubMode::Lower,
            (SubMode::Alpha | SubMode::Lower, 28) => self.mode = SubMode::Mixed,
            (SubMode::Lower, 27) => self.shift = Some(SubMode::Alpha),
            (SubMode::Mixed, 25) => self.mode = SubMode::Punct,
            (SubMode::Mixed, 28) | (SubMode::Punct, 29) => self.mode = SubMode::Alpha,
            _ => {}
        }
    }
}

/// Decoded bytes, converted to text per charset as ECIs change it
#[derive(Debug)]
struct Output {
    charset: Charset,
    bytes: Vec<u8>,
    text: String,
}

impl Output {
    fn flush(&mut self) -> Option<()> {
        self.text.push_str(&self.charset.decode(&self.bytes)?);
        self.bytes.clear();
        Some(())
    }
}

/// Text of the data codewords, the first of which is the length descriptor
///
/// `None` for an inconsistent length, an unsupported mode or an invalid
/// sequence within a mode.
pub fn decode(codewords: &[u16]) -> Option<String> {
    let len = *codewords.first()? as usize;
    if len == 0 || len > codewords.len() {
        return None;
    }
    let data = &codewords[1..len];
    let mut out = Output {
        charset: Charset::Auto,
        bytes: Vec::with_capacity(2 * data.len()),
        text: String::new(),
    };

    let mut i = 0;
    while i < data.len() {
        let code = data[i];
        i = match code {
            TEXT_LATCH => text(data, i + 1, &mut out),
            BYTE_LATCH | BYTE_LATCH_6 => bytes(data, i + 1, code, &mut out)?,
            NUMERIC_LATCH => numeric(data, i + 1, &mut out)?,
            ECI_CHARSET => {
                let eci = *data.get(i + 1)?;
                out.flush()?;
                out.charset = Charset::from_eci(eci as u32)?;
                i + 2
            }
            0..TEXT_LATCH | BYTE_SHIFT => text(data, i, &mut out),
            _ => return None,
        };
    }
    out.flush()?;
    Some(out.text)
}

/// Text compaction from `i` up to the next mode codeword, returns its index
fn text(data: &[u16], mut i: usize, out: &mut Output) -> usize {
    let mut state = TextState::new();
    while let Some(&code) = data.get(i) {
        match code {
            0..TEXT_LATCH => {
                state.push(code / 30, &mut out.bytes);
                state.push(code % 30, &mut out.bytes);
            }
            TEXT_LATCH => state = TextState::new(),
            BYTE_SHIFT => {
                let Some(&byte) = data.get(i + 1) else {
                    return data.len();
                };
                out.bytes.push(byte as u8);
                state.shift = None;
                i += 1;
            }
            _ => break,
        }
        i += 1;
    }
    i
}

/// Byte compaction from `i`; groups of five codewords carry six bytes
fn bytes(data: &[u16], i: usize, latch: u16, out: &mut Output) -> Option<usize> {
    let end = (i..data.len())
        .find(|&j| data[j] >= TEXT_LATCH)
        .unwrap_or(data.len());
    let segment = &data[i..end];
    let groups = if latch == BYTE_LATCH_6 {
        if segment.len() % 5 != 0 {
            return None;
        }
        segment.len() / 5
    } else {
        segment.len().saturating_sub(1) / 5
    };

    for group in segment[..groups * 5].chunks(5) {
        let value = group.iter().fold(0u64, |acc, &c| acc * 900 + c as u64);
        out.bytes.extend((0..6).rev().map(|k| (value >> (8 * k)) as u8));
    }
    for &single in &segment[groups * 5..] {
        out.bytes.push(u8::try_from(single).ok()?);
    }
    Some(end)
}

/// Numeric compaction from `i`; every chunk is a base-900 number prefixed by a 1
fn numeric(data: &[u16], i: usize, out: &mut Output) -> Option<usize> {
    let end = (i..data.len())
        .find(|&j| data[j] >= TEXT_LATCH)
        .unwrap_or(data.len());
    for chunk in data[i..end].chunks(NUMERIC_CHUNK_CODEWORDS) {
        let mut digits = vec![0u8];
        for &c in chunk {
            multiply_add(&mut digits, 900, c as u32);
        }
        let start = digits.iter().position(|&d| d != 0)?;
        if digits[start] != 1 {
            return None;
        }
        out.bytes.extend(digits[start + 1..].iter().map(|&d| b'0' + d));
    }
    Some(end)
}

/// `digits = digits * factor + add` on most-significant-first decimal digits
fn multiply_add(digits: &mut Vec<u8>, factor: u32, add: u32) {
    let mut carry = add;
    for d in digits.iter_mut().rev() {
        let v = *d as u32 * factor + carry;
        *d = (v % 10) as u8;
        carry = v / 10;
    }
    while carry > 0 {
        digits.insert(0, (carry % 10) as u8);
        carry /= 10;
    }
}

/// Base-900 codewords of most-significant-first decimal `digits`
pub fn to_base900(digits: &[u8]) -> Vec<u16> {
    let mut number = digits.to_vec();
    let mut out = Vec::new();
    while number.iter().any(|&d| d != 0) {
        let mut rem = 0u32;
        for d in number.iter_mut() {
            let v = rem * 10 + *d as u32;
            *d = (v / 900) as u8;
            rem = v % 900;
        }
        out.push(rem as u16);
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_length(data: &[u16]) -> Vec<u16> {
        let mut codewords = vec![data.len() as u16 + 1];
        codewords.extend_from_slice(data);
        codewords
    }

    #[test]
    fn test_text_sub_modes() {
        // "Ab1 !": A, LL, b, ML, 1, space, PS, !
        let values = [0u16, 27, 1, 28, 1, 26, 29, 10];
        let data: Vec<u16> = values.chunks(2).map(|p| p[0] * 30 + p[1]).collect();
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("Ab1 !"));
    }

    #[test]
    fn test_byte_shift_keeps_sub_mode() {
        // LL a, shifted 0xE9 byte, then b c still in Lower
        let data = [27 * 30, BYTE_SHIFT, 0xE9, 30 + 2];
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("a\u{e9}bc"));
    }

    #[test]
    fn test_byte_groups_and_singles() {
        let bytes = b"PDF417!";
        let value = bytes[..6].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        let mut data = vec![BYTE_LATCH];
        data.extend((0..5).rev().map(|k| (value / 900u64.pow(k) % 900) as u16));
        data.push(b'!' as u16);
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("PDF417!"));

        // Six bytes under 924 are one group even at the end
        let mut data = vec![BYTE_LATCH_6];
        data.extend((0..5).rev().map(|k| (value / 900u64.pow(k) % 900) as u16));
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("PDF417"));
    }

    #[test]
    fn test_numeric_chunks() {
        let digits: Vec<u8> = "1000213298174000".bytes().map(|b| b - b'0').collect();
        let mut prefixed = vec![1];
        prefixed.extend(&digits);
        let mut data = vec![NUMERIC_LATCH];
        data.extend(to_base900(&prefixed));
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("1000213298174000"));
    }

    #[test]
    fn test_eci_switches_charset() {
        // ECI 3 (Latin-1), then byte 0xE9 alone
        let data = [ECI_CHARSET, 3, BYTE_LATCH, 0xE9];
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("é"));
    }

    #[test]
    fn test_invalid_sequences() {
        assert_eq!(decode(&[]), None);
        assert_eq!(decode(&[0, 1]), None);
        assert_eq!(decode(&[5, 1]), None);
        // Macro PDF417 control block
        assert_eq!(decode(&with_length(&[1, 928, 0])), None);
    }

    #[test]
    fn test_padding_codewords_are_ignored() {
        let data = [30 + 2, TEXT_LATCH, TEXT_LATCH];
        assert_eq!(decode(&with_length(&data)).as_deref(), Some("BC"));
    }
}
