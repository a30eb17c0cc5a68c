//! ECC 200 data encodation schemes
//!
//! The data codewords start in ASCII mode; latch codewords switch to C40,
//! Text, ANSI X12, EDIFACT or Base256 until the scheme's unlatch (or the end
//! of the data) returns to ASCII.

use log::trace;

use crate::decoder::modes::byte::Charset;

/// ASCII mode codewords
pub mod codeword {
    pub const PAD: u8 = 129;
    pub const DIGIT_PAIR_BASE: u8 = 130;
    pub const LATCH_C40: u8 = 230;
    pub const LATCH_BASE256: u8 = 231;
    pub const FNC1: u8 = 232;
    pub const STRUCTURED_APPEND: u8 = 233;
    pub const READER_PROGRAMMING: u8 = 234;
    pub const UPPER_SHIFT: u8 = 235;
    pub const MACRO_05: u8 = 236;
    pub const MACRO_06: u8 = 237;
    pub const LATCH_X12: u8 = 238;
    pub const LATCH_TEXT: u8 = 239;
    pub const LATCH_EDIFACT: u8 = 240;
    pub const ECI: u8 = 241;
    /// Unlatch from C40, Text and X12
    pub const UNLATCH: u8 = 254;
}

const GS: char = '\u{1D}';

const C40_SHIFT2: [char; 27] = [
    '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', ':', ';', '<', '=',
    '>', '?', '@', '[', '\\', ']', '^', '_',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Ascii,
    C40,
    Text,
    X12,
    Edifact,
    Base256,
}

/// Text under construction; bytes are buffered until the charset is known
struct Output {
    text: String,
    pending: Vec<u8>,
    charset: Charset,
    trailer: Option<&'static str>,
}

impl Output {
    fn new() -> Self {
        Self {
            text: String::new(),
            pending: Vec::new(),
            charset: Charset::Auto,
            trailer: None,
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.pending.push(byte);
    }

    fn push_char(&mut self, c: char) {
        // Control and ASCII characters are charset independent
        let mut buf = [0u8; 4];
        self.pending.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn flush(&mut self) -> Option<()> {
        if !self.pending.is_empty() {
            let bytes = std::mem::take(&mut self.pending);
            self.text.push_str(&self.charset.decode(&bytes)?);
        }
        Some(())
    }

    fn set_charset(&mut self, charset: Charset) -> Option<()> {
        self.flush()?;
        self.charset = charset;
        Some(())
    }

    fn finish(mut self) -> Option<String> {
        self.flush()?;
        if let Some(trailer) = self.trailer {
            self.text.push_str(trailer);
        }
        Some(self.text)
    }
}

/// Decode the data codewords of a symbol into text
pub fn decode(data: &[u8]) -> Option<String> {
    let mut out = Output::new();
    let mut pos = 0usize;
    let mut scheme = Scheme::Ascii;

    while pos < data.len() {
        scheme = match scheme {
            Scheme::Ascii => {
                let Some(next) = decode_ascii(data, &mut pos, &mut out)? else {
                    break;
                };
                next
            }
            Scheme::C40 | Scheme::Text => {
                decode_c40_text(data, &mut pos, scheme == Scheme::Text, &mut out)?
            }
            Scheme::X12 => decode_x12(data, &mut pos, &mut out)?,
            Scheme::Edifact => decode_edifact(data, &mut pos, &mut out)?,
            Scheme::Base256 => decode_base256(data, &mut pos, &mut out)?,
        };
    }

    out.finish()
}

/// Decode ASCII codewords until a latch (returns the new scheme) or a pad (returns `None`)
fn decode_ascii(data: &[u8], pos: &mut usize, out: &mut Output) -> Option<Option<Scheme>> {
    let mut upper_shift = false;
    while *pos < data.len() {
        let value = data[*pos];
        let first = *pos == 0;
        *pos += 1;
        match value {
            0 => return None,
            1..=128 => {
                let byte = if upper_shift { value - 1 + 128 } else { value - 1 };
                upper_shift = false;
                out.push_byte(byte);
            }
            codeword::PAD => return Some(None),
            codeword::DIGIT_PAIR_BASE..=229 => {
                let pair = value - codeword::DIGIT_PAIR_BASE;
                out.push_byte(b'0' + pair / 10);
                out.push_byte(b'0' + pair % 10);
            }
            codeword::LATCH_C40 => return Some(Some(Scheme::C40)),
            codeword::LATCH_BASE256 => return Some(Some(Scheme::Base256)),
            codeword::FNC1 => {
                // A leading FNC1 marks GS1 data and is not transmitted
                if !first {
                    out.push_char(GS);
                }
            }
            codeword::STRUCTURED_APPEND => {
                // Sequence indicator and two file identification codewords
                *pos += 3;
            }
            codeword::READER_PROGRAMMING => {}
            codeword::UPPER_SHIFT => upper_shift = true,
            codeword::MACRO_05 | codeword::MACRO_06 => {
                let version = if value == codeword::MACRO_05 { "05" } else { "06" };
                out.push_char('[');
                out.push_char(')');
                out.push_char('>');
                out.push_char('\u{1E}');
                version.chars().for_each(|c| out.push_char(c));
                out.push_char(GS);
                out.trailer = Some("\u{1E}\u{04}");
            }
            codeword::LATCH_X12 => return Some(Some(Scheme::X12)),
            codeword::LATCH_TEXT => return Some(Some(Scheme::Text)),
            codeword::LATCH_EDIFACT => return Some(Some(Scheme::Edifact)),
            codeword::ECI => {
                let eci = read_eci(data, pos)?;
                let charset = Charset::from_eci(eci).or_else(|| {
                    trace!("datamatrix: unsupported ECI {eci}");
                    None
                })?;
                out.set_charset(charset)?;
            }
            _ => {
                trace!("datamatrix: invalid ASCII codeword {value}");
                return None;
            }
        }
    }
    Some(None)
}

fn read_eci(data: &[u8], pos: &mut usize) -> Option<u32> {
    let mut next = || {
        let v = *data.get(*pos)? as u32;
        *pos += 1;
        Some(v)
    };
    let c1 = next()?;
    match c1 {
        1..=127 => Some(c1 - 1),
        128..=191 => Some((c1 - 128) * 254 + next()? - 1 + 127),
        192..=255 => {
            let c2 = next()?;
            let c3 = next()?;
            Some((c1 - 192) * 64516 + 16383 + (c2 - 1) * 254 + c3 - 1)
        }
        _ => None,
    }
}

/// Three 0..40 values packed in two codewords, `None` on an unlatch
fn read_triple(data: &[u8], pos: &mut usize) -> Option<[u8; 3]> {
    if *pos + 1 >= data.len() || data[*pos] == codeword::UNLATCH {
        // A lone trailing codeword is read as ASCII
        if data.get(*pos) == Some(&codeword::UNLATCH) {
            *pos += 1;
        }
        return None;
    }
    let packed = (data[*pos] as u32) * 256 + data[*pos + 1] as u32 - 1;
    *pos += 2;
    Some([
        (packed / 1600) as u8,
        ((packed / 40) % 40) as u8,
        (packed % 40) as u8,
    ])
}

fn decode_c40_text(data: &[u8], pos: &mut usize, text: bool, out: &mut Output) -> Option<Scheme> {
    let mut shift = 0u8;
    let mut upper_shift = false;

    while let Some(values) = read_triple(data, pos) {
        for value in values {
            let c = match shift {
                0 => match value {
                    0..=2 => {
                        shift = value + 1;
                        continue;
                    }
                    3 => b' ',
                    4..=13 => b'0' + value - 4,
                    14..=39 if text => b'a' + value - 14,
                    14..=39 => b'A' + value - 14,
                    _ => return None,
                },
                1 => value,
                2 => match value {
                    0..=26 => C40_SHIFT2[value as usize] as u8,
                    27 => {
                        shift = 0;
                        out.push_char(GS);
                        continue;
                    }
                    30 => {
                        shift = 0;
                        upper_shift = true;
                        continue;
                    }
                    _ => return None,
                },
                _ if text => match value {
                    0 => b'`',
                    1..=26 => b'A' + value - 1,
                    27..=31 => b'{' + value - 27,
                    _ => return None,
                },
                _ => match value {
                    0..=31 => 96 + value,
                    _ => return None,
                },
            };
            shift = 0;
            out.push_byte(if upper_shift { c.wrapping_add(128) } else { c });
            upper_shift = false;
        }
    }
    Some(Scheme::Ascii)
}

fn decode_x12(data: &[u8], pos: &mut usize, out: &mut Output) -> Option<Scheme> {
    while let Some(values) = read_triple(data, pos) {
        for value in values {
            let byte = match value {
                0 => b'\r',
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => b'0' + value - 4,
                14..=39 => b'A' + value - 14,
                _ => return None,
            };
            out.push_byte(byte);
        }
    }
    Some(Scheme::Ascii)
}

fn decode_edifact(data: &[u8], pos: &mut usize, out: &mut Output) -> Option<Scheme> {
    // Four 6-bit values per three codewords
    while *pos < data.len() {
        let available = (data.len() - *pos).min(3);
        let mut bits = 0u32;
        for i in 0..3 {
            bits = (bits << 8) | if i < available { data[*pos + i] as u32 } else { 0 };
        }
        for i in 0..4 {
            let value = ((bits >> (18 - 6 * i)) & 0x3F) as u8;
            if value == 0x1F {
                // Unlatch: resume ASCII at the next whole codeword
                *pos += (6 * (i + 1usize)).div_ceil(8).min(available);
                return Some(Scheme::Ascii);
            }
            if 6 * (i + 1) > 8 * available {
                *pos += available;
                return Some(Scheme::Ascii);
            }
            let c = if value & 0x20 == 0 { value | 0x40 } else { value };
            out.push_byte(c);
        }
        *pos += available;
    }
    Some(Scheme::Ascii)
}

/// Remove the 255-state randomisation of a Base256 codeword at 1-based `position`
pub fn unrandomize_255(value: u8, position: usize) -> u8 {
    let pseudo = ((149 * position) % 255 + 1) as i32;
    let tmp = value as i32 - pseudo;
    (if tmp >= 0 { tmp } else { tmp + 256 }) as u8
}

fn decode_base256(data: &[u8], pos: &mut usize, out: &mut Output) -> Option<Scheme> {
    let next = |pos: &mut usize| -> Option<u8> {
        let value = *data.get(*pos)?;
        *pos += 1;
        Some(unrandomize_255(value, *pos))
    };
    let d1 = next(pos)? as usize;
    let count = match d1 {
        0 => data.len() - *pos,
        1..=249 => d1,
        _ => (d1 - 249) * 250 + next(pos)? as usize,
    };
    if *pos + count > data.len() {
        return None;
    }
    for _ in 0..count {
        let byte = next(pos)?;
        out.push_byte(byte);
    }
    Some(Scheme::Ascii)
}
