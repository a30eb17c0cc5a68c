/// Byte mode decoder (mode 0100) for 8-bit data
use super::BitReader;

/// Character set selected by an ECI designator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// No ECI seen: UTF-8 when valid, ISO-8859-1 otherwise
    Auto,
    /// ECI 26
    Utf8,
    /// ECI 1 and 3
    Latin1,
}

impl Charset {
    /// Charset for an ECI assignment number, `None` for unsupported ones
    pub fn from_eci(eci: u32) -> Option<Self> {
        match eci {
            1 | 3 => Some(Charset::Latin1),
            26 => Some(Charset::Utf8),
            // ECI 0/2 (CP437) and 27 (US-ASCII) agree with Latin-1 on 7-bit data
            0 | 2 | 27 => Some(Charset::Auto),
            _ => None,
        }
    }

    /// Convert bytes to text in this charset
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Charset::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Charset::Auto => Some(
                String::from_utf8(bytes.to_vec())
                    .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
            ),
        }
    }
}

/// Decode byte mode data (8 bits per character)
pub struct ByteDecoder;

impl ByteDecoder {
    pub fn decode(
        reader: &mut BitReader<'_>,
        count: usize,
        charset: Charset,
        out: &mut String,
    ) -> Option<()> {
        let mut bytes = Vec::with_capacity(count);
        for _ in 0..count {
            bytes.push(reader.read_bits(8)? as u8);
        }
        out.push_str(&charset.decode(&bytes)?);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_decode() {
        let mut reader = BitReader::new(b"HI");
        let mut out = String::new();
        ByteDecoder::decode(&mut reader, 2, Charset::Auto, &mut out).unwrap();
        assert_eq!(out, "HI");
    }

    #[test]
    fn test_latin1_fallback() {
        let mut reader = BitReader::new(&[0x63, 0x61, 0x66, 0xE9]);
        let mut out = String::new();
        ByteDecoder::decode(&mut reader, 4, Charset::Auto, &mut out).unwrap();
        assert_eq!(out, "café");

        let mut reader = BitReader::new(&[0xE9]);
        assert!(ByteDecoder::decode(&mut reader, 1, Charset::Utf8, &mut String::new()).is_none());
    }
}
