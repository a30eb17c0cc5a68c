/// Alphanumeric mode decoder (mode 0010)
use super::BitReader;

/// Alphanumeric character set: 0-9, A-Z, space, $%*+-./:
pub const ALPHANUMERIC_TABLE: [char; 45] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ', '$',
    '%', '*', '+', '-', '.', '/', ':',
];

/// Index of `c` in the alphanumeric set
pub fn alphanumeric_value(c: char) -> Option<u32> {
    ALPHANUMERIC_TABLE.iter().position(|&t| t == c).map(|i| i as u32)
}

/// Pairs = 11 bits, single = 6 bits
pub struct AlphanumericDecoder;

impl AlphanumericDecoder {
    /// Decode `count` characters; with `fnc1` set, `%` is GS and `%%` is `%`
    pub fn decode(
        reader: &mut BitReader<'_>,
        count: usize,
        fnc1: bool,
        out: &mut String,
    ) -> Option<()> {
        let mut decoded = String::with_capacity(count);
        let mut remaining = count;
        while remaining > 0 {
            if remaining >= 2 {
                let value = reader.read_bits(11)?;
                let (first, second) = ((value / 45) as usize, (value % 45) as usize);
                decoded.push(*ALPHANUMERIC_TABLE.get(first)?);
                decoded.push(ALPHANUMERIC_TABLE[second]);
                remaining -= 2;
            } else {
                let value = reader.read_bits(6)? as usize;
                decoded.push(*ALPHANUMERIC_TABLE.get(value)?);
                remaining -= 1;
            }
        }

        if fnc1 {
            let mut chars = decoded.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '%' {
                    if chars.peek() == Some(&'%') {
                        chars.next();
                        out.push('%');
                    } else {
                        out.push('\u{1D}');
                    }
                } else {
                    out.push(c);
                }
            }
        } else {
            out.push_str(&decoded);
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphanumeric_decode() {
        // "A1" = 10 * 45 + 1 = 451 = 00111000011
        let bytes = [0b0011_1000, 0b0110_0000];
        let mut reader = BitReader::new(&bytes);
        let mut out = String::new();
        AlphanumericDecoder::decode(&mut reader, 2, false, &mut out).unwrap();
        assert_eq!(out, "A1");
    }

    #[test]
    fn test_fnc1_percent_handling() {
        // "%" alone (value 38 = 100110) becomes GS
        let bytes = [0b1001_1000];
        let mut reader = BitReader::new(&bytes);
        let mut out = String::new();
        AlphanumericDecoder::decode(&mut reader, 1, true, &mut out).unwrap();
        assert_eq!(out, "\u{1D}");
        assert_eq!(alphanumeric_value(':'), Some(44));
        assert_eq!(alphanumeric_value('a'), None);
    }
}
