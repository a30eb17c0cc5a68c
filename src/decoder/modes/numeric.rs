/// Numeric mode decoder (mode 0001)
use super::BitReader;

/// Groups of 3 digits = 10 bits, 2 digits = 7 bits, 1 digit = 4 bits
pub struct NumericDecoder;

impl NumericDecoder {
    /// Decode `count` digits, rejecting groups that overflow their width
    pub fn decode(reader: &mut BitReader<'_>, count: usize, out: &mut String) -> Option<()> {
        let mut remaining = count;
        while remaining > 0 {
            let group = remaining.min(3);
            let (bits, limit) = match group {
                3 => (10, 1000),
                2 => (7, 100),
                _ => (4, 10),
            };
            let value = reader.read_bits(bits)?;
            if value >= limit {
                return None;
            }
            match group {
                3 => out.push_str(&format!("{value:03}")),
                2 => out.push_str(&format!("{value:02}")),
                _ => out.push_str(&format!("{value}")),
            }
            remaining -= group;
        }
        Some(())
    }
}
