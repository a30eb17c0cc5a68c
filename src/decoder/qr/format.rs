//! Format and version information (BCH-protected metadata)

use crate::models::{BitMatrix, ECLevel, MaskPattern};

const FORMAT_GENERATOR: u32 = 0x537;
const FORMAT_XOR_MASK: u32 = 0x5412;
const VERSION_GENERATOR: u32 = 0x1F25;

/// Largest Hamming distance accepted when matching a read codeword
const MAX_BIT_ERRORS: u32 = 3;

/// Error correction level and mask pattern of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub ec_level: ECLevel,
    pub mask_pattern: MaskPattern,
}

impl FormatInfo {
    /// 15-bit masked codeword: 5 data bits, 10 BCH bits, XOR 0x5412
    pub fn codeword(&self) -> u16 {
        let data = ((self.ec_level.format_bits() as u32) << 3) | self.mask_pattern.bits() as u32;
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
        }
        (((data << 10) | rem) ^ FORMAT_XOR_MASK) as u16
    }

    /// Read both copies from a sampled grid and pick the closest valid codeword
    pub fn read(grid: &BitMatrix) -> Option<Self> {
        let size = grid.width();
        let read = |positions: &[(usize, usize); 15]| {
            positions
                .iter()
                .enumerate()
                .fold(0u16, |acc, (i, &(x, y))| acc | ((grid.get(x, y) as u16) << i))
        };
        let primary = read(&primary_positions());
        let secondary = read(&secondary_positions(size));

        let mut best: Option<(u32, FormatInfo)> = None;
        for ec_level in ECLevel::ALL {
            for mask_pattern in MaskPattern::ALL {
                let info = FormatInfo {
                    ec_level,
                    mask_pattern,
                };
                let code = info.codeword();
                let distance = (code ^ primary)
                    .count_ones()
                    .min((code ^ secondary).count_ones());
                if best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, info));
                }
            }
        }
        best.filter(|&(d, _)| d <= MAX_BIT_ERRORS).map(|(_, info)| info)
    }

    /// Write both copies and the dark module into `grid`
    pub fn draw(&self, grid: &mut BitMatrix) {
        let size = grid.width();
        let code = self.codeword();
        let primary = primary_positions();
        let secondary = secondary_positions(size);
        for i in 0..15 {
            let bit = (code >> i) & 1 == 1;
            grid.set(primary[i].0, primary[i].1, bit);
            grid.set(secondary[i].0, secondary[i].1, bit);
        }
        grid.set(8, size - 8, true);
    }
}

/// Bit i of the copy around the top-left finder
fn primary_positions() -> [(usize, usize); 15] {
    let mut positions = [(0, 0); 15];
    for (i, pos) in positions.iter_mut().enumerate() {
        *pos = match i {
            0..=5 => (8, i),
            6 => (8, 7),
            7 => (8, 8),
            8 => (7, 8),
            _ => (14 - i, 8),
        };
    }
    positions
}

/// Bit i of the copy split between the top-right and bottom-left finders
fn secondary_positions(size: usize) -> [(usize, usize); 15] {
    let mut positions = [(0, 0); 15];
    for (i, pos) in positions.iter_mut().enumerate() {
        *pos = if i < 8 {
            (size - 1 - i, 8)
        } else {
            (8, size - 15 + i)
        };
    }
    positions
}

/// 18-bit version information codeword (versions 7..=40)
pub fn version_codeword(version: u8) -> u32 {
    let data = version as u32;
    let mut rem = data;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
    }
    (data << 12) | rem
}

/// Read the version blocks of a grid of `size` modules, tolerating bit errors
pub fn read_version(grid: &BitMatrix) -> Option<u8> {
    let size = grid.width();
    if size < 45 {
        return None;
    }
    let mut top_right = 0u32;
    let mut bottom_left = 0u32;
    for i in 0..18 {
        let (a, b) = (size - 11 + i % 3, i / 3);
        top_right |= (grid.get(a, b) as u32) << i;
        bottom_left |= (grid.get(b, a) as u32) << i;
    }

    (7..=40u8)
        .map(|v| {
            let code = version_codeword(v);
            let d = (code ^ top_right).count_ones().min((code ^ bottom_left).count_ones());
            (d, v)
        })
        .min()
        .filter(|&(d, _)| d <= MAX_BIT_ERRORS)
        .map(|(_, v)| v)
}

/// Write both version blocks (versions 7+)
pub fn draw_version(grid: &mut BitMatrix, version: u8) {
    if version < 7 {
        return;
    }
    let size = grid.width();
    let code = version_codeword(version);
    for i in 0..18 {
        let bit = (code >> i) & 1 == 1;
        let (a, b) = (size - 11 + i % 3, i / 3);
        grid.set(a, b, bit);
        grid.set(b, a, bit);
    }
}
