use crate::correction::{BlockLayout, BlockSpec};
use crate::models::ECLevel;

// Model 2 tables. Index: [ec_level][version]
const ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_ERROR_CORRECTION_BLOCKS: [[u8; 41]; 4] = [
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Modules per side for `version`
pub fn dimension(version: u8) -> usize {
    17 + 4 * version as usize
}

/// Version for a module count, if it is a valid QR size
pub fn version_for_dimension(dimension: usize) -> Option<u8> {
    if !(21..=177).contains(&dimension) || (dimension - 17) % 4 != 0 {
        return None;
    }
    Some(((dimension - 17) / 4) as u8)
}

/// Modules available for data and check codewords, remainder bits included
pub fn raw_data_modules(version: u8) -> usize {
    let v = version as usize;
    let mut result = (16 * v + 128) * v + 64;
    if v >= 2 {
        let num_align = v / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if v >= 7 {
            result -= 36;
        }
    }
    result
}

/// Total codewords of a symbol
pub fn total_codewords(version: u8) -> usize {
    raw_data_modules(version) / 8
}

/// Reed-Solomon block layout, short blocks first
pub fn block_layout(version: u8, ec_level: ECLevel) -> Option<BlockLayout> {
    if !(1..=40).contains(&version) {
        return None;
    }
    let ecc = ECC_CODEWORDS_PER_BLOCK[ec_level.ordinal()][version as usize] as usize;
    let num_blocks = NUM_ERROR_CORRECTION_BLOCKS[ec_level.ordinal()][version as usize] as usize;
    let total = total_codewords(version);
    let data_total = total.checked_sub(ecc * num_blocks)?;
    let num_long = data_total % num_blocks;
    let short_len = data_total / num_blocks;

    let blocks = (0..num_blocks)
        .map(|b| BlockSpec {
            data: if b < num_blocks - num_long { short_len } else { short_len + 1 },
            ecc,
        })
        .collect();
    Some(BlockLayout::new(blocks))
}

/// Data codewords available at `version` / `ec_level`
pub fn data_codewords(version: u8, ec_level: ECLevel) -> usize {
    block_layout(version, ec_level).map_or(0, |layout| layout.data_codewords())
}

/// Alignment pattern centre coordinates (shared by rows and columns)
pub fn alignment_pattern_positions(version: u8) -> Vec<usize> {
    if version <= 1 {
        return Vec::new();
    }
    let num_align = version as usize / 7 + 2;
    let size = dimension(version);
    let step = if version == 32 {
        26
    } else {
        (version as usize * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
    };

    let mut positions = vec![0usize; num_align];
    positions[0] = 6;
    for i in 1..num_align {
        positions[i] = size - 7 - (num_align - 1 - i) * step;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacities() {
        assert_eq!(total_codewords(1), 26);
        assert_eq!(total_codewords(7), 196);
        assert_eq!(total_codewords(40), 3706);
        assert_eq!(data_codewords(1, ECLevel::M), 16);
        assert_eq!(data_codewords(5, ECLevel::Q), 62);
        assert_eq!(data_codewords(40, ECLevel::L), 2956);
    }

    #[test]
    fn test_block_layout_short_blocks_first() {
        // 5-Q: 2 blocks of 15 and 2 blocks of 16 data codewords, 18 ECC each
        let layout = block_layout(5, ECLevel::Q).unwrap();
        let data: Vec<usize> = layout.blocks().iter().map(|b| b.data).collect();
        assert_eq!(data, vec![15, 15, 16, 16]);
        assert!(layout.blocks().iter().all(|b| b.ecc == 18));
        assert_eq!(layout.total_codewords(), total_codewords(5));
    }

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_pattern_positions(1).is_empty());
        assert_eq!(alignment_pattern_positions(2), vec![6, 18]);
        assert_eq!(alignment_pattern_positions(7), vec![6, 22, 38]);
        assert_eq!(alignment_pattern_positions(32), vec![6, 34, 60, 86, 112, 138]);
        assert_eq!(alignment_pattern_positions(40), vec![6, 30, 58, 86, 114, 142, 170]);
    }

    #[test]
    fn test_dimension_round_trip() {
        assert_eq!(version_for_dimension(21), Some(1));
        assert_eq!(version_for_dimension(177), Some(40));
        assert_eq!(version_for_dimension(22), None);
    }
}
