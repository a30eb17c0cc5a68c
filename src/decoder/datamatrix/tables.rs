//! ECC 200 symbol sizes

use crate::correction::BlockLayout;

/// One ECC 200 symbol size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSize {
    /// Module rows including finder and timing borders
    pub rows: usize,
    /// Module columns including finder and timing borders
    pub cols: usize,
    /// Data rows per region
    pub region_rows: usize,
    /// Data columns per region
    pub region_cols: usize,
    /// Interleaved Reed-Solomon blocks
    pub blocks: usize,
    /// Data codewords per block
    pub data_per_block: usize,
    /// Check codewords per block
    pub ecc_per_block: usize,
}

const fn size(
    rows: usize,
    cols: usize,
    region_rows: usize,
    region_cols: usize,
    blocks: usize,
    data_per_block: usize,
    ecc_per_block: usize,
) -> SymbolSize {
    SymbolSize {
        rows,
        cols,
        region_rows,
        region_cols,
        blocks,
        data_per_block,
        ecc_per_block,
    }
}

/// Supported sizes in capacity order, squares then rectangles
///
/// 144x144 is left out: its blocks are not all the same length.
pub const SYMBOL_SIZES: [SymbolSize; 29] = [
    size(10, 10, 8, 8, 1, 3, 5),
    size(12, 12, 10, 10, 1, 5, 7),
    size(14, 14, 12, 12, 1, 8, 10),
    size(16, 16, 14, 14, 1, 12, 12),
    size(18, 18, 16, 16, 1, 18, 14),
    size(20, 20, 18, 18, 1, 22, 18),
    size(22, 22, 20, 20, 1, 30, 20),
    size(24, 24, 22, 22, 1, 36, 24),
    size(26, 26, 24, 24, 1, 44, 28),
    size(32, 32, 14, 14, 1, 62, 36),
    size(36, 36, 16, 16, 1, 86, 42),
    size(40, 40, 18, 18, 1, 114, 48),
    size(44, 44, 20, 20, 1, 144, 56),
    size(48, 48, 22, 22, 1, 174, 68),
    size(52, 52, 24, 24, 2, 102, 42),
    size(64, 64, 14, 14, 2, 140, 56),
    size(72, 72, 16, 16, 4, 92, 36),
    size(80, 80, 18, 18, 4, 114, 48),
    size(88, 88, 20, 20, 4, 144, 56),
    size(96, 96, 22, 22, 4, 174, 68),
    size(104, 104, 24, 24, 6, 136, 56),
    size(120, 120, 18, 18, 6, 175, 68),
    size(132, 132, 20, 20, 8, 163, 62),
    size(8, 18, 6, 16, 1, 5, 7),
    size(8, 32, 6, 14, 1, 10, 11),
    size(12, 26, 10, 24, 1, 16, 14),
    size(12, 36, 10, 16, 1, 22, 18),
    size(16, 36, 14, 16, 1, 32, 24),
    size(16, 48, 14, 22, 1, 49, 28),
];

impl SymbolSize {
    /// Regions stacked vertically
    pub fn regions_vertical(&self) -> usize {
        self.rows / (self.region_rows + 2)
    }

    /// Regions side by side
    pub fn regions_horizontal(&self) -> usize {
        self.cols / (self.region_cols + 2)
    }

    /// Rows of the mapping matrix (borders removed)
    pub fn mapping_rows(&self) -> usize {
        self.regions_vertical() * self.region_rows
    }

    /// Columns of the mapping matrix (borders removed)
    pub fn mapping_cols(&self) -> usize {
        self.regions_horizontal() * self.region_cols
    }

    pub fn data_codewords(&self) -> usize {
        self.blocks * self.data_per_block
    }

    pub fn total_codewords(&self) -> usize {
        self.blocks * (self.data_per_block + self.ecc_per_block)
    }

    pub fn layout(&self) -> BlockLayout {
        BlockLayout::uniform(self.blocks, self.data_per_block, self.ecc_per_block).round_robin()
    }

    /// Expected colour of a finder or timing module, `None` for data modules
    pub fn border_module(&self, row: usize, col: usize) -> Option<bool> {
        let region_h = self.region_rows + 2;
        let region_w = self.region_cols + 2;
        let (r, c) = (row % region_h, col % region_w);
        if c == 0 || r == region_h - 1 {
            Some(true)
        } else if r == 0 {
            Some(c % 2 == 0)
        } else if c == region_w - 1 {
            Some(r % 2 == 1)
        } else {
            None
        }
    }

    /// Physical module of a mapping matrix position
    pub fn physical(&self, mapping_row: usize, mapping_col: usize) -> (usize, usize) {
        let row = (mapping_row / self.region_rows) * (self.region_rows + 2)
            + 1
            + mapping_row % self.region_rows;
        let col = (mapping_col / self.region_cols) * (self.region_cols + 2)
            + 1
            + mapping_col % self.region_cols;
        (row, col)
    }
}

/// Index into [`SYMBOL_SIZES`] of the size with these dimensions
pub fn size_index(rows: usize, cols: usize) -> Option<usize> {
    SYMBOL_SIZES.iter().position(|s| s.rows == rows && s.cols == cols)
}

/// Smallest square size holding `data` codewords
pub fn smallest_square_for(data: usize) -> Option<&'static SymbolSize> {
    SYMBOL_SIZES
        .iter()
        .filter(|s| s.rows == s.cols)
        .find(|s| s.data_codewords() >= data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codeword_counts_fill_mapping_matrix() {
        for s in SYMBOL_SIZES {
            let bits = s.mapping_rows() * s.mapping_cols();
            // Whole codewords, plus the 4-module fixed corner in some sizes
            assert!(
                bits == s.total_codewords() * 8 || bits == s.total_codewords() * 8 + 4,
                "{}x{}",
                s.rows,
                s.cols
            );
        }
    }

    #[test]
    fn test_region_counts() {
        let s = SYMBOL_SIZES[size_index(32, 32).unwrap()];
        assert_eq!((s.regions_vertical(), s.regions_horizontal()), (2, 2));
        assert_eq!(s.physical(14, 14), (17, 17));
        let r = SYMBOL_SIZES[size_index(8, 32).unwrap()];
        assert_eq!((r.regions_vertical(), r.regions_horizontal()), (1, 2));
    }

    #[test]
    fn test_border_pattern_of_10x10() {
        let s = SYMBOL_SIZES[0];
        assert_eq!(s.border_module(0, 0), Some(true));
        assert_eq!(s.border_module(0, 9), Some(false));
        assert_eq!(s.border_module(1, 9), Some(true));
        assert_eq!(s.border_module(9, 5), Some(true));
        assert_eq!(s.border_module(4, 4), None);
    }

    #[test]
    fn test_smallest_square() {
        assert_eq!(smallest_square_for(3).map(|s| s.rows), Some(10));
        assert_eq!(smallest_square_for(4).map(|s| s.rows), Some(12));
        assert_eq!(smallest_square_for(2000), None);
    }
}
