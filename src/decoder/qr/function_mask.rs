use super::tables::{alignment_pattern_positions, dimension};
use crate::models::BitMatrix;

/// Function module mask for a specific QR version.
/// true = function module (not data), false = data module.
pub struct FunctionMask {
    mask: BitMatrix,
    version: u8,
}

impl FunctionMask {
    pub fn new(version: u8) -> Self {
        let size = dimension(version);
        let mut mask = BitMatrix::new(size, size);

        // Finder patterns + separators
        Self::mark_finder_area(&mut mask, 0, 0);
        Self::mark_finder_area(&mut mask, size - 7, 0);
        Self::mark_finder_area(&mut mask, 0, size - 7);

        // Timing patterns
        for i in 0..size {
            mask.set(6, i, true);
            mask.set(i, 6, true);
        }

        for (cx, cy) in alignment_centers(version) {
            for y in cy - 2..=cy + 2 {
                for x in cx - 2..=cx + 2 {
                    mask.set(x, y, true);
                }
            }
        }

        // Format info areas, dark module included
        for i in 0..9 {
            mask.set(8, i, true);
            mask.set(i, 8, true);
        }
        for i in 0..8 {
            mask.set(size - 1 - i, 8, true);
            mask.set(8, size - 1 - i, true);
        }

        if version >= 7 {
            for dy in 0..6 {
                for dx in 0..3 {
                    mask.set(size - 11 + dx, dy, true);
                    mask.set(dy, size - 11 + dx, true);
                }
            }
        }

        Self { mask, version }
    }

    pub fn size(&self) -> usize {
        self.mask.width()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_function(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y)
    }

    /// Data module coordinates in codeword bit order
    ///
    /// Column pairs right to left (skipping the vertical timing column),
    /// alternating upward and downward, right column of each pair first.
    pub fn data_positions(&self) -> Vec<(usize, usize)> {
        let size = self.size();
        let mut positions = Vec::with_capacity(size * size);
        let mut upward = true;
        let mut right = size as isize - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for i in 0..size {
                let y = if upward { size - 1 - i } else { i };
                for x in [right as usize, right as usize - 1] {
                    if !self.is_function(x, y) {
                        positions.push((x, y));
                    }
                }
            }
            upward = !upward;
            right -= 2;
        }
        positions
    }

    fn mark_finder_area(mask: &mut BitMatrix, x: usize, y: usize) {
        let size = mask.width();
        for yy in y.saturating_sub(1)..(y + 8).min(size) {
            for xx in x.saturating_sub(1)..(x + 8).min(size) {
                mask.set(xx, yy, true);
            }
        }
    }
}

/// Alignment pattern centres, excluding the three that collide with finders
pub fn alignment_centers(version: u8) -> Vec<(usize, usize)> {
    let positions = alignment_pattern_positions(version);
    let last = positions.len().saturating_sub(1);
    let mut centers = Vec::new();
    for (i, &cy) in positions.iter().enumerate() {
        for (j, &cx) in positions.iter().enumerate() {
            let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
            if !corner {
                centers.push((cx, cy));
            }
        }
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::qr::tables::raw_data_modules;

    #[test]
    fn test_data_module_counts_match_capacity() {
        for version in [1u8, 2, 6, 7, 14, 21, 32, 40] {
            let mask = FunctionMask::new(version);
            assert_eq!(
                mask.data_positions().len(),
                raw_data_modules(version),
                "version {version}"
            );
        }
    }

    #[test]
    fn test_zigzag_starts_bottom_right() {
        let positions = FunctionMask::new(1).data_positions();
        assert_eq!(&positions[..4], &[(20, 20), (19, 20), (20, 19), (19, 19)]);
    }

    #[test]
    fn test_alignment_centers() {
        assert!(alignment_centers(1).is_empty());
        assert_eq!(alignment_centers(2), vec![(18, 18)]);
        assert_eq!(alignment_centers(7).len(), 6);
    }
}
