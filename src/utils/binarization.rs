//! Luminance to bit matrix conversion
//!
//! The primary path is a block-local threshold: the image is cut into square
//! blocks, each block gets a black point from its own mean (or from its
//! neighbours when the block is flat), and every pixel is compared against the
//! average black point of the surrounding 5x5 blocks. Otsu's global threshold
//! is kept as a second pass for evenly lit scans.

use crate::models::BitMatrix;
use crate::source::RasterImage;

/// Below this luminance spread a block (or the whole image) has no edges
pub const MIN_DYNAMIC_RANGE: u8 = 24;

/// Default amount subtracted from a contrasted block's mean
pub const DEFAULT_BIAS: u8 = 2;

const MIN_BLOCK: usize = 8;
const MAX_BLOCK: usize = 64;

/// Tunables for the adaptive binarizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarizerOptions {
    /// Threshold window override; `None` derives it from the image size
    pub block_size: Option<usize>,
    /// Subtracted from the local mean of contrasted blocks
    pub bias: u8,
}

impl Default for BinarizerOptions {
    fn default() -> Self {
        Self {
            block_size: None,
            bias: DEFAULT_BIAS,
        }
    }
}

/// Window size for an image: 1/8 of the shorter side, clamped to [8, 64]
pub fn window_size(width: usize, height: usize) -> usize {
    (width.min(height) / 8).clamp(MIN_BLOCK, MAX_BLOCK)
}

/// Binarize a raster with the adaptive block threshold
pub fn binarize(image: &RasterImage, options: &BinarizerOptions) -> BitMatrix {
    adaptive_binarize(image.pixels(), image.width(), image.height(), options)
}

/// Block-local threshold binarization, true = dark
pub fn adaptive_binarize(
    gray: &[u8],
    width: usize,
    height: usize,
    options: &BinarizerOptions,
) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);
    if width == 0 || height == 0 || !has_contrast(gray) {
        return binary;
    }

    let block = options
        .block_size
        .unwrap_or_else(|| window_size(width, height))
        .max(2);
    let blocks_x = width.div_ceil(block);
    let blocks_y = height.div_ceil(block);
    let black_points =
        block_black_points(gray, width, height, block, blocks_x, blocks_y, options.bias);

    for by in 0..blocks_y {
        let y0 = by.saturating_sub(2);
        let y1 = (by + 2).min(blocks_y - 1);
        for bx in 0..blocks_x {
            let x0 = bx.saturating_sub(2);
            let x1 = (bx + 2).min(blocks_x - 1);
            let mut sum = 0i32;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    sum += black_points[ny * blocks_x + nx];
                }
            }
            let threshold = sum / ((y1 - y0 + 1) * (x1 - x0 + 1)) as i32;

            for y in by * block..((by + 1) * block).min(height) {
                let row = &gray[y * width..(y + 1) * width];
                for x in bx * block..((bx + 1) * block).min(width) {
                    if row[x] as i32 <= threshold {
                        binary.set(x, y, true);
                    }
                }
            }
        }
    }

    binary
}

/// Per-block black points
///
/// A block whose spread exceeds [`MIN_DYNAMIC_RANGE`] uses `mean - bias`.
/// A flat block is assumed light (half its minimum) unless its already
/// computed neighbours say the surrounding area is darker than it.
fn block_black_points(
    gray: &[u8],
    width: usize,
    height: usize,
    block: usize,
    blocks_x: usize,
    blocks_y: usize,
    bias: u8,
) -> Vec<i32> {
    let mut points = vec![0i32; blocks_x * blocks_y];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let mut sum = 0u32;
            let mut count = 0u32;
            let mut min = u8::MAX;
            let mut max = u8::MIN;
            for y in by * block..((by + 1) * block).min(height) {
                let row = y * width;
                for &px in &gray[row + bx * block..row + ((bx + 1) * block).min(width)] {
                    sum += px as u32;
                    min = min.min(px);
                    max = max.max(px);
                }
                count += (((bx + 1) * block).min(width) - bx * block) as u32;
            }

            let point = if max - min > MIN_DYNAMIC_RANGE {
                (sum / count.max(1)) as i32 - bias as i32
            } else {
                let mut point = min as i32 / 2;
                if by > 0 && bx > 0 {
                    let neighbours = (points[(by - 1) * blocks_x + bx]
                        + 2 * points[by * blocks_x + bx - 1]
                        + points[(by - 1) * blocks_x + bx - 1])
                        / 4;
                    if (min as i32) < neighbours {
                        point = neighbours;
                    }
                }
                point
            };
            points[by * blocks_x + bx] = point;
        }
    }
    points
}

fn has_contrast(gray: &[u8]) -> bool {
    let (min, max) = gray
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &px| (lo.min(px), hi.max(px)));
    max.saturating_sub(min) >= MIN_DYNAMIC_RANGE
}

/// Convert grayscale image to binary using Otsu's global threshold
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    if gray.is_empty() || !has_contrast(gray) {
        return BitMatrix::new(width, height);
    }
    threshold_binarize(gray, width, height, calculate_otsu_threshold(gray))
}

/// Calculate Otsu's optimal threshold
fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;
    let mut class1_pixels = 0.0;
    let mut class1_sum = 0.0;

    // Pixels strictly below `threshold` form the dark class
    for threshold in 1..=255usize {
        class1_pixels += histogram[threshold - 1] as f64;
        class1_sum += (threshold - 1) as f64 * histogram[threshold - 1] as f64;
        let class2_pixels = total_pixels - class1_pixels;
        if class1_pixels == 0.0 || class2_pixels == 0.0 {
            continue;
        }

        let class1_mean = class1_sum / class1_pixels;
        let class2_mean = (total_sum - class1_sum) / class2_pixels;
        let weight1 = class1_pixels / total_pixels;
        let weight2 = class2_pixels / total_pixels;
        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization, pixels below `threshold` are dark
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);
    for y in 0..height {
        for x in 0..width {
            if gray[y * width + x] < threshold {
                binary.set(x, y, true);
            }
        }
    }
    binary
}
