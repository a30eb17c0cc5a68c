//! Luminance conversion
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, computed in fixed point as
//! (76*R + 150*G + 29*B) >> 8. Transparent pixels are composited onto white
//! so that a barcode drawn on a transparent canvas reads as dark-on-light.

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Images with more pixels than this are converted row-parallel
const PARALLEL_THRESHOLD: usize = 1 << 20;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

#[inline]
fn luma_over_white(r: u8, g: u8, b: u8, a: u8) -> u8 {
    let y = luma(r, g, b) as u32;
    let a = a as u32;
    ((y * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Convert packed RGB to luminance
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixel_count = width * height;
    if pixel_count >= PARALLEL_THRESHOLD {
        return rgb_to_grayscale_parallel(rgb, width, height);
    }
    rgb[..pixel_count * 3]
        .chunks_exact(3)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Convert packed RGBA to luminance, compositing alpha onto white
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixel_count = width * height;
    if pixel_count >= PARALLEL_THRESHOLD {
        return rgba_to_grayscale_parallel(rgba, width, height);
    }
    rgba[..pixel_count * 4]
        .chunks_exact(4)
        .map(|px| luma_over_white(px[0], px[1], px[2], px[3]))
        .collect()
}

/// Row-parallel RGB conversion
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src = &rgb[y * width * 3..(y + 1) * width * 3];
        for (out, px) in row.iter_mut().zip(src.chunks_exact(3)) {
            *out = luma(px[0], px[1], px[2]);
        }
    });
    gray
}

/// Row-parallel RGBA conversion
pub fn rgba_to_grayscale_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src = &rgba[y * width * 4..(y + 1) * width * 4];
        for (out, px) in row.iter_mut().zip(src.chunks_exact(4)) {
            *out = luma_over_white(px[0], px[1], px[2], px[3]);
        }
    });
    gray
}
