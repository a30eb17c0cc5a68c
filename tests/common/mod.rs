//! Shared fixtures for the integration tests
#![allow(dead_code)]

use rust_barcode::{EncodeOptions, RasterImage, Symbology, encode};

/// Encode `text` at the given size with default rendering
pub fn render(text: &str, symbology: Symbology, width: usize, height: usize) -> RasterImage {
    encode(text, symbology, &EncodeOptions::default().with_size(width, height))
        .unwrap_or_else(|e| panic!("failed to encode {text:?} as {symbology}: {e}"))
}

/// White canvas
pub fn canvas(width: usize, height: usize) -> Vec<u8> {
    vec![255; width * height]
}

/// Copy `image` into `canvas` with its top-left corner at (`left`, `top`)
pub fn paste(canvas: &mut [u8], canvas_width: usize, image: &RasterImage, left: usize, top: usize) {
    for y in 0..image.height() {
        let row = (top + y) * canvas_width + left;
        let src = &image.pixels()[y * image.width()..(y + 1) * image.width()];
        canvas[row..row + image.width()].copy_from_slice(src);
    }
}

/// Rotate a raster a quarter turn clockwise
pub fn rotate_clockwise(image: &RasterImage) -> RasterImage {
    let (w, h) = (image.width(), image.height());
    let mut pixels = vec![255; w * h];
    for y in 0..h {
        for x in 0..w {
            // (x, y) lands at (h - 1 - y, x) in a raster h wide
            pixels[x * h + (h - 1 - y)] = image.get(x, y);
        }
    }
    RasterImage::from_gray(pixels, h, w).unwrap()
}

/// Rotate a raster `degrees` clockwise about its centre onto a white canvas that holds all of it
pub fn rotate_by(image: &RasterImage, degrees: f32) -> RasterImage {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let out_w = (w * cos.abs() + h * sin.abs()).ceil() as usize;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil() as usize;
    let mut pixels = vec![255; out_w * out_h];
    for y in 0..out_h {
        for x in 0..out_w {
            let dx = x as f32 + 0.5 - out_w as f32 / 2.0;
            let dy = y as f32 + 0.5 - out_h as f32 / 2.0;
            // Inverse rotation back into the source raster
            let sx = cos * dx + sin * dy + w / 2.0;
            let sy = -sin * dx + cos * dy + h / 2.0;
            if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
                pixels[y * out_w + x] = image.get(sx as usize, sy as usize);
            }
        }
    }
    RasterImage::from_gray(pixels, out_w, out_h).unwrap()
}

/// Fill a rectangle of `image` with `value`
pub fn fill(
    image: &RasterImage,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    value: u8,
) -> RasterImage {
    let mut pixels = image.pixels().to_vec();
    for y in top..top + height {
        let row = y * image.width();
        pixels[row + left..row + left + width].fill(value);
    }
    RasterImage::from_gray(pixels, image.width(), image.height()).unwrap()
}

/// PNG container for `image`
pub fn to_png(image: &RasterImage) -> Vec<u8> {
    let (width, height) = (image.width() as u32, image.height() as u32);
    let buffer = image::GrayImage::from_raw(width, height, image.pixels().to_vec())
        .expect("buffer matches dimensions");
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(buffer)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}
