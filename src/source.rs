//! Pixel source: turns encoded images and raw buffers into luminance rasters

use std::path::Path;

use image::{DynamicImage, ImageError};
use log::debug;

use crate::error::{Error, Result};
use crate::utils::grayscale::{rgb_to_grayscale, rgba_to_grayscale};

/// Immutable 8-bit luminance raster
///
/// `pixels().len() == width() * height()` always holds. `page` is set when the
/// raster came from a document page (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    page: Option<usize>,
}

impl RasterImage {
    /// Wrap an existing luminance buffer
    pub fn from_gray(pixels: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        check_len(pixels.len(), width, height, 1)?;
        Ok(Self {
            width,
            height,
            pixels,
            page: None,
        })
    }

    /// Convert a packed RGB buffer
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self> {
        check_len(rgb.len(), width, height, 3)?;
        Self::from_gray(rgb_to_grayscale(rgb, width, height), width, height)
    }

    /// Convert a packed RGBA buffer, compositing transparency onto white
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Result<Self> {
        check_len(rgba.len(), width, height, 4)?;
        Self::from_gray(rgba_to_grayscale(rgba, width, height), width, height)
    }

    /// Convert a decoded `image` crate image
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let pixels = match image {
            DynamicImage::ImageLuma8(gray) => gray.as_raw().clone(),
            DynamicImage::ImageRgb8(rgb) => rgb_to_grayscale(rgb.as_raw(), width, height),
            other => rgba_to_grayscale(other.to_rgba8().as_raw(), width, height),
        };
        Self {
            width,
            height,
            pixels,
            page: None,
        }
    }

    /// Decode an encoded image (PNG, JPEG, GIF, BMP, TIFF, ...) from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(map_image_error)?;
        debug!(
            "decoded {}x{} {:?} image from {} bytes",
            image.width(),
            image.height(),
            image.color(),
            bytes.len()
        );
        Ok(Self::from_dynamic(&image))
    }

    /// Read and decode an image file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Tag the raster with the document page it was rendered from
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Raster width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major luminance samples
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Luminance at (x, y), white outside the raster
    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 255;
        }
        self.pixels[y * self.width + x]
    }

    /// Source document page, if any
    pub fn page(&self) -> Option<usize> {
        self.page
    }

    /// Whether the raster has no pixels
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

fn check_len(len: usize, width: usize, height: usize, channels: usize) -> Result<()> {
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| Error::InvalidRaster(format!("{width}x{height} overflows")))?;
    if len != expected {
        return Err(Error::InvalidRaster(format!(
            "{width}x{height}x{channels} needs {expected} bytes, got {len}"
        )));
    }
    Ok(())
}

fn map_image_error(err: ImageError) -> Error {
    match err {
        ImageError::IoError(io) => Error::Io(io),
        other => Error::UnsupportedFormat(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gray_checks_length() {
        assert!(RasterImage::from_gray(vec![0; 6], 3, 2).is_ok());
        assert!(matches!(
            RasterImage::from_gray(vec![0; 5], 3, 2),
            Err(Error::InvalidRaster(_))
        ));
        assert!(matches!(
            RasterImage::from_rgb(&[0; 5], 1, 2),
            Err(Error::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = RasterImage::from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_png_round_trip() {
        let mut img = image::GrayImage::new(4, 3);
        img.put_pixel(1, 2, image::Luma([17]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();

        let raster = RasterImage::from_bytes(&bytes).unwrap();
        assert_eq!((raster.width(), raster.height()), (4, 3));
        assert_eq!(raster.get(1, 2), 17);
        assert_eq!(raster.get(0, 0), 0);
        assert_eq!(raster.get(9, 9), 255);
        assert_eq!(raster.page(), None);
        assert_eq!(raster.with_page(2).page(), Some(2));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = RasterImage::from_path("/nonexistent/definitely/missing.png");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
