//! Barcode generation
//!
//! `encode` is the inverse of the decode pipeline: a payload and a symbology
//! become a black-on-white [`RasterImage`]. Modules are drawn as crisp
//! squares (or full-height bars for linear symbologies) scaled by the
//! largest whole factor that fits the requested size, and the symbol is
//! centred. The image is never smaller than the requested size; a symbol
//! that cannot fit at one pixel per module makes it larger.

/// Aztec Code, compact and full-range
pub mod aztec;
/// Data Matrix ECC 200
pub mod datamatrix;
/// EAN/UPC, Code 128, Code 39, ITF module patterns
pub mod linear;
/// PDF417 stacked rows
pub mod pdf417;
/// QR Code Model 2
pub mod qr;

use log::debug;

use crate::error::Result;
use crate::models::{BitMatrix, ECLevel, Symbology};
use crate::source::RasterImage;

const DARK: u8 = 0;
const LIGHT: u8 = 255;

/// Rendering parameters for [`encode`]
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    /// Target image width in pixels
    pub width: usize,
    /// Target image height in pixels
    pub height: usize,
    /// Quiet zone in modules, `None` for the symbology's customary margin
    pub quiet_zone: Option<usize>,
    /// QR error correction level
    pub ec_level: ECLevel,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            quiet_zone: None,
            ec_level: ECLevel::M,
        }
    }
}

impl EncodeOptions {
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_quiet_zone(mut self, modules: usize) -> Self {
        self.quiet_zone = Some(modules);
        self
    }

    pub fn with_ec_level(mut self, ec_level: ECLevel) -> Self {
        self.ec_level = ec_level;
        self
    }

    fn quiet_zone_for(&self, symbology: Symbology) -> usize {
        self.quiet_zone.unwrap_or(match symbology {
            Symbology::QrCode => 4,
            Symbology::DataMatrix | Symbology::Aztec | Symbology::Pdf417 => 2,
            _ => 10,
        })
    }
}

/// Render `text` as a `symbology` barcode
pub fn encode(text: &str, symbology: Symbology, options: &EncodeOptions) -> Result<RasterImage> {
    let quiet = options.quiet_zone_for(symbology);
    let image = match symbology {
        Symbology::QrCode => render_matrix(&qr::encode(text, options.ec_level)?, quiet, options),
        Symbology::DataMatrix => render_matrix(&datamatrix::encode(text)?, quiet, options),
        Symbology::Aztec => render_matrix(&aztec::encode(text)?, quiet, options),
        Symbology::Pdf417 => render_matrix(&pdf417::encode(text)?, quiet, options),
        _ => render_bars(&linear::modules_for(text, symbology)?, quiet, options),
    }?;
    debug!(
        "encoded {} characters as {symbology} in {}x{}",
        text.chars().count(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Whole-pixel scale for `modules` across `target` pixels, at least 1
fn scale_for(modules: usize, target: usize) -> usize {
    (target / modules.max(1)).max(1)
}

fn render_matrix(grid: &BitMatrix, quiet: usize, options: &EncodeOptions) -> Result<RasterImage> {
    let (cols, rows) = (grid.width() + 2 * quiet, grid.height() + 2 * quiet);
    let unit = scale_for(cols, options.width).min(scale_for(rows, options.height));
    let width = options.width.max(cols * unit);
    let height = options.height.max(rows * unit);
    let left = (width - grid.width() * unit) / 2;
    let top = (height - grid.height() * unit) / 2;

    let mut pixels = vec![LIGHT; width * height];
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if !grid.get(x, y) {
                continue;
            }
            for py in top + y * unit..top + (y + 1) * unit {
                let row = py * width;
                pixels[row + left + x * unit..row + left + (x + 1) * unit].fill(DARK);
            }
        }
    }
    RasterImage::from_gray(pixels, width, height)
}

fn render_bars(modules: &[bool], quiet: usize, options: &EncodeOptions) -> Result<RasterImage> {
    let unit = scale_for(modules.len() + 2 * quiet, options.width);
    let width = options.width.max((modules.len() + 2 * quiet) * unit);
    let height = options.height.max(1);
    let left = (width - modules.len() * unit) / 2;
    let margin = height / 10;

    let mut row = vec![LIGHT; width];
    for (i, &dark) in modules.iter().enumerate() {
        if dark {
            row[left + i * unit..left + (i + 1) * unit].fill(DARK);
        }
    }
    let mut pixels = vec![LIGHT; width * height];
    for y in margin..height - margin {
        pixels[y * width..(y + 1) * width].copy_from_slice(&row);
    }
    RasterImage::from_gray(pixels, width, height)
}
