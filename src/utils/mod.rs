//! Image processing helpers shared by the pipeline stages
//!
//! - Grayscale conversion (RGB/RGBA to luminance, row-parallel for large images)
//! - Binarization (block-adaptive local threshold, Otsu global threshold)
//! - Geometry (perspective transforms, grid sampling)

pub mod binarization;
pub mod geometry;
pub mod grayscale;
