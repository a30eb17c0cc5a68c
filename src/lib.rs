//! rust_barcode - multi-symbology barcode decoding and generation
//!
//! Reads QR Code, Data Matrix, Code 128, Code 39, EAN-13/8, UPC-A/E and
//! Interleaved 2 of 5 from images and document pages, and renders the same
//! symbologies back to images.
//!
//! Decoding is a fixed chain of stages, each usable on its own:
//! pixel source → binarizer → finder locator → symbol decoder → error
//! corrector → result aggregator. Only symbols whose Reed-Solomon blocks or
//! check characters verify are ever reported.
//!
//! ```no_run
//! use rust_barcode::{DecodeOptions, Engine};
//!
//! let engine = Engine::new(DecodeOptions::default());
//! for symbol in engine.decode_file("label.png")? {
//!     println!("{}: {}", symbol.symbology, symbol.text);
//! }
//! # Ok::<(), rust_barcode::Error>(())
//! ```

/// Duplicate merging and result ordering
pub mod aggregate;
/// Decode options and environment overrides
pub mod config;
/// Reed-Solomon and check-character verification
pub mod correction;
/// Per-family sampling, demodulation and interpretation
pub mod decoder;
/// Per-family candidate localization
pub mod detector;
/// Page rasterization for multi-page documents
pub mod document;
/// Barcode generation
pub mod encoder;
/// Error types
pub mod error;
/// Core data structures (BitMatrix, Quad, Candidate, DecodedSymbol, etc.)
pub mod models;
/// Decode engine and entry points
pub mod pipeline;
/// Image loading into luminance rasters
pub mod source;
/// Utility functions (grayscale, binarization, geometry)
pub mod utils;

pub use aggregate::Aggregator;
pub use config::DecodeOptions;
pub use correction::CheckScheme;
#[cfg(feature = "pdf")]
pub use document::MupdfRasterizer;
pub use document::{DocumentScan, PageError, PageRasterizer};
pub use encoder::{EncodeOptions, encode};
pub use error::{CorrectionError, Error, Result};
pub use models::{
    BitMatrix, BoundingBox, DecodedSymbol, ECLevel, Point, Quad, Symbology, SymbologyFamily,
};
pub use pipeline::{
    CancellationToken, Engine, decode_batch, decode_bytes, decode_file, decode_image,
};
pub use source::RasterImage;
pub use utils::binarization::BinarizerOptions;
