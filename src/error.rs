//! Error taxonomy for the decode engine
//!
//! Format-level and I/O failures surface as [`Error`] to the caller of the
//! stage that hit them. Per-candidate failures never do: a failed checksum is
//! a [`CorrectionError`] that the pipeline logs and drops.

use crate::models::Symbology;

/// Errors surfaced to callers of the engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input bytes are not an image container the codec can read
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// Raw pixel buffer does not match its declared dimensions
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document container could not be opened at all
    #[error("document error: {0}")]
    Document(String),

    /// A single document page failed to rasterize
    #[error("page {page} could not be rasterized: {reason}")]
    PageRasterization {
        /// 1-based page number
        page: usize,
        /// Collaborator-provided failure description
        reason: String,
    },

    /// Payload cannot be represented in the requested symbology
    #[error("cannot encode {symbology}: {reason}")]
    Encode {
        /// Requested symbology
        symbology: Symbology,
        /// Why the payload was rejected
        reason: String,
    },
}

impl Error {
    pub(crate) fn encode(symbology: Symbology, reason: impl Into<String>) -> Self {
        Self::Encode {
            symbology,
            reason: reason.into(),
        }
    }
}

/// Integrity failures raised by the error corrector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrectionError {
    /// ECC could not repair the payload, or a check character did not match
    #[error("{symbology} checksum failure: {detail}")]
    ChecksumFailure {
        /// Symbology of the rejected candidate
        symbology: Symbology,
        /// Which check failed
        detail: &'static str,
    },

    /// Codeword stream length does not fit the declared block layout
    #[error("codeword stream of {actual} does not match layout of {expected}")]
    LayoutMismatch {
        /// Codewords the layout requires
        expected: usize,
        /// Codewords sampled
        actual: usize,
    },
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
