//! Decode configuration
//!
//! [`DecodeOptions`] is a plain value passed into every stage. Defaults can be
//! overridden from the environment with [`DecodeOptions::from_env`]; the
//! variables are read once per process.

use std::sync::OnceLock;

use log::debug;

use crate::models::{Symbology, SymbologyFamily};
use crate::utils::binarization::{BinarizerOptions, DEFAULT_BIAS};

/// Default rasterization resolution for document pages
pub const DEFAULT_PDF_DPI: u32 = 300;

/// Default IoU above which two detections are the same symbol
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;

/// Default number of evenly spaced scan lines per axis for linear symbols
pub const DEFAULT_SCAN_LINES: usize = 48;

/// Options controlling a decode call
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Symbologies to search for; families with none enabled are skipped
    pub symbologies: Vec<Symbology>,
    /// Stop after this many distinct symbols per image
    pub max_results: Option<usize>,
    /// Overlap above which equal payloads are merged
    pub iou_threshold: f32,
    /// Document page rasterization resolution
    pub pdf_dpi: u32,
    /// Binarizer tunables
    pub binarizer: BinarizerOptions,
    /// Scan lines per axis for linear symbols
    pub scan_lines: usize,
    /// Also scan columns (rotated linear symbols)
    pub try_vertical: bool,
    /// Retry with a global Otsu threshold when the adaptive pass finds nothing
    pub global_fallback: bool,
    /// Require and strip the Code 39 mod-43 check character
    pub code39_check_digit: bool,
    /// Interpret Code 39 shift pairs as full ASCII
    pub code39_extended: bool,
    /// Require the ITF mod-10 check digit
    pub itf_check_digit: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            symbologies: Symbology::ALL.to_vec(),
            max_results: None,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            pdf_dpi: DEFAULT_PDF_DPI,
            binarizer: BinarizerOptions::default(),
            scan_lines: DEFAULT_SCAN_LINES,
            try_vertical: true,
            global_fallback: true,
            code39_check_digit: true,
            code39_extended: false,
            itf_check_digit: true,
        }
    }
}

impl DecodeOptions {
    /// Defaults overridden by `BARCODE_*` environment variables
    pub fn from_env() -> Self {
        static ENV_OPTIONS: OnceLock<DecodeOptions> = OnceLock::new();
        ENV_OPTIONS
            .get_or_init(|| {
                let defaults = Self::default();
                let options = Self {
                    symbologies: parse_env_symbologies("BARCODE_SYMBOLOGIES")
                        .unwrap_or(defaults.symbologies),
                    max_results: Some(parse_env_usize("BARCODE_MAX_RESULTS", 0)).filter(|&n| n > 0),
                    iou_threshold: parse_env_f32("BARCODE_IOU_THRESHOLD", defaults.iou_threshold)
                        .clamp(0.0, 1.0),
                    pdf_dpi: parse_env_u32("BARCODE_PDF_DPI", defaults.pdf_dpi).clamp(36, 1200),
                    binarizer: BinarizerOptions {
                        block_size: std::env::var("BARCODE_BLOCK_SIZE")
                            .ok()
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .map(|n| n.clamp(2, 256)),
                        bias: parse_env_u8("BARCODE_BINARIZER_BIAS", DEFAULT_BIAS),
                    },
                    scan_lines: parse_env_usize("BARCODE_SCAN_LINES", defaults.scan_lines)
                        .clamp(1, 4096),
                    code39_check_digit: parse_env_bool_u8("BARCODE_CODE39_CHECK", true),
                    itf_check_digit: parse_env_bool_u8("BARCODE_ITF_CHECK", true),
                    ..defaults
                };
                debug!("decode options from environment: {options:?}");
                options
            })
            .clone()
    }

    /// Restrict decoding to `symbologies`
    pub fn with_symbologies(mut self, symbologies: &[Symbology]) -> Self {
        self.symbologies = symbologies.to_vec();
        self
    }

    /// Stop after `max` distinct symbols
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Override the dedupe overlap threshold
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Override the document rasterization resolution
    pub fn with_pdf_dpi(mut self, dpi: u32) -> Self {
        self.pdf_dpi = dpi;
        self
    }

    /// Override binarizer tunables
    pub fn with_binarizer(mut self, binarizer: BinarizerOptions) -> Self {
        self.binarizer = binarizer;
        self
    }

    /// Override the number of linear scan lines per axis
    pub fn with_scan_lines(mut self, lines: usize) -> Self {
        self.scan_lines = lines.max(1);
        self
    }

    /// Enable or disable column scanning
    pub fn with_try_vertical(mut self, enabled: bool) -> Self {
        self.try_vertical = enabled;
        self
    }

    /// Enable or disable the global-threshold retry
    pub fn with_global_fallback(mut self, enabled: bool) -> Self {
        self.global_fallback = enabled;
        self
    }

    /// Require the Code 39 mod-43 check character
    pub fn with_code39_check_digit(mut self, enabled: bool) -> Self {
        self.code39_check_digit = enabled;
        self
    }

    /// Decode Code 39 full-ASCII shift pairs
    pub fn with_code39_extended(mut self, enabled: bool) -> Self {
        self.code39_extended = enabled;
        self
    }

    /// Require the ITF mod-10 check digit
    pub fn with_itf_check_digit(mut self, enabled: bool) -> Self {
        self.itf_check_digit = enabled;
        self
    }

    /// Whether `symbology` is enabled
    pub fn is_enabled(&self, symbology: Symbology) -> bool {
        self.symbologies.contains(&symbology)
    }

    /// Whether any enabled symbology belongs to `family`
    pub fn family_enabled(&self, family: SymbologyFamily) -> bool {
        self.symbologies.iter().any(|s| s.family() == family)
    }
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Comma-separated symbology names; unknown names are skipped
fn parse_env_symbologies(name: &str) -> Option<Vec<Symbology>> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_symbology_list(&raw);
    (!parsed.is_empty()).then_some(parsed)
}

fn parse_symbology_list(raw: &str) -> Vec<Symbology> {
    let mut out = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.parse::<Symbology>() {
            Ok(symbology) if !out.contains(&symbology) => out.push(symbology),
            Ok(_) => {}
            Err(err) => debug!("ignoring {err}"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecodeOptions::default();
        assert_eq!(options.pdf_dpi, 300);
        assert!((options.iou_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(options.binarizer.bias, 2);
        assert!(options.max_results.is_none());
        assert!(options.code39_check_digit && options.itf_check_digit);
        for symbology in Symbology::ALL {
            assert!(options.is_enabled(symbology));
        }
    }

    #[test]
    fn test_family_filter() {
        let options = DecodeOptions::default().with_symbologies(&[Symbology::UpcA]);
        assert!(options.family_enabled(SymbologyFamily::EanUpc));
        assert!(!options.family_enabled(SymbologyFamily::Qr));
        assert!(!options.is_enabled(Symbology::Ean13));
    }

    #[test]
    fn test_parse_symbology_list() {
        assert_eq!(
            parse_symbology_list("qr, ean13,QR_CODE,bogus,"),
            vec![Symbology::QrCode, Symbology::Ean13]
        );
        assert!(parse_symbology_list(" , ").is_empty());
    }
}
