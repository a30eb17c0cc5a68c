//! Symbol localization
//!
//! Each family has its own locator working on the binarized image:
//! - QR: 1:1:3:1:1 finder patterns grouped into right-angle triples
//! - Data Matrix: connected regions whose border matches the L-shaped finder
//! - Aztec: bullseye rings confirmed across rows and columns
//! - PDF417: start and stop patterns along the linear scan lines
//! - Linear: start patterns along horizontal and vertical scan lines

/// Aztec bullseye detection
pub mod aztec;
/// Data Matrix L-finder detection over connected regions
pub mod datamatrix;
/// Scan-line detection of 1D start patterns
pub mod linear;
/// PDF417 start/stop pattern detection
pub mod pdf417;
/// QR finder pattern detection and grouping
pub mod qr;

use crate::config::DecodeOptions;
use crate::models::{BitMatrix, Candidate, SymbologyFamily};

/// Families in the order their locators run
pub const LOCATOR_ORDER: [LocatorKind; 5] = [
    LocatorKind::Qr,
    LocatorKind::DataMatrix,
    LocatorKind::Aztec,
    LocatorKind::Pdf417,
    LocatorKind::Linear,
];

/// One locator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Qr,
    DataMatrix,
    Aztec,
    Pdf417,
    Linear,
}

impl LocatorKind {
    /// Whether any symbology this locator finds is enabled
    pub fn enabled(self, options: &DecodeOptions) -> bool {
        match self {
            LocatorKind::Qr => options.family_enabled(SymbologyFamily::Qr),
            LocatorKind::DataMatrix => options.family_enabled(SymbologyFamily::DataMatrix),
            LocatorKind::Aztec => options.family_enabled(SymbologyFamily::Aztec),
            LocatorKind::Pdf417 => options.family_enabled(SymbologyFamily::Pdf417),
            LocatorKind::Linear => [
                SymbologyFamily::EanUpc,
                SymbologyFamily::Code128,
                SymbologyFamily::Code39,
                SymbologyFamily::Itf,
            ]
            .into_iter()
            .any(|f| options.family_enabled(f)),
        }
    }

    /// Run this locator, best candidates first
    pub fn run(self, matrix: &BitMatrix, options: &DecodeOptions) -> Vec<Candidate> {
        match self {
            LocatorKind::Qr => qr::locate(matrix, options),
            LocatorKind::DataMatrix => datamatrix::locate(matrix, options),
            LocatorKind::Aztec => aztec::locate(matrix, options),
            LocatorKind::Pdf417 => pdf417::locate(matrix, options),
            LocatorKind::Linear => linear::locate(matrix, options),
        }
    }
}

/// Candidates for every enabled family
///
/// Locators run lazily: a consumer that stops early never pays for the
/// families it did not reach.
pub fn locate<'a>(
    matrix: &'a BitMatrix,
    options: &'a DecodeOptions,
) -> impl Iterator<Item = Candidate> + 'a {
    LOCATOR_ORDER
        .into_iter()
        .filter(move |kind| kind.enabled(options))
        .flat_map(move |kind| kind.run(matrix, options))
}

/// Greedy suppression over candidates sorted best first
///
/// A candidate is dropped when its bounding box overlaps an already kept
/// candidate of the same family by more than `threshold` IoU.
pub fn suppress_overlaps(candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let bbox = candidate.quad.bounding_box();
        let overlaps = kept
            .iter()
            .any(|k| k.family == candidate.family && k.quad.bounding_box().iou(&bbox) > threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quad, Symbology};

    fn candidate(family: SymbologyFamily, left: f32, confidence: f32) -> Candidate {
        Candidate {
            family,
            quad: Quad::from_rect(left, 0.0, left + 10.0, 10.0),
            module_size: 1.0,
            confidence,
            grid: None,
        }
    }

    #[test]
    fn test_suppression_is_per_family() {
        let kept = suppress_overlaps(
            vec![
                candidate(SymbologyFamily::Code128, 0.0, 0.9),
                candidate(SymbologyFamily::Code128, 1.0, 0.5),
                candidate(SymbologyFamily::Itf, 1.0, 0.4),
                candidate(SymbologyFamily::Code128, 50.0, 0.3),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].family, SymbologyFamily::Itf);
    }

    #[test]
    fn test_disabled_families_are_not_located() {
        let options = DecodeOptions::default().with_symbologies(&[Symbology::QrCode]);
        assert!(LocatorKind::Qr.enabled(&options));
        assert!(!LocatorKind::DataMatrix.enabled(&options));
        assert!(!LocatorKind::Aztec.enabled(&options));
        assert!(!LocatorKind::Pdf417.enabled(&options));
        assert!(!LocatorKind::Linear.enabled(&options));

        let options = DecodeOptions::default().with_symbologies(&[Symbology::Pdf417]);
        assert!(LocatorKind::Pdf417.enabled(&options));
        assert!(!LocatorKind::Linear.enabled(&options));

        let blank = BitMatrix::new(64, 64);
        assert_eq!(locate(&blank, &options).count(), 0);
    }
}
