use std::fmt;
use std::str::FromStr;

use super::{BoundingBox, Quad};

/// Supported symbologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbology {
    /// Code 128 (sets A, B, C)
    Code128,
    /// Code 39, optionally full-ASCII
    Code39,
    /// EAN-13
    Ean13,
    /// EAN-8
    Ean8,
    /// UPC-A (an EAN-13 with leading zero)
    UpcA,
    /// UPC-E zero-suppressed
    UpcE,
    /// Interleaved 2 of 5
    Itf,
    /// QR Code model 2
    QrCode,
    /// Data Matrix ECC 200
    DataMatrix,
    /// PDF417 stacked symbol
    Pdf417,
    /// Aztec Code, compact and full-range
    Aztec,
}

impl Symbology {
    /// Every supported symbology
    pub const ALL: [Symbology; 11] = [
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Itf,
        Symbology::QrCode,
        Symbology::DataMatrix,
        Symbology::Pdf417,
        Symbology::Aztec,
    ];

    /// Locator family that finds this symbology
    pub fn family(self) -> SymbologyFamily {
        match self {
            Symbology::Code128 => SymbologyFamily::Code128,
            Symbology::Code39 => SymbologyFamily::Code39,
            Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA | Symbology::UpcE => {
                SymbologyFamily::EanUpc
            }
            Symbology::Itf => SymbologyFamily::Itf,
            Symbology::QrCode => SymbologyFamily::Qr,
            Symbology::DataMatrix => SymbologyFamily::DataMatrix,
            Symbology::Pdf417 => SymbologyFamily::Pdf417,
            Symbology::Aztec => SymbologyFamily::Aztec,
        }
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Code128 => "CODE_128",
            Symbology::Code39 => "CODE_39",
            Symbology::Ean13 => "EAN_13",
            Symbology::Ean8 => "EAN_8",
            Symbology::UpcA => "UPC_A",
            Symbology::UpcE => "UPC_E",
            Symbology::Itf => "ITF",
            Symbology::QrCode => "QR_CODE",
            Symbology::DataMatrix => "DATA_MATRIX",
            Symbology::Pdf417 => "PDF_417",
            Symbology::Aztec => "AZTEC",
        }
    }

    /// Whether this is a two-dimensional (matrix or stacked) symbology
    pub fn is_2d(self) -> bool {
        matches!(
            self,
            Symbology::QrCode | Symbology::DataMatrix | Symbology::Pdf417 | Symbology::Aztec
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = String;

    /// Case-insensitive, ignores `_`, `-` and spaces (`qr`, `Code-128`, `ean13`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match key.as_str() {
            "CODE128" => Ok(Symbology::Code128),
            "CODE39" => Ok(Symbology::Code39),
            "EAN13" => Ok(Symbology::Ean13),
            "EAN8" => Ok(Symbology::Ean8),
            "UPCA" => Ok(Symbology::UpcA),
            "UPCE" => Ok(Symbology::UpcE),
            "ITF" | "I25" | "INTERLEAVED2OF5" => Ok(Symbology::Itf),
            "QR" | "QRCODE" => Ok(Symbology::QrCode),
            "DATAMATRIX" | "DM" => Ok(Symbology::DataMatrix),
            "PDF417" => Ok(Symbology::Pdf417),
            "AZTEC" | "AZTECCODE" => Ok(Symbology::Aztec),
            _ => Err(format!("unknown symbology '{s}'")),
        }
    }
}

/// Finder-pattern family a locator searches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbologyFamily {
    /// Three 1:1:3:1:1 finder squares
    Qr,
    /// Solid L border with dashed opposite edges
    DataMatrix,
    /// 1-1-1 guard bars of EAN/UPC
    EanUpc,
    /// Code 128 start characters
    Code128,
    /// Code 39 `*` start character
    Code39,
    /// Four narrow ITF start bars
    Itf,
    /// PDF417 start and stop patterns bracketing the rows
    Pdf417,
    /// Concentric square bullseye
    Aztec,
}

impl SymbologyFamily {
    /// Whether candidates of this family are one-dimensional
    pub fn is_linear(self) -> bool {
        !matches!(
            self,
            SymbologyFamily::Qr
                | SymbologyFamily::DataMatrix
                | SymbologyFamily::Pdf417
                | SymbologyFamily::Aztec
        )
    }
}

/// Candidate symbol region produced by a locator
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Family guess from the matched finder pattern
    pub family: SymbologyFamily,
    /// Symbol corners, top-left first in reading orientation
    pub quad: Quad,
    /// Estimated module (narrow bar) width in pixels
    pub module_size: f32,
    /// Finder match quality in [0, 1]
    pub confidence: f32,
    /// Module grid hint for matrix symbologies (rows, columns)
    pub grid: Option<(usize, usize)>,
}

impl Candidate {
    /// Orientation estimate in radians
    pub fn angle(&self) -> f32 {
        self.quad.angle()
    }
}

/// A decoded symbol returned to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    /// Symbology of the decoded symbol
    pub symbology: Symbology,
    /// Decoded text
    pub text: String,
    /// Symbol corners in pixel coordinates
    pub quad: Quad,
    /// Source page: 1-based for documents, 0 for standalone images
    pub page: usize,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl DecodedSymbol {
    /// Axis-aligned bounding box of the symbol
    pub fn bounding_box(&self) -> BoundingBox {
        self.quad.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbology_names_round_trip() {
        for symbology in Symbology::ALL {
            assert_eq!(symbology.name().parse::<Symbology>(), Ok(symbology));
        }
        assert_eq!("qr".parse::<Symbology>(), Ok(Symbology::QrCode));
        assert_eq!("Code-128".parse::<Symbology>(), Ok(Symbology::Code128));
        assert_eq!("pdf417".parse::<Symbology>(), Ok(Symbology::Pdf417));
        assert_eq!("Aztec Code".parse::<Symbology>(), Ok(Symbology::Aztec));
        assert!("maxicode".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_families() {
        assert_eq!(Symbology::UpcE.family(), SymbologyFamily::EanUpc);
        assert!(SymbologyFamily::Itf.is_linear());
        assert!(!SymbologyFamily::DataMatrix.is_linear());
        assert!(Symbology::DataMatrix.is_2d());
        assert!(Symbology::Pdf417.is_2d() && !SymbologyFamily::Pdf417.is_linear());
        assert_eq!(Symbology::Aztec.family(), SymbologyFamily::Aztec);
    }
}
