//! Document input
//!
//! A document is decoded page by page: each page is rasterized at the
//! configured resolution and fed through the same pipeline as a standalone
//! image, with its symbols tagged by 1-based page number. A page that fails
//! to rasterize is recorded and skipped; it never aborts the document.

use crate::error::{Error, Result};
use crate::models::DecodedSymbol;
use crate::source::RasterImage;

/// Source of page rasters for [`Engine::scan_document`](crate::pipeline::Engine::scan_document)
///
/// Pages are requested one at a time from the calling thread, so
/// implementations need not be thread safe.
pub trait PageRasterizer {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Render the 0-based page `index` at `dpi`
    fn render_page(&self, index: usize, dpi: u32) -> Result<RasterImage>;
}

/// A page that could not be decoded
#[derive(Debug)]
pub struct PageError {
    /// 1-based page number
    pub page: usize,
    /// What went wrong
    pub error: Error,
}

impl PageError {
    /// Wrap a rasterizer failure as a [`Error::PageRasterization`] for `page`
    pub fn rasterization(page: usize, error: Error) -> Self {
        let error = match error {
            Error::PageRasterization { .. } => error,
            other => Error::PageRasterization {
                page,
                reason: other.to_string(),
            },
        };
        Self { page, error }
    }
}

/// Outcome of scanning a document
#[derive(Debug, Default)]
pub struct DocumentScan {
    /// Symbols of every completed page, by page then raster order
    pub symbols: Vec<DecodedSymbol>,
    /// Pages that failed, in page order
    pub page_errors: Vec<PageError>,
    /// Pages fully processed, failed pages included
    pub pages_completed: usize,
    /// Whether the scan stopped early on cancellation
    pub cancelled: bool,
}

impl DocumentScan {
    /// Symbols found on 1-based `page`
    pub fn symbols_on(&self, page: usize) -> impl Iterator<Item = &DecodedSymbol> {
        self.symbols.iter().filter(move |s| s.page == page)
    }
}

#[cfg(feature = "pdf")]
pub use pdf::MupdfRasterizer;

#[cfg(feature = "pdf")]
mod pdf {
    use std::path::Path;

    use log::debug;
    use mupdf::{Colorspace, Document, Matrix};

    use super::PageRasterizer;
    use crate::error::{Error, Result};
    use crate::source::RasterImage;

    /// PDF points per inch
    const POINTS_PER_INCH: f32 = 72.0;

    /// PDF rasterizer backed by MuPDF
    pub struct MupdfRasterizer {
        document: Document,
        page_count: usize,
    }

    impl MupdfRasterizer {
        /// Open a PDF file
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let document = Document::open(path.to_string_lossy().as_ref())
                .map_err(|e| Error::Document(e.to_string()))?;
            Self::from_document(document)
        }

        /// Open a PDF held in memory
        pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
            let document = Document::from_bytes(bytes, "application/pdf")
                .map_err(|e| Error::Document(e.to_string()))?;
            Self::from_document(document)
        }

        fn from_document(document: Document) -> Result<Self> {
            let page_count = document.page_count().map_err(|e| Error::Document(e.to_string()))?;
            let page_count = usize::try_from(page_count)
                .map_err(|_| Error::Document("negative page count".into()))?;
            debug!("pdf: opened document with {page_count} pages");
            Ok(Self {
                document,
                page_count,
            })
        }
    }

    impl PageRasterizer for MupdfRasterizer {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn render_page(&self, index: usize, dpi: u32) -> Result<RasterImage> {
            let failed = |reason: String| Error::PageRasterization {
                page: index + 1,
                reason,
            };
            let page = self.document.load_page(index as i32).map_err(|e| failed(e.to_string()))?;
            let scale = dpi as f32 / POINTS_PER_INCH;
            let matrix = Matrix::new_scale(scale, scale);
            let pixmap = page
                .to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)
                .map_err(|e| failed(e.to_string()))?;

            let n = pixmap.n() as usize;
            let width = pixmap.width() as usize;
            let height = pixmap.height() as usize;
            let stride = pixmap.stride() as usize;
            let samples = pixmap.samples();
            let row_bytes = width * n;
            if n < 3 || row_bytes > stride || samples.len() < stride * height {
                return Err(failed(format!("unexpected pixmap layout ({n} channels)")));
            }
            let mut rgb = Vec::with_capacity(width * height * 3);
            for y in 0..height {
                let row = &samples[y * stride..y * stride + row_bytes];
                for px in row.chunks_exact(n) {
                    rgb.extend_from_slice(&px[..3]);
                }
            }
            Ok(RasterImage::from_rgb(&rgb, width, height)?.with_page(index + 1))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::encoder::linear::modules_for;
        use crate::models::Symbology;
        use crate::pipeline::{CancellationToken, Engine};

        /// One-page PDF whose page draws `modules` as filled rectangles
        fn barcode_pdf(modules: &[bool]) -> Vec<u8> {
            let mut content = String::from("0 g\n");
            let mut x = 0;
            while x < modules.len() {
                let run = modules[x..].iter().take_while(|&&m| m == modules[x]).count();
                if modules[x] {
                    let (left, width) = (30.0 + 1.5 * x as f32, 1.5 * run as f32);
                    content.push_str(&format!("{left:.1} 20 {width:.1} 80 re f\n"));
                }
                x += run;
            }

            let objects = [
                "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
                "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 120] /Contents 4 0 R >>"
                    .to_string(),
                format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
            ];
            let mut pdf = b"%PDF-1.4\n".to_vec();
            let mut offsets = Vec::new();
            for (i, object) in objects.iter().enumerate() {
                offsets.push(pdf.len());
                pdf.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
            }
            let xref = pdf.len();
            let count = objects.len() + 1;
            pdf.extend_from_slice(format!("xref\n0 {count}\n0000000000 65535 f \n").as_bytes());
            for offset in offsets {
                pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
            }
            pdf.extend_from_slice(
                format!("trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n")
                    .as_bytes(),
            );
            pdf
        }

        #[test]
        fn test_renders_and_scans_generated_pdf() {
            let modules = modules_for("PDF PAGE", Symbology::Code128).unwrap();
            let document = MupdfRasterizer::from_bytes(&barcode_pdf(&modules)).unwrap();
            assert_eq!(document.page_count(), 1);

            let raster = document.render_page(0, 144).unwrap();
            assert_eq!((raster.width(), raster.height()), (600, 240));
            assert_eq!(raster.page(), Some(1));

            let scan = Engine::default().scan_document(&document, &CancellationToken::new());
            assert!(scan.page_errors.is_empty());
            assert_eq!(scan.pages_completed, 1);
            let found: Vec<(usize, &str)> =
                scan.symbols.iter().map(|s| (s.page, s.text.as_str())).collect();
            assert_eq!(found, vec![(1, "PDF PAGE")]);
        }

        #[test]
        fn test_missing_page_is_a_rasterization_error() {
            let modules = modules_for("X", Symbology::Code128).unwrap();
            let document = MupdfRasterizer::from_bytes(&barcode_pdf(&modules)).unwrap();
            assert!(matches!(
                document.render_page(5, 72),
                Err(Error::PageRasterization { page: 6, .. })
            ));
            assert!(MupdfRasterizer::from_bytes(b"not a pdf").is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rasterization_errors_carry_page() {
        let err = PageError::rasterization(2, Error::Document("broken xref".into()));
        assert_eq!(err.page, 2);
        assert!(matches!(
            err.error,
            Error::PageRasterization { page: 2, ref reason } if reason.contains("broken xref")
        ));

        let original = Error::PageRasterization {
            page: 3,
            reason: "bad stream".into(),
        };
        let err = PageError::rasterization(3, original);
        assert_eq!(err.error.to_string(), "page 3 could not be rasterized: bad stream");
    }
}
