//! Multi-page scanning through a stand-in rasterizer

mod common;

use common::render;
use rust_barcode::{
    CancellationToken, DecodeOptions, Engine, Error, PageRasterizer, RasterImage, Result, Symbology,
};
use std::sync::Mutex;

/// Pages are prepared rasters; `None` fails to render
struct FakeDocument {
    pages: Vec<Option<RasterImage>>,
    requested_dpi: Mutex<Vec<u32>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeDocument {
    fn new(pages: Vec<Option<RasterImage>>) -> Self {
        Self {
            pages,
            requested_dpi: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }
}

impl PageRasterizer for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<RasterImage> {
        self.requested_dpi.lock().unwrap().push(dpi);
        if let Some((after, token)) = &self.cancel_after {
            if index == *after {
                token.cancel();
            }
        }
        self.pages[index].clone().ok_or_else(|| Error::PageRasterization {
            page: index + 1,
            reason: "corrupt content stream".into(),
        })
    }
}

fn page(text: &str) -> Option<RasterImage> {
    Some(render(text, Symbology::QrCode, 240, 240))
}

#[test]
fn test_failed_page_does_not_abort_document() {
    let document = FakeDocument::new(vec![page("PAGE ONE"), None, page("PAGE THREE")]);
    let scan = Engine::default().scan_document(&document, &CancellationToken::new());

    let found: Vec<(usize, &str)> =
        scan.symbols.iter().map(|s| (s.page, s.text.as_str())).collect();
    assert_eq!(found, vec![(1, "PAGE ONE"), (3, "PAGE THREE")]);
    assert_eq!(scan.page_errors.len(), 1);
    assert_eq!(scan.page_errors[0].page, 2);
    assert!(matches!(scan.page_errors[0].error, Error::PageRasterization { page: 2, .. }));
    assert_eq!(scan.pages_completed, 3);
    assert!(!scan.cancelled);
    assert_eq!(scan.symbols_on(3).count(), 1);
    assert_eq!(scan.symbols_on(2).count(), 0);
}

#[test]
fn test_pages_are_ordered_and_rendered_at_configured_dpi() {
    let texts = ["P1", "P2", "P3", "P4", "P5", "P6"];
    let document = FakeDocument::new(texts.iter().map(|t| page(t)).collect());
    let engine = Engine::new(DecodeOptions::default().with_pdf_dpi(150));
    let scan = engine.scan_document(&document, &CancellationToken::new());

    let found: Vec<&str> = scan.symbols.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(found, texts);
    let pages: Vec<usize> = scan.symbols.iter().map(|s| s.page).collect();
    assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
    assert!(document.requested_dpi.lock().unwrap().iter().all(|&dpi| dpi == 150));
}

#[test]
fn test_empty_document() {
    let document = FakeDocument::new(Vec::new());
    let scan = Engine::default().scan_document(&document, &CancellationToken::new());
    assert!(scan.symbols.is_empty());
    assert!(scan.page_errors.is_empty());
    assert_eq!(scan.pages_completed, 0);
    assert!(!scan.cancelled);
}

#[test]
fn test_cancellation_stops_the_scan() {
    let token = CancellationToken::new();
    let mut document = FakeDocument::new(vec![
        page("FIRST"),
        page("SECOND"),
        page("THIRD"),
        page("FOURTH"),
    ]);
    document.cancel_after = Some((1, token.clone()));

    let scan = Engine::default().scan_document(&document, &token);
    assert!(scan.cancelled);
    assert!(scan.pages_completed < 4);
    // Pages after the cancel point are never rendered
    assert_eq!(document.requested_dpi.lock().unwrap().len(), 2);
    assert!(scan.symbols.iter().all(|s| s.page == 1 && s.text == "FIRST"));
}

#[test]
fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let document = FakeDocument::new(vec![page("FIRST")]);
    let scan = Engine::default().scan_document(&document, &token);
    assert!(scan.cancelled);
    assert_eq!(scan.pages_completed, 0);
    assert!(document.requested_dpi.lock().unwrap().is_empty());
}
