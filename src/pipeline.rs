//! Decode engine
//!
//! Runs the stages in order for each raster: binarize, locate candidates
//! family by family, sample and demodulate, verify, interpret, aggregate.
//! Nothing here holds mutable state between calls, so one [`Engine`] can be
//! shared by any number of threads.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use log::{debug, trace};
use rayon::prelude::*;

use crate::aggregate::Aggregator;
use crate::config::DecodeOptions;
use crate::correction::correct;
use crate::decoder::{SymbolDecoder, decoders_for};
use crate::detector::locate;
use crate::document::{DocumentScan, PageError, PageRasterizer};
use crate::error::Result;
use crate::models::{BitMatrix, DecodedSymbol};
use crate::source::RasterImage;
use crate::utils::binarization::{binarize, otsu_binarize};

/// Shared flag that asks running decodes to stop early
///
/// Clones observe the same flag. Checked between pages and between
/// candidates; results of work already completed are kept.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Symbols of one raster and whether every candidate was examined
struct Pass {
    symbols: Vec<DecodedSymbol>,
    complete: bool,
}

/// Multi-symbology decode engine
pub struct Engine {
    options: DecodeOptions,
    decoders: Vec<Box<dyn SymbolDecoder>>,
}

impl Engine {
    /// Engine with decoders for every family enabled in `options`
    pub fn new(options: DecodeOptions) -> Self {
        let decoders = decoders_for(&options);
        Self { options, decoders }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode every symbol in `image`
    pub fn decode_image(&self, image: &RasterImage) -> Vec<DecodedSymbol> {
        self.run(image, &CancellationToken::new()).symbols
    }

    /// Decode `image`, stopping early when `token` is cancelled
    ///
    /// A cancelled decode returns the symbols verified before it stopped.
    pub fn decode_with_cancel(
        &self,
        image: &RasterImage,
        token: &CancellationToken,
    ) -> Vec<DecodedSymbol> {
        self.run(image, token).symbols
    }

    /// Load and decode an image file
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<Vec<DecodedSymbol>> {
        Ok(self.decode_image(&RasterImage::from_path(path)?))
    }

    /// Decode an encoded image held in memory
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Vec<DecodedSymbol>> {
        Ok(self.decode_image(&RasterImage::from_bytes(bytes)?))
    }

    /// Decode independent images in parallel, results in input order
    pub fn decode_batch(&self, images: &[RasterImage]) -> Vec<Vec<DecodedSymbol>> {
        images.par_iter().map(|image| self.decode_image(image)).collect()
    }

    /// Decode every page of a document
    ///
    /// Pages are rendered on the calling thread in windows of one page per
    /// rayon worker; a window is decoded on the pool while the next one
    /// renders, so at most two windows of rasters are alive at once. A page
    /// that fails to render is recorded in [`DocumentScan::page_errors`]; a
    /// page interrupted by cancellation contributes nothing.
    pub fn scan_document(
        &self,
        document: &dyn PageRasterizer,
        token: &CancellationToken,
    ) -> DocumentScan {
        self.scan_pages(document, token, |raster| self.run(raster, token))
    }

    fn scan_pages<F>(
        &self,
        document: &dyn PageRasterizer,
        token: &CancellationToken,
        decode: F,
    ) -> DocumentScan
    where
        F: Fn(&RasterImage) -> Pass + Sync,
    {
        let pages = document.page_count();
        let dpi = self.options.pdf_dpi;
        let window = rayon::current_num_threads().max(1);
        let (tx, rx) = mpsc::channel::<(usize, Pass)>();
        let mut scan = DocumentScan::default();
        let mut rendered: Vec<(usize, RasterImage)> = Vec::with_capacity(window);
        let mut next = 0;
        let decode = &decode;

        loop {
            let ready = std::mem::take(&mut rendered);
            if ready.is_empty() && (next >= pages || token.is_cancelled()) {
                break;
            }
            rayon::in_place_scope(|scope| {
                for (page, raster) in ready {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let _ = tx.send((page, decode(&raster)));
                    });
                }
                let end = (next + window).min(pages);
                while next < end && !token.is_cancelled() {
                    let page = next + 1;
                    match document.render_page(next, dpi) {
                        Ok(raster) => rendered.push((page, raster.with_page(page))),
                        Err(err) => {
                            debug!("page {page}: {err}");
                            scan.page_errors.push(PageError::rasterization(page, err));
                            scan.pages_completed += 1;
                        }
                    }
                    next += 1;
                }
            });
        }
        drop(tx);

        let mut decoded: Vec<(usize, Pass)> =
            rx.into_iter().filter(|(_, pass)| pass.complete).collect();
        decoded.sort_by_key(|(page, _)| *page);
        scan.pages_completed += decoded.len();
        scan.symbols = decoded.into_iter().flat_map(|(_, pass)| pass.symbols).collect();
        scan.page_errors.sort_by_key(|e| e.page);
        scan.cancelled = token.is_cancelled() && scan.pages_completed < pages;
        debug!(
            "document: {} symbols on {}/{pages} pages, {} page errors",
            scan.symbols.len(),
            scan.pages_completed,
            scan.page_errors.len()
        );
        scan
    }

    fn run(&self, image: &RasterImage, token: &CancellationToken) -> Pass {
        if image.is_empty() {
            return Pass {
                symbols: Vec::new(),
                complete: true,
            };
        }
        let page = image.page().unwrap_or(0);
        let mut aggregator = Aggregator::new(self.options.iou_threshold);

        let matrix = binarize(image, &self.options.binarizer);
        let mut complete = self.decode_matrix(&matrix, page, token, &mut aggregator);

        if complete && aggregator.is_empty() && self.options.global_fallback {
            let global = otsu_binarize(image.pixels(), image.width(), image.height());
            if global != matrix {
                trace!("no symbols after adaptive pass, retrying with global threshold");
                complete = self.decode_matrix(&global, page, token, &mut aggregator);
            }
        }

        let mut symbols = aggregator.finish();
        if let Some(max) = self.options.max_results {
            symbols.truncate(max);
        }
        debug!(
            "decoded {} symbols from {}x{} raster (page {page})",
            symbols.len(),
            image.width(),
            image.height()
        );
        Pass { symbols, complete }
    }

    /// Decode candidates of `matrix` into `aggregator`, `false` if cancelled
    fn decode_matrix(
        &self,
        matrix: &BitMatrix,
        page: usize,
        token: &CancellationToken,
        aggregator: &mut Aggregator,
    ) -> bool {
        let mut candidates = 0usize;
        for candidate in locate(matrix, &self.options) {
            if token.is_cancelled() {
                debug!("decode cancelled after {candidates} candidates");
                return false;
            }
            if self.options.max_results.is_some_and(|max| aggregator.len() >= max) {
                break;
            }
            candidates += 1;

            let Some(decoder) = self.decoders.iter().find(|d| d.handles(candidate.family)) else {
                continue;
            };
            let Some(raw) = decoder.try_decode(&candidate, matrix) else {
                trace!(
                    "{:?} candidate at {:?} did not sample",
                    candidate.family,
                    candidate.quad.center()
                );
                continue;
            };
            let corrected = match correct(raw, &self.options) {
                Ok(corrected) => corrected,
                Err(err) => {
                    trace!("dropping candidate: {err}");
                    continue;
                }
            };
            if !self.options.is_enabled(corrected.symbology) {
                continue;
            }
            let Some(text) = decoder.interpret(&corrected) else {
                trace!("{}: payload did not interpret", corrected.symbology);
                continue;
            };
            aggregator.push(DecodedSymbol {
                symbology: corrected.symbology,
                text,
                quad: corrected.quad,
                page,
                confidence: corrected.confidence(),
            });
        }
        debug!("{candidates} candidates, {} symbols", aggregator.len());
        true
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

/// Decode every symbol in `image`
pub fn decode_image(image: &RasterImage, options: &DecodeOptions) -> Vec<DecodedSymbol> {
    Engine::new(options.clone()).decode_image(image)
}

/// Load and decode an image file
pub fn decode_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Vec<DecodedSymbol>> {
    Engine::new(options.clone()).decode_file(path)
}

/// Decode an encoded image held in memory
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<DecodedSymbol>> {
    Engine::new(options.clone()).decode_bytes(bytes)
}

/// Decode independent images in parallel, results in input order
pub fn decode_batch(images: &[RasterImage], options: &DecodeOptions) -> Vec<Vec<DecodedSymbol>> {
    Engine::new(options.clone()).decode_batch(images)
}
