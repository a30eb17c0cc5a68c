//! Result aggregation
//!
//! Decoders may report one physical symbol several times: from different
//! scan lines, both binarization passes, or overlapping candidates. The
//! aggregator folds those reports together and fixes the output order, so
//! results never depend on the order candidates were found in.

use std::cmp::Ordering;

use log::trace;

use crate::models::DecodedSymbol;

/// Merges duplicate detections and orders the survivors
#[derive(Debug, Clone)]
pub struct Aggregator {
    iou_threshold: f32,
    symbols: Vec<DecodedSymbol>,
}

impl Aggregator {
    /// Detections overlapping by more than `iou_threshold` with equal text merge
    pub fn new(iou_threshold: f32) -> Self {
        Self {
            iou_threshold,
            symbols: Vec::new(),
        }
    }

    /// Distinct symbols collected so far
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Add a detection, merging it into an existing one when they are the same symbol
    ///
    /// Returns `true` when the detection was a new symbol.
    pub fn push(&mut self, symbol: DecodedSymbol) -> bool {
        let bbox = symbol.bounding_box();
        let existing = self.symbols.iter_mut().find(|s| {
            s.page == symbol.page
                && s.symbology == symbol.symbology
                && s.text == symbol.text
                && s.bounding_box().iou(&bbox) > self.iou_threshold
        });
        match existing {
            Some(kept) => {
                trace!("aggregate: merged duplicate {} {:?}", symbol.symbology, symbol.text);
                if symbol.confidence > kept.confidence {
                    *kept = symbol;
                }
                false
            }
            None => {
                self.symbols.push(symbol);
                true
            }
        }
    }

    /// Symbols in page then raster order of their top-left corner
    pub fn finish(mut self) -> Vec<DecodedSymbol> {
        self.symbols.sort_by(raster_order);
        self.symbols
    }
}

fn raster_order(a: &DecodedSymbol, b: &DecodedSymbol) -> Ordering {
    let (ba, bb) = (a.bounding_box(), b.bounding_box());
    a.page
        .cmp(&b.page)
        .then(ba.top.total_cmp(&bb.top))
        .then(ba.left.total_cmp(&bb.left))
        .then(a.symbology.cmp(&b.symbology))
        .then_with(|| a.text.cmp(&b.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quad, Symbology};

    fn symbol(
        symbology: Symbology,
        text: &str,
        left: f32,
        top: f32,
        confidence: f32,
    ) -> DecodedSymbol {
        DecodedSymbol {
            symbology,
            text: text.to_string(),
            quad: Quad::from_rect(left, top, left + 100.0, top + 50.0),
            page: 0,
            confidence,
        }
    }

    #[test]
    fn test_overlapping_equal_text_merges_keeping_best() {
        let mut aggregator = Aggregator::new(0.3);
        assert!(aggregator.push(symbol(Symbology::Code128, "ABC", 10.0, 10.0, 0.6)));
        assert!(!aggregator.push(symbol(Symbology::Code128, "ABC", 14.0, 12.0, 0.9)));
        let results = aggregator.finish();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 0.9);
        assert_eq!(results[0].bounding_box().left, 14.0);
    }

    #[test]
    fn test_different_text_or_symbology_is_kept() {
        let mut aggregator = Aggregator::new(0.3);
        aggregator.push(symbol(Symbology::Code128, "ABC", 10.0, 10.0, 0.6));
        aggregator.push(symbol(Symbology::Code128, "ABD", 10.0, 10.0, 0.6));
        aggregator.push(symbol(Symbology::Code39, "ABC", 10.0, 10.0, 0.6));
        assert_eq!(aggregator.len(), 3);
    }

    #[test]
    fn test_distant_copies_are_distinct() {
        let mut aggregator = Aggregator::new(0.3);
        aggregator.push(symbol(Symbology::QrCode, "same", 0.0, 0.0, 1.0));
        aggregator.push(symbol(Symbology::QrCode, "same", 500.0, 0.0, 1.0));
        assert_eq!(aggregator.finish().len(), 2);
    }

    #[test]
    fn test_same_position_on_other_page_is_distinct() {
        let mut aggregator = Aggregator::new(0.3);
        let mut second = symbol(Symbology::QrCode, "same", 0.0, 0.0, 1.0);
        second.page = 2;
        aggregator.push(second);
        let mut first = symbol(Symbology::QrCode, "same", 0.0, 0.0, 1.0);
        first.page = 1;
        aggregator.push(first);
        let pages: Vec<usize> = aggregator.finish().iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_raster_order() {
        let mut aggregator = Aggregator::new(0.3);
        aggregator.push(symbol(Symbology::Ean13, "c", 300.0, 200.0, 1.0));
        aggregator.push(symbol(Symbology::Ean13, "b", 300.0, 0.0, 1.0));
        aggregator.push(symbol(Symbology::Ean13, "a", 0.0, 200.0, 1.0));
        aggregator.push(symbol(Symbology::Ean8, "z", 300.0, 0.0, 1.0));
        let texts: Vec<String> = aggregator.finish().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["b", "z", "a", "c"]);
    }
}
