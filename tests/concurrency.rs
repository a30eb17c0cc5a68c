//! One engine shared across threads gives the same answers as one thread

mod common;

use common::render;
use rust_barcode::{DecodeOptions, DecodedSymbol, Engine, RasterImage, Symbology, decode_batch};

/// GTIN check digit of `digits`
fn with_check_digit(digits: &str) -> String {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    format!("{digits}{}", (10 - sum % 10) % 10)
}

/// A hundred different symbols with the text each should decode to
fn workload() -> Vec<(RasterImage, Symbology, String)> {
    (0..100)
        .map(|i| {
            let item = format!("ITEM {i}");
            match i % 5 {
                0 => (render(&item, Symbology::QrCode, 200, 200), Symbology::QrCode, item),
                1 => (render(&item, Symbology::Code128, 300, 100), Symbology::Code128, item),
                2 => {
                    let digits = with_check_digit(&format!("{:07}", 4_000_000 + i));
                    (render(&digits, Symbology::Ean8, 240, 100), Symbology::Ean8, digits)
                }
                3 => (render(&item, Symbology::DataMatrix, 160, 160), Symbology::DataMatrix, item),
                _ => (render(&item, Symbology::Code39, 480, 100), Symbology::Code39, item),
            }
        })
        .collect()
}

#[test]
fn test_shared_engine_matches_sequential() {
    let workload = workload();
    let images: Vec<RasterImage> = workload.iter().map(|(image, _, _)| image.clone()).collect();
    let engine = Engine::default();
    let expected: Vec<Vec<DecodedSymbol>> =
        images.iter().map(|image| engine.decode_image(image)).collect();
    for (symbols, (_, symbology, text)) in expected.iter().zip(&workload) {
        assert_eq!(symbols.len(), 1, "{text}");
        assert_eq!((symbols[0].symbology, &symbols[0].text), (*symbology, text));
    }

    let chunk = images.len().div_ceil(8);
    let parallel: Vec<Vec<DecodedSymbol>> = std::thread::scope(|scope| {
        let handles: Vec<_> = images
            .chunks(chunk)
            .map(|part| {
                let engine = &engine;
                scope.spawn(move || {
                    part.iter()
                        .map(|image| engine.decode_image(image))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(parallel, expected);
}

#[test]
fn test_batch_preserves_input_order() {
    let workload = workload();
    let images: Vec<RasterImage> = workload.iter().map(|(image, _, _)| image.clone()).collect();
    let batch = decode_batch(&images, &DecodeOptions::default());
    assert_eq!(batch.len(), images.len());
    for (i, (symbols, (_, symbology, text))) in batch.iter().zip(&workload).enumerate() {
        let found: Vec<(Symbology, &str)> =
            symbols.iter().map(|s| (s.symbology, s.text.as_str())).collect();
        assert_eq!(found, vec![(*symbology, text.as_str())], "image {i}");
    }
}
