//! Damaged, noisy and unevenly lit inputs
//!
//! Damage within a symbol's correction budget must still decode; damage
//! beyond it must produce nothing rather than a wrong payload.

mod common;

use common::{fill, render};
use rust_barcode::{ECLevel, EncodeOptions, Engine, RasterImage, Symbology, encode};

/// "HELLO" at level H: version 1, 21 modules of 10 px starting at 45 px
fn qr_hello_h() -> RasterImage {
    encode("HELLO", Symbology::QrCode, &EncodeOptions::default().with_ec_level(ECLevel::H)).unwrap()
}

fn module_px(module: usize) -> usize {
    45 + module * 10
}

#[test]
fn test_qr_survives_damage_within_capacity() {
    let image = fill(&qr_hello_h(), module_px(15), module_px(15), 30, 30, 0);
    let symbols = Engine::default().decode_image(&image);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].text, "HELLO");
}

#[test]
fn test_repairs_lower_confidence() {
    let clean = Engine::default().decode_image(&qr_hello_h());
    let smudged = fill(&qr_hello_h(), module_px(15), module_px(15), 30, 30, 0);
    let damaged = Engine::default().decode_image(&smudged);
    assert_eq!(clean.len(), 1);
    assert_eq!(damaged.len(), 1);
    assert!(damaged[0].confidence < clean[0].confidence);
}

#[test]
fn test_qr_beyond_capacity_is_never_misread() {
    let image = fill(&qr_hello_h(), module_px(9), module_px(9), 120, 120, 0);
    let symbols = Engine::default().decode_image(&image);
    assert!(symbols.iter().all(|s| s.text == "HELLO"), "wrong payload reported: {symbols:?}");
    assert!(symbols.is_empty());
}

#[test]
fn test_data_matrix_survives_damage_within_capacity() {
    // 10x10 symbol plus 2 modules of quiet zone on each side
    let image = render("DM", Symbology::DataMatrix, 320, 320);
    let unit = 320 / 14;
    let left = (320 - 10 * unit) / 2;
    let corner = left + 5 * unit;
    let flipped = 255 - image.get(corner + unit / 2, corner + unit / 2);
    let damaged = fill(&image, corner, corner, unit, unit, flipped);
    let symbols = Engine::default().decode_image(&damaged);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].symbology, Symbology::DataMatrix);
    assert_eq!(symbols[0].text, "DM");
}

#[test]
fn test_linear_survives_partial_scratch() {
    let image = render("SCRATCHED", Symbology::Code128, 400, 120);
    // Wipe the upper half of the bars; lower scan lines still read
    let damaged = fill(&image, 0, 12, 400, 48, 255);
    let symbols = Engine::default().decode_image(&damaged);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].text, "SCRATCHED");
}

#[test]
fn test_linear_with_broken_bar_is_never_misread() {
    let image = render("5901234123457", Symbology::Ean13, 300, 120);
    // Erase a data bar along the whole height
    let damaged = fill(&image, 150, 0, 6, 120, 255);
    let symbols = Engine::default().decode_image(&damaged);
    assert!(
        symbols.iter().all(|s| s.text == "5901234123457"),
        "wrong payload reported: {symbols:?}"
    );
}

#[test]
fn test_uneven_lighting() {
    let image = render("SHADOW", Symbology::QrCode, 300, 300);
    let (w, h) = (image.width(), image.height());
    // Light falls off from left to right; dark stays darker than local light
    let pixels = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| {
            let light = 255 - (x * 120 / w) as u8;
            if image.get(x, y) == 0 { light / 4 } else { light }
        })
        .collect();
    let shaded = RasterImage::from_gray(pixels, w, h).unwrap();
    let symbols = Engine::default().decode_image(&shaded);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].text, "SHADOW");
}

#[test]
fn test_inverse_video_is_not_reported() {
    let image = render("12345678", Symbology::Code128, 300, 100);
    let inverted: Vec<u8> = image.pixels().iter().map(|&p| 255 - p).collect();
    let inverted = RasterImage::from_gray(inverted, image.width(), image.height()).unwrap();
    let symbols = Engine::default().decode_image(&inverted);
    assert!(symbols.iter().all(|s| s.text == "12345678"));
}
