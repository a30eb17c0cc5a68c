use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::{DecodeOptions, ECLevel, EncodeOptions, Engine, RasterImage, Symbology, encode};

fn rendered(text: &str, symbology: Symbology, width: usize, height: usize) -> RasterImage {
    let options = EncodeOptions::default()
        .with_size(width, height)
        .with_ec_level(ECLevel::Q);
    encode(text, symbology, &options).unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let engine = Engine::new(DecodeOptions::default());
    let cases = [
        ("qr", rendered("https://example.com/track?id=5531-0042", Symbology::QrCode, 400, 400)),
        ("datamatrix", rendered("LOT 4471/B EXP 2027-03", Symbology::DataMatrix, 300, 300)),
        ("code128", rendered("SHIP-000123456", Symbology::Code128, 600, 160)),
        ("ean13", rendered("5901234123457", Symbology::Ean13, 400, 200)),
    ];
    for (name, image) in &cases {
        c.bench_function(&format!("decode_{name}"), |b| {
            b.iter(|| engine.decode_image(black_box(image)))
        });
    }

    let blank = RasterImage::from_gray(vec![255; 1280 * 720], 1280, 720).unwrap();
    c.bench_function("decode_blank_1280x720", |b| {
        b.iter(|| engine.decode_image(black_box(&blank)))
    });

    let batch: Vec<RasterImage> =
        cases.iter().map(|(_, image)| image.clone()).cycle().take(32).collect();
    c.bench_function("decode_batch_32", |b| b.iter(|| engine.decode_batch(black_box(&batch))));
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
