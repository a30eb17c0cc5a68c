use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::utils::grayscale::{
    rgb_to_grayscale, rgb_to_grayscale_parallel, rgba_to_grayscale, rgba_to_grayscale_parallel,
};

const SIZES: [(usize, usize); 3] = [(320, 240), (1280, 720), (2480, 3508)];

/// Diagonal colour ramp so every pixel differs from its neighbours
fn ramp(width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            let v = ((x + y) % 256) as u8;
            pixels.extend_from_slice(&[v, v.wrapping_mul(3), 255 - v, 200][..channels]);
        }
    }
    pixels
}

fn bench_rgb(c: &mut Criterion) {
    let mut group = c.benchmark_group("rgb_to_grayscale");
    for (w, h) in SIZES {
        let rgb = ramp(w, h, 3);
        let label = format!("{w}x{h}");
        group.bench_with_input(BenchmarkId::new("auto", &label), &rgb, |b, rgb| {
            b.iter(|| rgb_to_grayscale(black_box(rgb), w, h))
        });
        group.bench_with_input(BenchmarkId::new("parallel", &label), &rgb, |b, rgb| {
            b.iter(|| rgb_to_grayscale_parallel(black_box(rgb), w, h))
        });
    }
    group.finish();
}

fn bench_rgba(c: &mut Criterion) {
    let mut group = c.benchmark_group("rgba_to_grayscale");
    for (w, h) in SIZES {
        let rgba = ramp(w, h, 4);
        let label = format!("{w}x{h}");
        group.bench_with_input(BenchmarkId::new("auto", &label), &rgba, |b, rgba| {
            b.iter(|| rgba_to_grayscale(black_box(rgba), w, h))
        });
        group.bench_with_input(BenchmarkId::new("parallel", &label), &rgba, |b, rgba| {
            b.iter(|| rgba_to_grayscale_parallel(black_box(rgba), w, h))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rgb, bench_rgba);
criterion_main!(benches);
