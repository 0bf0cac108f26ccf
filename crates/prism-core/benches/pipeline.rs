//! Benchmarks for the Prism image processing pipeline.
//!
//! Run with: cargo bench -p prism-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use prism_core::config::{Config, EncodeConfig, LimitsConfig};
use prism_core::filter::{apply_adjustments, find_preset, oil_painting, sketch, watercolor};
use prism_core::geometry::{resize, ResizeOptions};
use prism_core::pipeline::{EncodeOptions, FormatEncoder, OutputFormat, RasterDecoder, RasterImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn raster(width: u32, height: u32) -> RasterImage {
    RasterImage::new(DynamicImage::ImageRgba8(gradient(width, height)).to_rgb8().into(), ImageFormat::Png)
}

fn benchmark_decode(c: &mut Criterion) {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(gradient(1024, 768))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    let bytes = buf.into_inner();
    let decoder = RasterDecoder::new(LimitsConfig::default());

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = decoder.decode(black_box(&bytes), "bench.png");
        })
    });
}

fn benchmark_resize(c: &mut Criterion) {
    let image = raster(1920, 1080);
    let options = ResizeOptions::percent(50.0);
    let max = Config::default().limits.max_image_dimension;

    c.bench_function("resize_1080p_half", |b| {
        b.iter(|| {
            let _ = resize(black_box(image.clone()), &options, max);
        })
    });
}

fn benchmark_encode_jpeg(c: &mut Criterion) {
    let image = raster(1024, 768);
    let encoder = FormatEncoder::new(EncodeConfig::default());
    let options = EncodeOptions {
        format: Some(OutputFormat::Jpeg),
        ..EncodeOptions::default()
    };

    c.bench_function("encode_jpeg_1024", |b| {
        b.iter(|| {
            let _ = encoder.convert(black_box(&image), &options);
        })
    });
}

fn benchmark_adjustments(c: &mut Criterion) {
    let image = gradient(512, 512);
    let Some(preset) = find_preset("retro") else {
        eprintln!("Skipping adjustments benchmark: preset not found");
        return;
    };

    c.bench_function("adjust_retro_512", |b| {
        b.iter(|| {
            let _ = apply_adjustments(black_box(&image), &preset.config);
        })
    });
}

fn benchmark_artistic(c: &mut Criterion) {
    let image = gradient(512, 512);

    c.bench_function("oil_painting_512", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            let _ = oil_painting(black_box(&image), 100.0, 12, &mut rng);
        })
    });

    c.bench_function("watercolor_512", |b| {
        b.iter(|| {
            let _ = watercolor(black_box(&image), 100.0, 0.5);
        })
    });

    c.bench_function("sketch_512", |b| {
        b.iter(|| {
            let _ = sketch(black_box(&image), 100.0);
        })
    });
}

criterion_group!(
    benches,
    benchmark_decode,
    benchmark_resize,
    benchmark_encode_jpeg,
    benchmark_adjustments,
    benchmark_artistic,
);
criterion_main!(benches);
