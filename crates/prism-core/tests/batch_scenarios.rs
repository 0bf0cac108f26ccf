//! End-to-end scenarios through the public API.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use prism_core::batch::{archive_to_vec, BatchJob, CancelToken, ItemStatus, SourceRef};
use prism_core::crop::{AspectRatio, CropArea, CropShape};
use prism_core::detect::{DetectedSubject, NullDetector, PrecomputedDetector};
use prism_core::filter::FilterRequest;
use prism_core::{Config, EncodeOptions, Operation, OutputFormat, Prism, ProcessOptions, ResizeOptions};

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    }))
}

fn engine() -> Prism {
    Prism::with_detector(Config::default(), Arc::new(NullDetector))
}

#[tokio::test]
async fn mixed_batch_resizes_good_files_and_reports_the_corrupt_one() {
    let sources = vec![
        SourceRef::memory("first.jpg", encode(photo(64, 48), ImageFormat::Jpeg)),
        SourceRef::memory("second.jpg", encode(photo(80, 60), ImageFormat::Jpeg)),
        SourceRef::memory("broken.jpg", b"this is not an image at all".to_vec()),
        SourceRef::memory("third.png", encode(photo(40, 40), ImageFormat::Png)),
        SourceRef::memory("fourth.png", encode(photo(30, 20), ImageFormat::Png)),
    ];
    let mut job = BatchJob::new(sources);
    let options = ProcessOptions {
        operations: vec![Operation::Resize(ResizeOptions::percent(50.0))],
        ..ProcessOptions::default()
    };

    let seen = Mutex::new(Vec::new());
    let sink = |percent: f64, _message: &str| seen.lock().unwrap().push(percent);

    let prism = engine();
    let summary = prism
        .runner()
        .run(&mut job, &options, &sink, &CancelToken::new())
        .await;

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.cancelled);
    assert_eq!(job.progress(), 100.0);

    let broken = job.item(2).unwrap();
    assert_eq!(broken.status(), ItemStatus::Failed);
    assert_eq!(broken.error().unwrap().kind, "invalid_input");

    let first = job.item(0).unwrap().output().unwrap();
    assert_eq!((first.encoded.width, first.encoded.height), (32, 24));
    assert_eq!(first.output_name, "first_resized.jpg");

    let progress = seen.lock().unwrap().clone();
    assert_eq!(progress.len(), 5);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last().copied(), Some(100.0));

    let (zip_bytes, manifest) = archive_to_vec(&job, false).unwrap();
    assert_eq!(manifest.entries.len(), 4);
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    assert_eq!(archive.len(), 4);
    let mut entry = Vec::new();
    archive
        .by_name("converted/third_resized.png")
        .unwrap()
        .read_to_end(&mut entry)
        .unwrap();
    assert_eq!(image::load_from_memory(&entry).unwrap().dimensions(), (20, 20));
}

#[test]
fn png_conversion_is_lossless() {
    let source = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 77, (x * 16) as u8]));
    let bytes = encode(DynamicImage::ImageRgba8(source.clone()), ImageFormat::Png);

    let options = ProcessOptions {
        encode: EncodeOptions {
            format: Some(OutputFormat::Png),
            ..EncodeOptions::default()
        },
        ..ProcessOptions::default()
    };
    let output = engine().process_bytes("pixels.png", &bytes, &options).unwrap();
    assert_eq!(output.output_name, "pixels_converted.png");

    let decoded = image::load_from_memory(&output.encoded.bytes).unwrap().to_rgba8();
    assert_eq!(decoded, source);
}

#[test]
fn smart_crop_centres_on_the_detected_face() {
    let face = DetectedSubject::face(CropArea::new(800.0, 400.0, 200.0, 200.0), 0.9);
    let prism = Prism::with_detector(Config::default(), Arc::new(PrecomputedDetector::new(vec![face])));

    let bytes = encode(photo(1920, 1080), ImageFormat::Png);
    let options = ProcessOptions {
        operations: vec![Operation::SmartCrop {
            aspect: AspectRatio::Ratio(1.0),
            shape: CropShape::Rectangle,
        }],
        ..ProcessOptions::default()
    };
    let output = prism.process_bytes("group.png", &bytes, &options).unwrap();

    let plan = output.crop.as_ref().unwrap();
    let area = plan.crop_area;
    for (got, want) in [(area.x, 700.0), (area.y, 300.0), (area.width, 400.0), (area.height, 400.0)] {
        assert!((got - want).abs() < 1e-6, "{area:?}");
    }
    assert_eq!(plan.detected_subjects.len(), 1);
    assert!(plan.confidence > 0.0 && plan.confidence <= 1.0);
    assert_eq!((output.encoded.width, output.encoded.height), (400, 400));
    assert_eq!(output.output_name, "group_cropped.png");
}

#[test]
fn circle_crop_keeps_transparency_in_png() {
    let bytes = encode(photo(100, 60), ImageFormat::Png);
    let options = ProcessOptions {
        operations: vec![Operation::Crop {
            area: CropArea::new(10.0, 0.0, 60.0, 60.0),
            shape: CropShape::Circle,
        }],
        ..ProcessOptions::default()
    };
    let output = engine().process_bytes("avatar.png", &bytes, &options).unwrap();

    let decoded = image::load_from_memory(&output.encoded.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (60, 60));
    assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    assert_eq!(decoded.get_pixel(30, 30)[3], 255);
}

#[test]
fn preset_filter_then_jpeg_output() {
    let bytes = encode(photo(32, 32), ImageFormat::Png);
    let options = ProcessOptions {
        operations: vec![Operation::Filter(FilterRequest {
            preset: Some("noir".to_string()),
            ..FilterRequest::default()
        })],
        encode: EncodeOptions {
            format: Some(OutputFormat::Jpeg),
            quality: 0.8,
            ..EncodeOptions::default()
        },
    };
    let output = engine().process_bytes("street.png", &bytes, &options).unwrap();
    assert_eq!(output.encoded.format, OutputFormat::Jpeg);
    assert_eq!(output.output_name, "street_filtered.jpg");
    assert!(output.encoded.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[test]
fn unknown_preset_is_invalid_input() {
    let bytes = encode(photo(8, 8), ImageFormat::Png);
    let options = ProcessOptions {
        operations: vec![Operation::Filter(FilterRequest {
            preset: Some("does-not-exist".to_string()),
            ..FilterRequest::default()
        })],
        ..ProcessOptions::default()
    };
    let err = engine().process_bytes("x.png", &bytes, &options).unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
}
