//! Image preprocessing for the UltraFace detector.
//!
//! UltraFace RFB-320 expects:
//! - Input size: 320×240 pixels (width × height)
//! - Normalization: (pixel - 127) / 128
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Model input width.
pub const INPUT_WIDTH: u32 = 320;

/// Model input height.
pub const INPUT_HEIGHT: u32 = 240;

const NORM_MEAN: f32 = 127.0;
const NORM_STD: f32 = 128.0;

/// Resize to the model input, convert to RGB and normalize into an NCHW tensor.
///
/// The image is stretched; box coordinates come back normalized, so mapping
/// them onto the original size undoes the stretch.
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let resized = image.resize_exact(
        INPUT_WIDTH,
        INPUT_HEIGHT,
        image::imageops::FilterType::Triangle,
    );
    let rgb = resized.to_rgb8();

    let (w, h) = (INPUT_WIDTH as usize, INPUT_HEIGHT as usize);
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, h, w));

    let raw = rgb.as_raw();
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        let y = i / w;
        let x = i % w;
        for (c, &val) in pixel.iter().enumerate() {
            tensor[[0, c, y, x]] = (val as f32 - NORM_MEAN) / NORM_STD;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 3, 240, 320]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255])));
        let tensor = preprocess(&img);
        let max_val = tensor.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!((max_val - 1.0).abs() < 0.01);

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0])));
        let tensor = preprocess(&img);
        let min_val = tensor.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!((min_val - (-127.0 / 128.0)).abs() < 0.01);
    }
}
