//! Format encoding with transparency flattening and quality policy.
//!
//! | Format | Alpha | Quality knob | Pixel-exact | Encoder |
//! |---|---|---|---|---|
//! | JPEG | no | yes | no | `JpegEncoder::new_with_quality` |
//! | PNG | yes | no | yes | `image` PNG writer |
//! | WebP | yes | no | yes | `image-webp` lossless writer |
//! | GIF | yes | no | no (256-colour palette) | `image` GIF writer |
//! | BMP | no | no | yes (RGB) | `image` BMP writer |
//! | TIFF | yes | no | yes | `image` TIFF writer |
//! | AVIF | - | - | - | recognised, not encodable in this build |

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use super::decode::RasterImage;
use crate::config::EncodeConfig;
use crate::error::{ProcessError, ProcessResult};

/// Output formats the encoder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Avif,
}

impl OutputFormat {
    /// Parse a format name or extension (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    /// Map a decoded source format onto an output format.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::Avif => Some(Self::Avif),
            _ => None,
        }
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Avif => "avif",
        }
    }

    /// MIME type for download headers.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Avif => "image/avif",
        }
    }

    /// Whether the container can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg | Self::Bmp)
    }

    /// Whether the encoder honours a quality setting.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// Whether decoding the output gives back the encoded pixels exactly.
    ///
    /// GIF ignores quality like the lossless formats but quantizes to a
    /// palette, so it is excluded.
    pub fn is_pixel_exact(self) -> bool {
        matches!(self, Self::Png | Self::WebP | Self::Bmp | Self::Tiff)
    }

    /// Whether this build can encode the format.
    pub fn is_encodable(self) -> bool {
        !matches!(self, Self::Avif)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::Avif => ImageFormat::Avif,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            other => other.extension(),
        };
        f.write_str(name)
    }
}

/// Parameters for a single encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Target format; `None` keeps the source format when encodable
    pub format: Option<OutputFormat>,
    /// Requested quality in [0, 1]; ignored by lossless formats
    pub quality: f32,
    /// Keep alpha when the target format supports it
    pub preserve_transparency: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: None,
            quality: 0.92,
            preserve_transparency: true,
        }
    }
}

/// Encoder output.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Encoded file bytes
    pub bytes: Vec<u8>,
    /// Format the bytes are in
    pub format: OutputFormat,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

impl EncodedImage {
    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Signed size change relative to `original_size`, in percent.
    ///
    /// Negative values mean the output is smaller.
    pub fn compression_delta(&self, original_size: u64) -> f64 {
        compression_delta(original_size, self.size())
    }
}

/// Signed percentage change from `original` to `output` bytes.
pub fn compression_delta(original: u64, output: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (output as f64 - original as f64) / original as f64 * 100.0
}

/// Effective quality for `format`, or `None` when the format is lossless.
///
/// Lossy requests are clamped to `[floor, 1.0]`; non-finite requests use the floor.
pub fn effective_quality(format: OutputFormat, requested: f32, floor: f32) -> Option<f32> {
    if !format.is_lossy() {
        return None;
    }
    if !requested.is_finite() {
        return Some(floor);
    }
    Some(requested.clamp(floor, 1.0))
}

/// Composite RGBA pixels over an opaque background colour.
pub fn flatten(image: &RgbaImage, background: [u8; 3]) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = RgbImage::new(width, height);
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as f32 / 255.0;
        let mut px = [0u8; 3];
        for c in 0..3 {
            let blended = src[c] as f32 * alpha + background[c] as f32 * (1.0 - alpha);
            px[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        *dst = Rgb(px);
    }
    out
}

/// Encodes rasters into output bytes.
pub struct FormatEncoder {
    config: EncodeConfig,
}

impl FormatEncoder {
    /// Create a new encoder with the given policy.
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    /// Resolve the output format for a raster.
    ///
    /// Without an explicit target, the source format is kept when this build
    /// can encode it; otherwise PNG is used.
    pub fn resolve_format(&self, image: &RasterImage, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or_else(|| {
            OutputFormat::from_image_format(image.format)
                .filter(|f| f.is_encodable())
                .unwrap_or(OutputFormat::Png)
        })
    }

    /// Encode `image` according to `options`.
    pub fn convert(&self, image: &RasterImage, options: &EncodeOptions) -> ProcessResult<EncodedImage> {
        let format = self.resolve_format(image, options.format);
        if !format.is_encodable() {
            return Err(ProcessError::UnsupportedFormat {
                format: format.to_string(),
            });
        }

        let keep_alpha =
            image.has_alpha() && options.preserve_transparency && format.supports_alpha();
        let pixels = if keep_alpha {
            DynamicImage::ImageRgba8(image.pixels.to_rgba8())
        } else if image.has_alpha() {
            DynamicImage::ImageRgb8(flatten(&image.pixels.to_rgba8(), self.config.background))
        } else {
            DynamicImage::ImageRgb8(image.pixels.to_rgb8())
        };

        let mut buffer = Cursor::new(Vec::new());
        let result = match effective_quality(format, options.quality, self.config.lossy_quality_floor) {
            Some(quality) => {
                let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
                tracing::trace!("Encoding {format} at quality {q}");
                pixels.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, q))
            }
            None => pixels.write_to(&mut buffer, format.image_format()),
        };
        result.map_err(|e| ProcessError::EncodeFailure {
            format: format.to_string(),
            message: e.to_string(),
        })?;

        let bytes = buffer.into_inner();
        if bytes.is_empty() {
            return Err(ProcessError::EncodeFailure {
                format: format.to_string(),
                message: "encoder produced no output".to_string(),
            });
        }

        Ok(EncodedImage {
            bytes,
            format,
            width: pixels.width(),
            height: pixels.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::pipeline::decode::RasterDecoder;
    use image::Rgba;

    fn raster(pixels: DynamicImage, format: ImageFormat) -> RasterImage {
        RasterImage::new(pixels, format)
    }

    fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 13 % 256) as u8, (y * 7 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(OutputFormat::parse("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse(".png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("tif"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::parse("heic"), None);
    }

    #[test]
    fn test_quality_floor_applies_to_lossy_only() {
        assert_eq!(effective_quality(OutputFormat::Jpeg, 0.3, 0.6), Some(0.6));
        assert_eq!(effective_quality(OutputFormat::Jpeg, 0.9, 0.6), Some(0.9));
        assert_eq!(effective_quality(OutputFormat::Jpeg, 4.0, 0.6), Some(1.0));
        assert_eq!(effective_quality(OutputFormat::Jpeg, f32::NAN, 0.6), Some(0.6));
        assert_eq!(effective_quality(OutputFormat::Png, 0.3, 0.6), None);
    }

    #[test]
    fn test_compression_delta_sign() {
        assert_eq!(compression_delta(1000, 250), -75.0);
        assert_eq!(compression_delta(1000, 1500), 50.0);
        assert_eq!(compression_delta(0, 10), 0.0);
    }

    #[test]
    fn test_flatten_onto_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten(&img, [255, 255, 255]);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let source = gradient_rgba(17, 9);
        let mut alpha_source = source.clone();
        alpha_source.put_pixel(3, 3, Rgba([1, 2, 3, 40]));
        let image = raster(DynamicImage::ImageRgba8(alpha_source.clone()), ImageFormat::Png);

        let encoded = encoder
            .convert(
                &image,
                &EncodeOptions {
                    format: Some(OutputFormat::Png),
                    ..EncodeOptions::default()
                },
            )
            .unwrap();
        let decoded = RasterDecoder::new(LimitsConfig::default())
            .decode(&encoded.bytes, "out.png")
            .unwrap();
        assert_eq!(decoded.pixels.to_rgba8(), alpha_source);
    }

    #[test]
    fn test_pixel_exact_formats_round_trip() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let source = DynamicImage::ImageRgba8(gradient_rgba(33, 21)).to_rgb8();
        let image = raster(DynamicImage::ImageRgb8(source.clone()), ImageFormat::Png);
        let decoder = RasterDecoder::new(LimitsConfig::default());

        for format in [OutputFormat::Png, OutputFormat::WebP, OutputFormat::Bmp, OutputFormat::Tiff] {
            assert!(format.is_pixel_exact());
            let encoded = encoder
                .convert(
                    &image,
                    &EncodeOptions {
                        format: Some(format),
                        ..EncodeOptions::default()
                    },
                )
                .unwrap();
            let decoded = decoder
                .decode(&encoded.bytes, &format!("out.{}", format.extension()))
                .unwrap();
            assert_eq!(decoded.pixels.to_rgb8(), source, "{format} changed pixels");
        }
    }

    #[test]
    fn test_gif_is_palette_reduced() {
        assert!(!OutputFormat::Gif.is_pixel_exact());
        assert!(!OutputFormat::Gif.is_lossy());
        assert!(!OutputFormat::Jpeg.is_pixel_exact());

        // More distinct colours than a GIF palette holds.
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let source = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8]));
        let image = raster(DynamicImage::ImageRgb8(source.clone()), ImageFormat::Png);
        let encoded = encoder
            .convert(
                &image,
                &EncodeOptions {
                    format: Some(OutputFormat::Gif),
                    ..EncodeOptions::default()
                },
            )
            .unwrap();
        assert_eq!(&encoded.bytes[..3], b"GIF");
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (64, 64));
        assert_ne!(decoded, source);
    }

    #[test]
    fn test_jpeg_flattens_transparency() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let image = raster(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]))),
            ImageFormat::Png,
        );
        let encoded = encoder
            .convert(
                &image,
                &EncodeOptions {
                    format: Some(OutputFormat::Jpeg),
                    quality: 0.95,
                    preserve_transparency: true,
                },
            )
            .unwrap();
        assert_eq!(&encoded.bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgb8();
        let px = decoded.get_pixel(4, 4);
        assert!(px.0.iter().all(|&c| c > 245), "expected white, got {px:?}");
    }

    #[test]
    fn test_avif_is_unsupported() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let image = raster(DynamicImage::new_rgb8(4, 4), ImageFormat::Png);
        let err = encoder
            .convert(
                &image,
                &EncodeOptions {
                    format: Some(OutputFormat::Avif),
                    ..EncodeOptions::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }

    #[test]
    fn test_source_format_kept_when_unspecified() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let image = raster(DynamicImage::new_rgb8(4, 4), ImageFormat::Jpeg);
        assert_eq!(encoder.resolve_format(&image, None), OutputFormat::Jpeg);

        let avif = raster(DynamicImage::new_rgb8(4, 4), ImageFormat::Avif);
        assert_eq!(encoder.resolve_format(&avif, None), OutputFormat::Png);
    }

    #[test]
    fn test_lower_jpeg_quality_is_floored() {
        let encoder = FormatEncoder::new(EncodeConfig::default());
        let image = raster(DynamicImage::ImageRgba8(gradient_rgba(64, 64)), ImageFormat::Png);
        let at = |quality: f32| {
            encoder
                .convert(
                    &image,
                    &EncodeOptions {
                        format: Some(OutputFormat::Jpeg),
                        quality,
                        preserve_transparency: false,
                    },
                )
                .unwrap()
                .bytes
        };
        // Anything under the floor encodes exactly like the floor itself.
        assert_eq!(at(0.1), at(0.6));
    }
}
