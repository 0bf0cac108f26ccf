//! Image decoding with content sniffing and dimension limits.

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::{ProcessError, ProcessResult};

/// A decoded raster plus the facts later stages need about it.
///
/// Owned by whichever stage is currently working on it; dropped after
/// encoding or as soon as the item fails.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// The decoded pixel data
    pub pixels: DynamicImage,
    /// Format the bytes were decoded from
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl RasterImage {
    /// Wrap already-decoded pixels, keeping `format` as the source tag.
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            pixels,
            format,
            width,
            height,
        }
    }

    /// Replace the pixels after a transform, refreshing the dimensions.
    pub fn with_pixels(self, pixels: DynamicImage) -> Self {
        Self::new(pixels, self.format)
    }

    /// Channel layout and bit depth of the pixel buffer.
    pub fn color_type(&self) -> ColorType {
        self.pixels.color()
    }

    /// Whether the buffer carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.color_type().has_alpha()
    }
}

/// Image decoder with configurable limits.
pub struct RasterDecoder {
    limits: LimitsConfig,
}

impl RasterDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory buffer.
    ///
    /// The format is sniffed from the content; the name's extension is only
    /// used when sniffing fails.
    pub fn decode(&self, bytes: &[u8], name: &str) -> ProcessResult<RasterImage> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| {
                ProcessError::invalid_input(name, format!("Cannot detect image format: {e}"))
            })?;

        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(Path::new(name)).map_err(|_| {
                ProcessError::invalid_input(name, "Unrecognized image format")
            })?,
        };

        let pixels = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ProcessError::invalid_input(name, e.to_string()))?;

        let raster = RasterImage::new(pixels, format);
        if raster.width > self.limits.max_image_dimension
            || raster.height > self.limits.max_image_dimension
        {
            return Err(ProcessError::ImageTooLarge {
                name: name.to_string(),
                width: raster.width,
                height: raster.height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        tracing::trace!(
            "Decoded {name}: {}x{} {} ({:?})",
            raster.width,
            raster.height,
            format_to_string(raster.format),
            raster.color_type()
        );
        Ok(raster)
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Ico => "ico".to_string(),
        ImageFormat::Pnm => "pnm".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([10, 20, 30, 255]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_decode_sniffs_content_over_extension() {
        let decoder = RasterDecoder::new(LimitsConfig::default());
        let raster = decoder.decode(&png_bytes(8, 4), "misnamed.jpg").unwrap();
        assert_eq!(raster.format, ImageFormat::Png);
        assert_eq!((raster.width, raster.height), (8, 4));
        assert!(raster.has_alpha());
    }

    #[test]
    fn test_decode_corrupt_bytes_is_invalid_input() {
        let decoder = RasterDecoder::new(LimitsConfig::default());
        let mut bytes = png_bytes(8, 8);
        bytes.truncate(20);
        let err = decoder.decode(&bytes, "broken.png").unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_decode_garbage_is_invalid_input() {
        let decoder = RasterDecoder::new(LimitsConfig::default());
        let err = decoder.decode(b"not an image at all", "notes.txt").unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_decode_enforces_dimension_limit() {
        let decoder = RasterDecoder::new(LimitsConfig {
            max_image_dimension: 4,
            ..LimitsConfig::default()
        });
        let err = decoder.decode(&png_bytes(8, 2), "wide.png").unwrap_err();
        assert_eq!(err.kind(), "image_too_large");
    }
}
