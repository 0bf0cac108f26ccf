//! Target-size computation and resampling.
//!
//! Dimension math is kept in [`target_dimensions`] (pure, unit testable);
//! [`resize`] applies it to a raster.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::RasterImage;

/// Resampling quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeQuality {
    /// Nearest neighbour
    Fast,
    /// Bilinear (area-weighted when shrinking)
    Balanced,
    /// Lanczos3
    #[default]
    High,
}

impl ResizeQuality {
    /// Parse a quality name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast" | "low" => Some(Self::Fast),
            "balanced" | "medium" => Some(Self::Balanced),
            "high" | "best" => Some(Self::High),
            _ => None,
        }
    }

    fn filter(self) -> FilterType {
        match self {
            Self::Fast => FilterType::Nearest,
            Self::Balanced => FilterType::Triangle,
            Self::High => FilterType::Lanczos3,
        }
    }
}

/// Requested output size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeOptions {
    /// Target width in pixels
    pub width: Option<f64>,
    /// Target height in pixels
    pub height: Option<f64>,
    /// Uniform scale in percent; takes precedence over width/height
    pub percentage: Option<f64>,
    /// Derive or fit the missing dimension from the source aspect ratio
    pub maintain_aspect_ratio: bool,
    /// Resampling quality
    pub quality: ResizeQuality,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            percentage: None,
            maintain_aspect_ratio: true,
            quality: ResizeQuality::default(),
        }
    }
}

impl ResizeOptions {
    /// Scale both dimensions by `percentage` percent.
    pub fn percent(percentage: f64) -> Self {
        Self {
            percentage: Some(percentage),
            ..Self::default()
        }
    }

    /// Target an explicit box.
    pub fn exact(width: f64, height: f64, maintain_aspect_ratio: bool) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            maintain_aspect_ratio,
            ..Self::default()
        }
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn to_pixels(value: f64) -> u32 {
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

/// Compute output dimensions for a `src_w × src_h` source.
///
/// Rules, in order:
/// - `percentage` scales both sides by p/100.
/// - both sides given: exact, or the largest aspect-preserving fit inside the box.
/// - one side given: the other is derived from the source ratio, or kept as-is.
///
/// Results are rounded to the nearest pixel, never below 1.
pub fn target_dimensions(src_w: u32, src_h: u32, options: &ResizeOptions) -> ProcessResult<(u32, u32)> {
    if src_w == 0 || src_h == 0 {
        return Err(ProcessError::dimension("source image has no pixels"));
    }
    let (sw, sh) = (src_w as f64, src_h as f64);

    if let Some(p) = options.percentage {
        if !p.is_finite() || p <= 0.0 {
            return Err(ProcessError::dimension(format!(
                "percentage must be a positive number (got {p})"
            )));
        }
        return Ok((to_pixels(sw * p / 100.0), to_pixels(sh * p / 100.0)));
    }

    let dims = match (usable(options.width), usable(options.height)) {
        (None, None) => {
            return Err(ProcessError::dimension(format!(
                "width {:?} and height {:?} are not positive finite numbers",
                options.width, options.height
            )))
        }
        (Some(w), Some(h)) if options.maintain_aspect_ratio => {
            let scale = (w / sw).min(h / sh);
            (sw * scale, sh * scale)
        }
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if options.maintain_aspect_ratio => (w, w * sh / sw),
        (Some(w), None) => (w, sh),
        (None, Some(h)) if options.maintain_aspect_ratio => (h * sw / sh, h),
        (None, Some(h)) => (sw, h),
    };
    Ok((to_pixels(dims.0), to_pixels(dims.1)))
}

/// Resize a raster, returning the new raster and the achieved dimensions.
pub fn resize(
    image: RasterImage,
    options: &ResizeOptions,
    max_dimension: u32,
) -> ProcessResult<(RasterImage, (u32, u32))> {
    let (width, height) = target_dimensions(image.width, image.height, options)?;
    if width > max_dimension || height > max_dimension {
        return Err(ProcessError::dimension(format!(
            "{width}x{height} exceeds the {max_dimension}px limit"
        )));
    }
    if (width, height) == (image.width, image.height) {
        return Ok((image, (width, height)));
    }

    tracing::trace!(
        "Resizing {}x{} -> {}x{} ({:?})",
        image.width,
        image.height,
        width,
        height,
        options.quality
    );
    let pixels = image
        .pixels
        .resize_exact(width, height, options.quality.filter());
    Ok((image.with_pixels(pixels), (width, height)))
}
