//! Region extraction with optional elliptical alpha mask.

use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};

use super::area::CropArea;
use crate::error::ProcessResult;
use crate::pipeline::RasterImage;

/// Output shape of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropShape {
    #[default]
    Rectangle,
    /// Equal radii from the smaller side, centred in the crop box
    Circle,
    /// Ellipse inscribed in the crop box
    Oval,
}

impl CropShape {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rectangle" | "rect" | "square" => Some(Self::Rectangle),
            "circle" | "round" => Some(Self::Circle),
            "oval" | "ellipse" => Some(Self::Oval),
            _ => None,
        }
    }

    /// Whether the shape leaves transparent pixels behind.
    pub fn needs_alpha(self) -> bool {
        !matches!(self, Self::Rectangle)
    }
}

/// Cut `area` out of `image`, masking to `shape`.
///
/// Rectangles keep the source color type. Circles and ovals produce RGBA
/// with alpha 0 outside the ellipse; a pixel is inside when its centre is.
pub fn apply_crop_shape(image: RasterImage, area: &CropArea, shape: CropShape) -> ProcessResult<RasterImage> {
    let (x, y, w, h) = area.to_pixel_rect(image.width, image.height)?;
    let region = image.pixels.crop_imm(x, y, w, h);

    let pixels = match shape {
        CropShape::Rectangle => region,
        CropShape::Circle | CropShape::Oval => {
            let (rx, ry) = match shape {
                CropShape::Circle => {
                    let r = w.min(h) as f64 / 2.0;
                    (r, r)
                }
                _ => (w as f64 / 2.0, h as f64 / 2.0),
            };
            let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
            let mut rgba = region.to_rgba8();
            for (px, py, pixel) in rgba.enumerate_pixels_mut() {
                let dx = (px as f64 + 0.5 - cx) / rx;
                let dy = (py as f64 + 0.5 - cy) / ry;
                if dx * dx + dy * dy > 1.0 {
                    *pixel = Rgba([pixel[0], pixel[1], pixel[2], 0]);
                }
            }
            DynamicImage::ImageRgba8(rgba)
        }
    };

    tracing::trace!("Cropped {}x{} region at ({}, {}) as {:?}", w, h, x, y, shape);
    Ok(image.with_pixels(pixels))
}
