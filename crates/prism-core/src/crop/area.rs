//! Crop rectangles and aspect ratios.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, ProcessResult};

/// A rectangle in source pixel coordinates.
///
/// Planner output is always passed through [`CropArea::clamp_to`], which is
/// also what manual adjustments go through, so every crop that reaches the
/// shape applier lies inside its image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl CropArea {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole `width × height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Overlapping area with `other` (0 when disjoint or only touching).
    pub fn intersection_area(&self, other: &CropArea) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Whether the two rectangles share a positive area.
    pub fn intersects(&self, other: &CropArea) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &CropArea) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection over union.
    pub fn iou(&self, other: &CropArea) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &CropArea) -> CropArea {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        CropArea::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `fraction` of the size on every side.
    pub fn expanded(&self, fraction: f64) -> CropArea {
        let dx = self.width * fraction;
        let dy = self.height * fraction;
        CropArea::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }

    /// Shift by `(dx, dy)` without clamping.
    pub fn translated(&self, dx: f64, dy: f64) -> CropArea {
        CropArea::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Clamp into `[0, width] × [0, height]`.
    ///
    /// Oversized rectangles shrink to the image; out-of-bounds positions are
    /// shifted back inside. Non-finite values are treated as 0. Applying the
    /// clamp twice gives the same result as applying it once.
    pub fn clamp_to(&self, width: u32, height: u32) -> CropArea {
        let (bw, bh) = (width as f64, height as f64);
        let w = finite_or_zero(self.width).clamp(0.0, bw);
        let h = finite_or_zero(self.height).clamp(0.0, bh);
        let x = finite_or_zero(self.x).clamp(0.0, bw - w);
        let y = finite_or_zero(self.y).clamp(0.0, bh - h);
        CropArea::new(x, y, w, h)
    }

    /// Whether the rectangle already lies inside a `width × height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width >= 0.0
            && self.height >= 0.0
            && self.right() <= width as f64
            && self.bottom() <= height as f64
    }

    /// Integer pixel rectangle `(x, y, w, h)` for cropping, after clamping.
    ///
    /// The size is rounded first (never below one pixel) and the origin is
    /// then pulled back so the rectangle stays inside the image. Only a
    /// zero-area rectangle or image is rejected.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> ProcessResult<(u32, u32, u32, u32)> {
        let clamped = self.clamp_to(width, height);
        if width == 0 || height == 0 || clamped.width <= 0.0 || clamped.height <= 0.0 {
            return Err(ProcessError::dimension(format!(
                "crop area {:.1}x{:.1} is empty after clamping to {width}x{height}",
                clamped.width, clamped.height
            )));
        }
        let w = (clamped.width.round() as u32).clamp(1, width);
        let h = (clamped.height.round() as u32).clamp(1, height);
        let x0 = (clamped.x.round() as u32).min(width - w);
        let y0 = (clamped.y.round() as u32).min(height - h);
        Ok((x0, y0, w, h))
    }
}

/// Requested crop proportions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    /// No constraint
    #[default]
    Free,
    /// Same proportions as the source image
    Original,
    /// Width divided by height
    Ratio(f64),
}

impl AspectRatio {
    /// Parse `"16:9"`, `"4/3"`, `"1.5"`, `"free"` or `"original"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "" | "free" | "none" => return Some(Self::Free),
            "original" | "source" => return Some(Self::Original),
            _ => {}
        }
        let value = match s.split_once([':', '/', 'x']) {
            Some((w, h)) => {
                let w: f64 = w.trim().parse().ok()?;
                let h: f64 = h.trim().parse().ok()?;
                w / h
            }
            None => s.parse().ok()?,
        };
        (value.is_finite() && value > 0.0).then_some(Self::Ratio(value))
    }

    /// Width/height ratio for a `width × height` source, if constrained.
    pub fn resolve(self, width: u32, height: u32) -> Option<f64> {
        match self {
            Self::Free => None,
            Self::Original if height > 0 => Some(width as f64 / height as f64),
            Self::Original => None,
            Self::Ratio(r) => Some(r),
        }
    }
}
