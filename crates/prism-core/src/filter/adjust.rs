//! Parametric adjustments.
//!
//! Sepia, brightness, contrast, saturation and hue rotation are composed into
//! one affine color matrix (CSS filter semantics, applied in that order) and
//! run in a single pass. Blur, sharpen and vignette follow as separate passes.

use image::{Rgba, RgbaImage};

use super::FilterConfig;
use crate::math::to_u8;

/// 3×4 affine transform on RGB in 0-255 space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix([[f32; 4]; 3]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ]);

    /// `amount` in [0, 1].
    pub fn sepia(amount: f32) -> Self {
        let k = 1.0 - amount.clamp(0.0, 1.0);
        ColorMatrix([
            [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k, 0.0],
            [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k, 0.0],
            [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k, 0.0],
        ])
    }

    /// Multiplier; 1.0 is neutral.
    pub fn brightness(factor: f32) -> Self {
        Self::scale(factor, 0.0)
    }

    /// Multiplier around mid-gray; 1.0 is neutral.
    pub fn contrast(factor: f32) -> Self {
        Self::scale(factor, (0.5 - 0.5 * factor) * 255.0)
    }

    /// Multiplier; 0 is grayscale, 1.0 is neutral.
    pub fn saturate(s: f32) -> Self {
        ColorMatrix([
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0],
        ])
    }

    pub fn hue_rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        ColorMatrix([
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
                0.0,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
                0.0,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
                0.0,
            ],
        ])
    }

    fn scale(factor: f32, offset: f32) -> Self {
        ColorMatrix([
            [factor, 0.0, 0.0, offset],
            [0.0, factor, 0.0, offset],
            [0.0, 0.0, factor, offset],
        ])
    }

    /// Compose: the result applies `self` first, then `next`.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let (a, b) = (&next.0, &self.0);
        let mut out = [[0.0f32; 4]; 3];
        for i in 0..3 {
            for j in 0..4 {
                let mut v = (0..3).map(|k| a[i][k] * b[k][j]).sum::<f32>();
                if j == 3 {
                    v += a[i][3];
                }
                out[i][j] = v;
            }
        }
        ColorMatrix(out)
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0f32; 3];
        for (i, row) in m.iter().enumerate() {
            out[i] = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2] + row[3];
        }
        out
    }

    /// Matrix for the color part of `config`.
    pub fn from_config(config: &FilterConfig) -> Self {
        ColorMatrix::sepia(config.sepia / 100.0)
            .then(&ColorMatrix::brightness(config.brightness / 100.0))
            .then(&ColorMatrix::contrast(config.contrast / 100.0))
            .then(&ColorMatrix::saturate(config.saturation / 100.0))
            .then(&ColorMatrix::hue_rotate(config.hue))
    }
}

/// Apply every parametric adjustment in `config` (already intensity-scaled).
pub fn apply_adjustments(image: &RgbaImage, config: &FilterConfig) -> RgbaImage {
    let matrix = ColorMatrix::from_config(config);
    let mut out = if matrix == ColorMatrix::IDENTITY {
        image.clone()
    } else {
        apply_matrix(image, &matrix)
    };

    if config.blur > 0.0 {
        out = image::imageops::blur(&out, config.blur);
    }
    if config.sharpen > 0.0 {
        out = unsharp_mask(&out, config.sharpen / 100.0 * 1.5, 1.0);
    }
    if config.vignette > 0.0 {
        vignette(&mut out, config.vignette / 100.0);
    }
    out
}

fn apply_matrix(image: &RgbaImage, matrix: &ColorMatrix) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [nr, ng, nb] = matrix.apply([r as f32, g as f32, b as f32]);
        *pixel = Rgba([to_u8(nr), to_u8(ng), to_u8(nb), a]);
    }
    out
}

/// Unsharp mask: `src + amount × (src − blurred)` on color channels.
fn unsharp_mask(image: &RgbaImage, amount: f32, sigma: f32) -> RgbaImage {
    let blurred = image::imageops::blur(image, sigma);
    let mut out = image.clone();
    for (dst, soft) in out.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let s = dst[c] as f32;
            dst[c] = to_u8(s + amount * (s - soft[c] as f32));
        }
    }
    out
}

/// Darken toward the corners; `strength` in [0, 1].
fn vignette(image: &mut RgbaImage, strength: f32) {
    let (w, h) = image.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let max_dist = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let d = (dx * dx + dy * dy).sqrt() / max_dist;
        let factor = 1.0 - strength * d * d;
        for c in 0..3 {
            pixel[c] = to_u8(pixel[c] as f32 * factor);
        }
    }
}
