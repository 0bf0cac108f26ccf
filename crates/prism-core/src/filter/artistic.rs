//! Neighbourhood-based artistic effects operating on RGBA buffers.
//!
//! All effects keep the alpha channel untouched. Only the oil-painting jitter
//! draws randomness, and it does so from the caller's generator.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{luminance, to_u8};

/// Algorithmic effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtisticEffect {
    OilPainting,
    Watercolor,
    Sketch,
}

impl ArtisticEffect {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "oil_painting" | "oil" => Some(Self::OilPainting),
            "watercolor" | "watercolour" => Some(Self::Watercolor),
            "sketch" | "pencil" => Some(Self::Sketch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OilPainting => "oil_painting",
            Self::Watercolor => "watercolor",
            Self::Sketch => "sketch",
        }
    }
}

const OIL_MAX_TILE: f32 = 12.0;
const OIL_BASE_BUCKETS: u32 = 4;
const OIL_EXTRA_BUCKETS: f32 = 12.0;

/// Oil painting.
///
/// The image is split into square tiles (side grows with intensity). Every
/// pixel in a tile is quantized per channel into `buckets` levels and the
/// tile is painted with its most frequent quantized color, ties going to the
/// color seen first. Each painted pixel then gets up to
/// `±intensity/100 × max_jitter` of noise per channel. Intensity 0 returns
/// the input unchanged and draws nothing from `rng`.
pub fn oil_painting<R: Rng>(
    image: &RgbaImage,
    intensity: f32,
    max_jitter: u8,
    rng: &mut R,
) -> RgbaImage {
    let t = (intensity / 100.0).clamp(0.0, 1.0);
    if t <= 0.0 {
        return image.clone();
    }

    let tile = ((t * OIL_MAX_TILE).round() as u32).max(2);
    let buckets = OIL_BASE_BUCKETS + (t * OIL_EXTRA_BUCKETS).round() as u32;
    let jitter = (t * max_jitter as f32).round() as i32;
    let (w, h) = image.dimensions();
    let mut out = image.clone();

    let quantize = |c: u8| (c as u32 * buckets / 256) as u8;
    let level = |q: u8| {
        let step = 256.0 / buckets as f32;
        ((q as f32 + 0.5) * step).min(255.0)
    };

    for ty in (0..h).step_by(tile as usize) {
        for tx in (0..w).step_by(tile as usize) {
            let (x_end, y_end) = ((tx + tile).min(w), (ty + tile).min(h));

            // key -> (count, first seen order)
            let mut counts: HashMap<[u8; 3], (u32, u32)> = HashMap::new();
            let mut order = 0u32;
            for y in ty..y_end {
                for x in tx..x_end {
                    let p = image.get_pixel(x, y);
                    let key = [quantize(p[0]), quantize(p[1]), quantize(p[2])];
                    let entry = counts.entry(key).or_insert((0, order));
                    entry.0 += 1;
                    order += 1;
                }
            }
            let Some((dominant, _)) = counts
                .iter()
                .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
            else {
                continue;
            };
            let base = [level(dominant[0]), level(dominant[1]), level(dominant[2])];

            for y in ty..y_end {
                for x in tx..x_end {
                    let alpha = image.get_pixel(x, y)[3];
                    let mut px = [0u8; 4];
                    for c in 0..3 {
                        let noise = if jitter > 0 {
                            rng.gen_range(-jitter..=jitter) as f32
                        } else {
                            0.0
                        };
                        px[c] = to_u8(base[c] + noise);
                    }
                    px[3] = alpha;
                    out.put_pixel(x, y, Rgba(px));
                }
            }
        }
    }
    out
}

/// Watercolor: two passes of a distance-weighted blur, then a saturation
/// boost of `1 + intensity/100 × saturation` pushing channels away from gray.
pub fn watercolor(image: &RgbaImage, intensity: f32, saturation: f32) -> RgbaImage {
    let t = (intensity / 100.0).clamp(0.0, 1.0);
    if t <= 0.0 {
        return image.clone();
    }
    let radius = 1 + (t * 2.0).round() as i32;
    let kernel = distance_kernel(radius);

    let mut out = weighted_blur(image, radius, &kernel);
    out = weighted_blur(&out, radius, &kernel);

    let factor = 1.0 + t * saturation;
    for pixel in out.pixels_mut() {
        let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
        let gray = luminance(r, g, b);
        pixel[0] = to_u8(gray + (r - gray) * factor);
        pixel[1] = to_u8(gray + (g - gray) * factor);
        pixel[2] = to_u8(gray + (b - gray) * factor);
    }
    out
}

/// Weights `1 / (1 + d)` over a `(2r+1)²` window, row-major.
fn distance_kernel(radius: i32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            kernel.push(1.0 / (1.0 + d));
        }
    }
    kernel
}

fn weighted_blur(image: &RgbaImage, radius: i32, kernel: &[f32]) -> RgbaImage {
    let (w, h) = image.dimensions();
    let (max_x, max_y) = (w as i32 - 1, h as i32 - 1);
    let mut out = image.clone();
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut acc = [0.0f32; 3];
            let mut total = 0.0f32;
            let mut k = 0;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sx = (x + dx).clamp(0, max_x) as u32;
                    let sy = (y + dy).clamp(0, max_y) as u32;
                    let p = image.get_pixel(sx, sy);
                    let weight = kernel[k];
                    k += 1;
                    acc[0] += p[0] as f32 * weight;
                    acc[1] += p[1] as f32 * weight;
                    acc[2] += p[2] as f32 * weight;
                    total += weight;
                }
            }
            let dst = out.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                dst[c] = to_u8(acc[c] / total);
            }
        }
    }
    out
}

/// Row-major offset of `(x, y)` in a buffer `width` pixels wide.
fn pixel_index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Pencil sketch: Sobel gradient magnitude of the luminance, scaled by
/// intensity and inverted so edges are dark on white. Output is gray.
pub fn sketch(image: &RgbaImage, intensity: f32) -> RgbaImage {
    let t = (intensity / 100.0).clamp(0.0, 1.0);
    let (w, h) = image.dimensions();
    let gray: Vec<f32> = image
        .pixels()
        .map(|p| luminance(p[0] as f32, p[1] as f32, p[2] as f32))
        .collect();
    let (max_x, max_y) = (w as i32 - 1, h as i32 - 1);
    let at = |x: i32, y: i32| gray[pixel_index(x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32, w)];

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (x, y) = (x as i32, y as i32);
        let gx = -at(x - 1, y - 1) - 2.0 * at(x - 1, y) - at(x - 1, y + 1)
            + at(x + 1, y - 1)
            + 2.0 * at(x + 1, y)
            + at(x + 1, y + 1);
        let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
            + at(x - 1, y + 1)
            + 2.0 * at(x, y + 1)
            + at(x + 1, y + 1);
        let magnitude = (gx * gx + gy * gy).sqrt() * t;
        let v = to_u8(255.0 - magnitude.clamp(0.0, 255.0));
        *pixel = Rgba([v, v, v, pixel[3]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noisy(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 37 + y * 11) as u8,
                (x * 5 + y * 61) as u8,
                (x * y) as u8,
                (200 + x % 50) as u8,
            ])
        })
    }

    #[test]
    fn test_oil_painting_zero_intensity_is_identity() {
        let img = noisy(31, 17);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(oil_painting(&img, 0.0, 12, &mut rng), img);
    }

    #[test]
    fn test_oil_painting_is_deterministic_per_seed() {
        let img = noisy(40, 30);
        let a = oil_painting(&img, 70.0, 12, &mut StdRng::seed_from_u64(9));
        let b = oil_painting(&img, 70.0, 12, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_ne!(a, img);
    }

    #[test]
    fn test_oil_painting_without_jitter_flattens_tiles() {
        let img = noisy(24, 24);
        let out = oil_painting(&img, 100.0, 0, &mut StdRng::seed_from_u64(0));
        // Tile side is 12 at full intensity.
        let first = out.get_pixel(0, 0);
        for y in 0..12 {
            for x in 0..12 {
                let p = out.get_pixel(x, y);
                assert_eq!(&p.0[..3], &first.0[..3]);
                assert_eq!(p[3], img.get_pixel(x, y)[3]);
            }
        }
    }

    #[test]
    fn test_oil_painting_ties_take_first_color() {
        // A 2×2 tile with four distinct colors: the top-left one wins.
        let img = RgbaImage::from_fn(2, 2, |x, y| match (x, y) {
            (0, 0) => Rgba([0, 0, 0, 255]),
            (1, 0) => Rgba([255, 0, 0, 255]),
            (0, 1) => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let out = oil_painting(&img, 10.0, 0, &mut StdRng::seed_from_u64(0));
        // 5 buckets at 10%: bucket 0 maps to level 25.6
        for p in out.pixels() {
            assert_eq!(&p.0[..3], &[26, 26, 26]);
        }
    }

    #[test]
    fn test_sketch_is_gray() {
        let out = sketch(&noisy(25, 19), 80.0);
        for p in out.pixels() {
            assert!(p[0] == p[1] && p[1] == p[2]);
        }
    }

    #[test]
    fn test_sketch_flat_image_is_white() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([90, 140, 30, 255]));
        for p in sketch(&img, 100.0).pixels() {
            assert_eq!(p.0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn test_sketch_marks_edges_dark() {
        let img = RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let out = sketch(&img, 100.0);
        assert_eq!(out.get_pixel(4, 5)[0], 0);
        assert_eq!(out.get_pixel(0, 5)[0], 255);
    }

    #[test]
    fn test_sketch_indexes_rows_of_wide_images() {
        let img = RgbaImage::from_fn(70_000, 2, |x, _| {
            if x < 69_990 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let out = sketch(&img, 100.0);
        assert_eq!(out.get_pixel(69_989, 1)[0], 0);
        assert_eq!(out.get_pixel(10, 1)[0], 255);
        assert_eq!(out.get_pixel(69_999, 0)[0], 255);
    }

    #[test]
    fn test_pixel_index_past_u32_range() {
        assert_eq!(pixel_index(3, 2, 10), 23);
        assert_eq!(pixel_index(69_999, 69_999, 70_000), 4_899_999_999);
    }

    #[test]
    fn test_watercolor_is_deterministic_and_keeps_alpha() {
        let img = noisy(20, 20);
        let a = watercolor(&img, 60.0, 0.5);
        let b = watercolor(&img, 60.0, 0.5);
        assert_eq!(a, b);
        for (src, dst) in img.pixels().zip(a.pixels()) {
            assert_eq!(src[3], dst[3]);
        }
    }

    #[test]
    fn test_watercolor_keeps_flat_gray() {
        let img = RgbaImage::from_pixel(6, 6, Rgba([120, 120, 120, 255]));
        assert_eq!(watercolor(&img, 100.0, 0.5), img);
    }

    #[test]
    fn test_kernel_weights() {
        let kernel = distance_kernel(1);
        assert_eq!(kernel.len(), 9);
        assert_eq!(kernel[4], 1.0);
        assert!((kernel[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_effect() {
        assert_eq!(ArtisticEffect::parse("oil-painting"), Some(ArtisticEffect::OilPainting));
        assert_eq!(ArtisticEffect::parse("Watercolor"), Some(ArtisticEffect::Watercolor));
        assert_eq!(ArtisticEffect::parse("sketch"), Some(ArtisticEffect::Sketch));
        assert_eq!(ArtisticEffect::parse("mosaic"), None);
    }
}
