//! Filter engine: parametric adjustments and artistic effects.
//!
//! Filters are described as an ordered [`FilterPipeline`] of stages. A
//! request built from a preset and custom settings always yields the
//! preset's stages first and the custom stage last; callers that need a
//! different order build the pipeline themselves.

mod adjust;
mod artistic;
mod presets;

use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::FilterEngineConfig;
use crate::error::{ProcessError, ProcessResult};
use crate::math::toward;
use crate::pipeline::RasterImage;

pub use adjust::{apply_adjustments, ColorMatrix};
pub use artistic::{oil_painting, sketch, watercolor, ArtisticEffect};
pub use presets::{find_preset, presets, FilterPreset, PresetCategory};

/// Parametric filter settings.
///
/// Ranges: sepia 0-100, brightness/contrast/saturation 0-200 (100 is
/// neutral), hue -180 to 180 degrees, blur 0-20 px, sharpen 0-100,
/// vignette 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub sepia: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue: f32,
    pub blur: f32,
    pub sharpen: f32,
    pub vignette: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sepia: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            blur: 0.0,
            sharpen: 0.0,
            vignette: 0.0,
        }
    }
}

impl FilterConfig {
    fn ranges(&self) -> [(&'static str, f32, f32, f32); 8] {
        [
            ("sepia", self.sepia, 0.0, 100.0),
            ("brightness", self.brightness, 0.0, 200.0),
            ("contrast", self.contrast, 0.0, 200.0),
            ("saturation", self.saturation, 0.0, 200.0),
            ("hue", self.hue, -180.0, 180.0),
            ("blur", self.blur, 0.0, 20.0),
            ("sharpen", self.sharpen, 0.0, 100.0),
            ("vignette", self.vignette, 0.0, 100.0),
        ]
    }

    /// Check every parameter against its range.
    pub fn validate(&self) -> ProcessResult<()> {
        for (name, value, min, max) in self.ranges() {
            if !value.is_finite() || value < min || value > max {
                return Err(ProcessError::invalid_input(
                    "filter",
                    format!("{name} must be between {min} and {max} (got {value})"),
                ));
            }
        }
        Ok(())
    }

    /// Whether applying this config changes nothing.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// Scale every parameter's distance from neutral by `intensity / 100`.
    pub fn scaled(&self, intensity: f32) -> Self {
        let t = (intensity / 100.0).clamp(0.0, 1.0);
        let n = Self::default();
        Self {
            sepia: toward(n.sepia, self.sepia, t),
            brightness: toward(n.brightness, self.brightness, t),
            contrast: toward(n.contrast, self.contrast, t),
            saturation: toward(n.saturation, self.saturation, t),
            hue: toward(n.hue, self.hue, t),
            blur: toward(n.blur, self.blur, t),
            sharpen: toward(n.sharpen, self.sharpen, t),
            vignette: toward(n.vignette, self.vignette, t),
        }
    }
}

/// One step of a filter pipeline. Intensity is 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterStage {
    Adjust { config: FilterConfig, intensity: f32 },
    Artistic { effect: ArtisticEffect, intensity: f32 },
}

/// Ordered list of filter stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPipeline {
    stages: Vec<FilterStage>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: FilterStage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Preset stages, then the custom adjustment, both at `intensity`.
    pub fn from_parts(preset: Option<&FilterPreset>, custom: Option<FilterConfig>, intensity: f32) -> Self {
        let mut pipeline = Self::new();
        if let Some(preset) = preset {
            if !preset.config.is_neutral() {
                pipeline.push(FilterStage::Adjust {
                    config: preset.config,
                    intensity,
                });
            }
            if let Some(effect) = preset.effect {
                pipeline.push(FilterStage::Artistic { effect, intensity });
            }
        }
        if let Some(config) = custom.filter(|c| !c.is_neutral()) {
            pipeline.push(FilterStage::Adjust { config, intensity });
        }
        pipeline
    }
}

/// A filter request as callers express it: a preset id and/or custom settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    pub preset: Option<String>,
    pub custom: Option<FilterConfig>,
    /// Overall strength, 0-100
    pub intensity: f32,
}

impl Default for FilterRequest {
    fn default() -> Self {
        Self {
            preset: None,
            custom: None,
            intensity: 100.0,
        }
    }
}

impl FilterRequest {
    /// Resolve the preset and validate the request into a pipeline.
    pub fn to_pipeline(&self) -> ProcessResult<FilterPipeline> {
        if !self.intensity.is_finite() || !(0.0..=100.0).contains(&self.intensity) {
            return Err(ProcessError::invalid_input(
                "filter",
                format!("intensity must be between 0 and 100 (got {})", self.intensity),
            ));
        }
        let preset = match &self.preset {
            Some(id) => Some(find_preset(id).ok_or_else(|| {
                ProcessError::invalid_input("filter", format!("unknown preset '{id}'"))
            })?),
            None => None,
        };
        if let Some(custom) = &self.custom {
            custom.validate()?;
        }
        Ok(FilterPipeline::from_parts(preset.as_ref(), self.custom, self.intensity))
    }
}

/// Runs filter pipelines over rasters.
pub struct FilterEngine {
    config: FilterEngineConfig,
}

impl FilterEngine {
    pub fn new(config: FilterEngineConfig) -> Self {
        Self { config }
    }

    /// Apply `pipeline`, seeding oil-painting jitter from config (or entropy).
    pub fn apply(&self, image: RasterImage, pipeline: &FilterPipeline) -> RasterImage {
        let mut rng = match self.config.oil_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.apply_with_rng(image, pipeline, &mut rng)
    }

    /// Apply `pipeline` drawing all randomness from `rng`.
    pub fn apply_with_rng<R: Rng>(&self, image: RasterImage, pipeline: &FilterPipeline, rng: &mut R) -> RasterImage {
        if pipeline.is_empty() {
            return image;
        }
        let had_alpha = image.has_alpha();
        let mut buffer = image.pixels.to_rgba8();

        for stage in pipeline.stages() {
            let start = std::time::Instant::now();
            buffer = match stage {
                FilterStage::Adjust { config, intensity } => {
                    apply_adjustments(&buffer, &config.scaled(*intensity))
                }
                FilterStage::Artistic { effect, intensity } => match effect {
                    ArtisticEffect::OilPainting => {
                        oil_painting(&buffer, *intensity, self.config.oil_max_jitter, rng)
                    }
                    ArtisticEffect::Watercolor => {
                        watercolor(&buffer, *intensity, self.config.watercolor_saturation)
                    }
                    ArtisticEffect::Sketch => sketch(&buffer, *intensity),
                },
            };
            tracing::trace!("  Filter stage {:?} in {:?}", stage, start.elapsed());
        }

        let pixels = if had_alpha {
            DynamicImage::ImageRgba8(buffer)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(buffer).to_rgb8())
        };
        image.with_pixels(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn raster() -> RasterImage {
        RasterImage::new(
            DynamicImage::ImageRgb8(RgbImage::from_fn(16, 12, |x, y| {
                Rgb([(x * 15) as u8, (y * 20) as u8, 128])
            })),
            ImageFormat::Png,
        )
    }

    #[test]
    fn test_scaled_moves_toward_neutral() {
        let config = FilterConfig {
            brightness: 150.0,
            sepia: 80.0,
            hue: -90.0,
            ..FilterConfig::default()
        };
        let half = config.scaled(50.0);
        assert_eq!(half.brightness, 125.0);
        assert_eq!(half.sepia, 40.0);
        assert_eq!(half.hue, -45.0);
        assert!(config.scaled(0.0).is_neutral());
        assert_eq!(config.scaled(100.0), config);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(FilterConfig::default().validate().is_ok());
        let bad = FilterConfig {
            blur: 25.0,
            ..FilterConfig::default()
        };
        let err = bad.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("blur"));
    }

    #[test]
    fn test_preset_stages_come_before_custom() {
        let custom = FilterConfig {
            contrast: 130.0,
            ..FilterConfig::default()
        };
        let request = FilterRequest {
            preset: Some("sketch".into()),
            custom: Some(custom),
            intensity: 60.0,
        };
        let pipeline = request.to_pipeline().unwrap();
        assert_eq!(
            pipeline.stages(),
            &[
                FilterStage::Artistic {
                    effect: ArtisticEffect::Sketch,
                    intensity: 60.0
                },
                FilterStage::Adjust {
                    config: custom,
                    intensity: 60.0
                },
            ]
        );
    }

    #[test]
    fn test_unknown_preset_is_invalid_input() {
        let request = FilterRequest {
            preset: Some("lomo-x".into()),
            ..FilterRequest::default()
        };
        assert_eq!(request.to_pipeline().unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn test_intensity_out_of_range() {
        let request = FilterRequest {
            preset: Some("sepia".into()),
            intensity: 140.0,
            ..FilterRequest::default()
        };
        assert!(request.to_pipeline().is_err());
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let engine = FilterEngine::new(FilterEngineConfig::default());
        let image = raster();
        let out = engine.apply(image.clone(), &FilterPipeline::new());
        assert_eq!(out.pixels, image.pixels);
    }

    #[test]
    fn test_engine_keeps_color_type_and_size() {
        let engine = FilterEngine::new(FilterEngineConfig::default());
        let pipeline = FilterRequest {
            preset: Some("noir".into()),
            ..FilterRequest::default()
        }
        .to_pipeline()
        .unwrap();
        let out = engine.apply(raster(), &pipeline);
        assert_eq!((out.width, out.height), (16, 12));
        assert!(!out.has_alpha());
        let rgb = out.pixels.to_rgb8();
        for p in rgb.pixels() {
            assert!((p[0] as i32 - p[1] as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_seeded_engine_is_reproducible() {
        let engine = FilterEngine::new(FilterEngineConfig {
            oil_seed: Some(42),
            ..FilterEngineConfig::default()
        });
        let mut pipeline = FilterPipeline::new();
        pipeline.push(FilterStage::Artistic {
            effect: ArtisticEffect::OilPainting,
            intensity: 80.0,
        });
        let a = engine.apply(raster(), &pipeline);
        let b = engine.apply(raster(), &pipeline);
        assert_eq!(a.pixels, b.pixels);
    }
}
