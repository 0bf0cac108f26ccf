//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the detector model inside `{model_dir}/{detector.model}/`.
pub const DETECTOR_MODEL_FILENAME: &str = "model.onnx";

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where detector models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.prism/models"),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height), for inputs and outputs
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 16384,
        }
    }
}

/// Resize defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Resampling quality: "fast", "balanced" or "high"
    pub quality: String,

    /// Preserve aspect ratio unless told otherwise
    pub maintain_aspect_ratio: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            quality: "high".to_string(),
            maintain_aspect_ratio: true,
        }
    }
}

/// Encoder policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Default quality in [0, 1] for lossy formats
    pub quality: f32,

    /// Lowest quality a lossy encoder will accept; lower requests are raised
    pub lossy_quality_floor: f32,

    /// Background RGB used when flattening transparency
    pub background: [u8; 3],
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: 0.92,
            lossy_quality_floor: 0.6,
            background: [255, 255, 255],
        }
    }
}

/// Smart crop planner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Weight multiplier for face detections
    pub face_weight: f32,

    /// Weight multiplier for generic object detections
    pub object_weight: f32,

    /// Fallback box size as a fraction of the shorter image side
    pub fallback_fraction: f64,

    /// Padding around the subject cluster, as a fraction of its size
    pub padding: f64,

    /// Boxes are expanded by this fraction of their size before clustering
    pub cluster_gap: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            face_weight: 2.0,
            object_weight: 1.0,
            fallback_fraction: 0.8,
            padding: 0.5,
            cluster_gap: 0.5,
        }
    }
}

/// Filter engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterEngineConfig {
    /// Maximum per-pixel jitter (in 8-bit levels) for the oil-painting effect at full intensity
    pub oil_max_jitter: u8,

    /// Fixed seed for the oil-painting jitter; random per run when unset
    pub oil_seed: Option<u64>,

    /// Saturation boost of the watercolor effect at full intensity
    pub watercolor_saturation: f32,
}

impl Default for FilterEngineConfig {
    fn default() -> Self {
        Self {
            oil_max_jitter: 12,
            oil_seed: None,
            watercolor_saturation: 0.5,
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Images decoded concurrently (1 = strictly sequential)
    pub max_in_flight: usize,

    /// Copy the untouched originals into the archive
    pub include_originals: bool,

    /// File extensions picked up when a directory is given
    pub supported_formats: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            include_originals: false,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Subject detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Whether to load the ONNX face detector
    pub enabled: bool,

    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Minimum face score kept after inference
    pub score_threshold: f32,

    /// IoU above which overlapping faces are suppressed
    pub iou_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "ultraface-rfb-320".to_string(),
            score_threshold: 0.7,
            iou_threshold: 0.3,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default report format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
