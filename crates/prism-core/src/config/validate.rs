//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::geometry::ResizeQuality;
use crate::output::ReportFormat;

use super::Config;

/// Upper bound on concurrently decoded images.
pub const MAX_IN_FLIGHT: usize = 4;

/// Upper bound on `limits.max_file_size_mb` (4 GiB).
pub const MAX_FILE_SIZE_MB: u64 = 4096;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 || self.limits.max_file_size_mb > MAX_FILE_SIZE_MB {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_file_size_mb must be between 1 and {MAX_FILE_SIZE_MB}"
            )));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if ResizeQuality::parse(&self.resize.quality).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "resize.quality must be fast, balanced or high (got {:?})",
                self.resize.quality
            )));
        }
        if !(0.0..=1.0).contains(&self.encode.quality) {
            return Err(ConfigError::ValidationError(
                "encode.quality must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.encode.lossy_quality_floor) {
            return Err(ConfigError::ValidationError(
                "encode.lossy_quality_floor must be between 0.0 and 1.0".into(),
            ));
        }
        if self.crop.face_weight <= 0.0 || self.crop.object_weight <= 0.0 {
            return Err(ConfigError::ValidationError(
                "crop.face_weight and crop.object_weight must be > 0".into(),
            ));
        }
        if !(self.crop.fallback_fraction > 0.0 && self.crop.fallback_fraction <= 1.0) {
            return Err(ConfigError::ValidationError(
                "crop.fallback_fraction must be in (0.0, 1.0]".into(),
            ));
        }
        if self.crop.padding < 0.0 || self.crop.cluster_gap < 0.0 {
            return Err(ConfigError::ValidationError(
                "crop.padding and crop.cluster_gap must be >= 0".into(),
            ));
        }
        if self.batch.max_in_flight == 0 || self.batch.max_in_flight > MAX_IN_FLIGHT {
            return Err(ConfigError::ValidationError(format!(
                "batch.max_in_flight must be between 1 and {MAX_IN_FLIGHT}"
            )));
        }
        if !(0.0..=1.0).contains(&self.detector.score_threshold) {
            return Err(ConfigError::ValidationError(
                "detector.score_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(ConfigError::ValidationError(
                "detector.iou_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.filter.watercolor_saturation < 0.0 {
            return Err(ConfigError::ValidationError(
                "filter.watercolor_saturation must be >= 0".into(),
            ));
        }
        if ReportFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be json or jsonl (got {:?})",
                self.output.format
            )));
        }
        if !LOG_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(self.logging.level.trim())) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {} (got {:?})",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        if !LOG_FORMATS.iter().any(|f| f.eq_ignore_ascii_case(self.logging.format.trim())) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be pretty or json (got {:?})",
                self.logging.format
            )));
        }
        Ok(())
    }
}
