//! Configuration management for Prism.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial (or missing)
//! file is always valid.

mod types;
mod validate;

pub use types::*;
pub use validate::{MAX_FILE_SIZE_MB, MAX_IN_FLIGHT};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Prism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Resize defaults
    pub resize: ResizeConfig,

    /// Encoder policy
    pub encode: EncodeConfig,

    /// Smart crop planner tuning
    pub crop: CropConfig,

    /// Filter engine tuning
    pub filter: FilterEngineConfig,

    /// Batch orchestration settings
    pub batch: BatchConfig,

    /// Subject detector settings
    pub detector: DetectorConfig,

    /// Report output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.prism.prism/config.toml
    /// - Linux: ~/.config/prism/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\prism\config\config.toml
    ///
    /// Falls back to ~/.prism/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "prism", "prism")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".prism").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Path of the face detector model inside the model directory.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir()
            .join(&self.detector.model)
            .join(DETECTOR_MODEL_FILENAME)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
