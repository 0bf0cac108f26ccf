//! Error types for the Prism image processing engine.
//!
//! Errors are organized by concern so that every failure carries a stable,
//! human-readable kind. Batch reports and retry decisions downstream key off
//! [`ProcessError::kind`], not off the display message.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-image processing errors
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while processing a single image.
///
/// None of these are fatal to the host: the worst outcome is one batch item
/// marked failed.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Bytes could not be decoded as an image (corrupt, truncated, unknown)
    #[error("Invalid input {name}: {message}")]
    InvalidInput { name: String, message: String },

    /// Target format cannot be encoded on this build
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Requested output size is non-positive, non-finite or over the limit
    #[error("Invalid dimension: {message}")]
    DimensionError { message: String },

    /// Subject detection backend is missing or failed to load
    #[error("Subject detector unavailable: {message}")]
    DetectorUnavailable { message: String },

    /// Encoder ran but produced no usable output
    #[error("Encoding to {format} failed: {message}")]
    EncodeFailure { format: String, message: String },

    /// Source file exceeds the configured size gate
    #[error("File too large: {name} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        name: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Decoded image exceeds the configured dimension limit
    #[error("Image too large: {name} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Reading a source file failed
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the batch archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// The worker processing an item panicked or was cancelled by the runtime
    #[error("Worker for {name} failed: {message}")]
    WorkerFailed { name: String, message: String },
}

impl ProcessError {
    /// Stable machine-readable kind, e.g. `"invalid_input"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::DimensionError { .. } => "dimension_error",
            Self::DetectorUnavailable { .. } => "detector_unavailable",
            Self::EncodeFailure { .. } => "encode_failure",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::Io { .. } => "io",
            Self::Archive(_) => "archive",
            Self::WorkerFailed { .. } => "worker_failed",
        }
    }

    /// Whether the pipeline can continue with a degraded result.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DetectorUnavailable { .. })
    }

    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        Self::DimensionError {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for per-image processing results.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            ProcessError::invalid_input("a.jpg", "bad"),
            ProcessError::UnsupportedFormat {
                format: "avif".into(),
            },
            ProcessError::dimension("zero"),
            ProcessError::DetectorUnavailable {
                message: "no model".into(),
            },
            ProcessError::EncodeFailure {
                format: "jpeg".into(),
                message: "empty".into(),
            },
            ProcessError::WorkerFailed {
                name: "a.jpg".into(),
                message: "panicked".into(),
            },
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_only_detector_unavailable_is_recoverable() {
        assert!(ProcessError::DetectorUnavailable {
            message: "x".into()
        }
        .is_recoverable());
        assert!(!ProcessError::dimension("x").is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ProcessError::FileTooLarge {
            name: "huge.png".into(),
            size_mb: 120,
            max_mb: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("huge.png"));
        assert!(msg.contains("120MB"));
    }
}
