//! Subject detection capability consumed by the smart crop planner.
//!
//! Detection is pluggable: the planner only sees the [`SubjectDetector`]
//! trait. Builds or hosts without an inference backend use
//! [`NullDetector`], which reports itself unavailable so the planner falls
//! back to its centred crop instead of failing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::detect::{load_detector, SubjectDetector};
//!
//! let detector = load_detector(&config);
//! let faces = detector.detect_faces(&raster)?;
//! ```

mod onnx;
mod preprocess;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::crop::CropArea;
use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::RasterImage;

pub use onnx::OnnxFaceDetector;

/// What a detection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Face,
    Object,
}

/// A face or object bounding box with its confidence.
///
/// Produced per image and consumed by the planner; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedSubject {
    /// Face or generic object
    pub kind: SubjectKind,
    /// Bounding box in source pixel coordinates
    pub bbox: CropArea,
    /// Class label for objects (e.g. "dog")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Confidence from 0.0 to 1.0
    pub score: f32,
}

impl DetectedSubject {
    /// Create a face detection.
    pub fn face(bbox: CropArea, score: f32) -> Self {
        Self {
            kind: SubjectKind::Face,
            bbox,
            class: None,
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Create an object detection with a class label.
    pub fn object(bbox: CropArea, class: impl Into<String>, score: f32) -> Self {
        Self {
            kind: SubjectKind::Object,
            bbox,
            class: Some(class.into()),
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Trait that all detection backends implement.
pub trait SubjectDetector: Send + Sync {
    /// Backend name for logging (e.g., "onnx-ultraface", "none").
    fn name(&self) -> &str;

    /// Whether the backend can run on this host.
    fn is_available(&self) -> bool;

    /// Detect faces in the image.
    fn detect_faces(&self, image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>>;

    /// Detect generic objects in the image.
    fn detect_objects(&self, image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>>;
}

/// Detector for hosts without an inference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl SubjectDetector for NullDetector {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn detect_faces(&self, _image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        Err(ProcessError::DetectorUnavailable {
            message: "no detection backend configured".to_string(),
        })
    }

    fn detect_objects(&self, _image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        Err(ProcessError::DetectorUnavailable {
            message: "no detection backend configured".to_string(),
        })
    }
}

/// Detector that replays detections computed elsewhere.
///
/// Lets a host with its own inference stack feed results into the planner.
#[derive(Debug, Default, Clone)]
pub struct PrecomputedDetector {
    subjects: Vec<DetectedSubject>,
}

impl PrecomputedDetector {
    pub fn new(subjects: Vec<DetectedSubject>) -> Self {
        Self { subjects }
    }
}

impl SubjectDetector for PrecomputedDetector {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn detect_faces(&self, _image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        Ok(self
            .subjects
            .iter()
            .filter(|s| s.kind == SubjectKind::Face)
            .cloned()
            .collect())
    }

    fn detect_objects(&self, _image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        Ok(self
            .subjects
            .iter()
            .filter(|s| s.kind == SubjectKind::Object)
            .cloned()
            .collect())
    }
}

/// Build the configured detector, degrading to [`NullDetector`].
///
/// A missing or unloadable model is logged, never returned as an error.
pub fn load_detector(config: &Config) -> Arc<dyn SubjectDetector> {
    if !config.detector.enabled {
        tracing::debug!("Subject detection disabled in config");
        return Arc::new(NullDetector);
    }

    let model_path = config.detector_model_path();
    if !model_path.exists() {
        tracing::debug!(
            "Face detector model not found at {:?}; smart crop will use the centred fallback",
            model_path
        );
        return Arc::new(NullDetector);
    }

    match OnnxFaceDetector::load(&model_path, &config.detector) {
        Ok(detector) => {
            tracing::info!("Face detector loaded from {:?}", model_path);
            Arc::new(detector)
        }
        Err(e) => {
            tracing::warn!("Failed to load face detector: {e}");
            Arc::new(NullDetector)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::path::PathBuf;

    fn blank() -> RasterImage {
        RasterImage::new(DynamicImage::new_rgb8(16, 16), ImageFormat::Png)
    }

    #[test]
    fn test_null_detector_is_unavailable() {
        let detector = NullDetector;
        assert!(!detector.is_available());
        let err = detector.detect_faces(&blank()).unwrap_err();
        assert_eq!(err.kind(), "detector_unavailable");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_precomputed_detector_splits_by_kind() {
        let detector = PrecomputedDetector::new(vec![
            DetectedSubject::face(CropArea::new(0.0, 0.0, 4.0, 4.0), 0.9),
            DetectedSubject::object(CropArea::new(5.0, 5.0, 4.0, 4.0), "dog", 0.6),
        ]);
        assert_eq!(detector.detect_faces(&blank()).unwrap().len(), 1);
        let objects = detector.detect_objects(&blank()).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].class.as_deref(), Some("dog"));
    }

    #[test]
    fn test_score_is_clamped() {
        let subject = DetectedSubject::face(CropArea::new(0.0, 0.0, 1.0, 1.0), 1.7);
        assert_eq!(subject.score, 1.0);
    }

    #[test]
    fn test_load_detector_without_model_degrades() {
        let mut config = Config::default();
        config.general.model_dir = PathBuf::from("/definitely/not/a/model/dir");
        let detector = load_detector(&config);
        assert!(!detector.is_available());
        assert_eq!(detector.name(), "none");
    }

    #[test]
    fn test_load_detector_disabled() {
        let mut config = Config::default();
        config.detector.enabled = false;
        assert!(!load_detector(&config).is_available());
    }
}
