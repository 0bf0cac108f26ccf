//! ONNX Runtime face detector (UltraFace RFB-320 output layout).
//!
//! Produces `scores` \[1, N, 2\] (background, face) and `boxes` \[1, N, 4\]
//! with corners normalized to \[0, 1\]. Candidates above the score threshold
//! are de-duplicated with greedy non-maximum suppression.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use super::preprocess::preprocess;
use super::{DetectedSubject, SubjectDetector};
use crate::config::DetectorConfig;
use crate::crop::CropArea;
use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::RasterImage;

/// Wraps an ONNX Runtime session running a face detection model.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxFaceDetector {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    score_threshold: f32,
    iou_threshold: f32,
}

fn unavailable(message: String) -> ProcessError {
    ProcessError::DetectorUnavailable { message }
}

impl OnnxFaceDetector {
    /// Load a detector from an ONNX file.
    pub fn load(model_path: &Path, config: &DetectorConfig) -> ProcessResult<Self> {
        let session = Session::builder()
            .map_err(|e| unavailable(format!("Failed to create ONNX session builder: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| unavailable(format!("Failed to load ONNX model {model_path:?}: {e}")))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());

        tracing::debug!(
            "Loaded face detector from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            score_threshold: config.score_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    fn infer(&self, image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        let tensor = preprocess(&image.pixels);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| unavailable(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| unavailable(format!("Session lock poisoned: {e}")))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| unavailable(format!("ONNX inference failed: {e}")))?;

        let extract = |wanted: &str| -> ProcessResult<Vec<f32>> {
            let (_, value) = outputs
                .iter()
                .find(|(name, _)| *name == wanted)
                .ok_or_else(|| unavailable(format!("Model did not produce `{wanted}`")))?;
            let (_, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| unavailable(format!("Failed to extract `{wanted}` tensor: {e}")))?;
            Ok(data.to_vec())
        };
        let scores = extract("scores")?;
        let boxes = extract("boxes")?;

        let candidates = decode_candidates(
            &scores,
            &boxes,
            self.score_threshold,
            image.width as f64,
            image.height as f64,
        );
        Ok(non_max_suppression(candidates, self.iou_threshold))
    }
}

impl SubjectDetector for OnnxFaceDetector {
    fn name(&self) -> &str {
        "onnx-ultraface"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn detect_faces(&self, image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        let start = std::time::Instant::now();
        let faces = self.infer(image)?;
        tracing::trace!("  Face detection: {} face(s) in {:?}", faces.len(), start.elapsed());
        Ok(faces)
    }

    fn detect_objects(&self, _image: &RasterImage) -> ProcessResult<Vec<DetectedSubject>> {
        // Face-only model.
        Ok(Vec::new())
    }
}

/// Turn raw model outputs into face candidates in source pixel coordinates.
fn decode_candidates(
    scores: &[f32],
    boxes: &[f32],
    threshold: f32,
    width: f64,
    height: f64,
) -> Vec<DetectedSubject> {
    scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= threshold)
        .map(|(score, corners)| {
            let x1 = (corners[0] as f64).clamp(0.0, 1.0) * width;
            let y1 = (corners[1] as f64).clamp(0.0, 1.0) * height;
            let x2 = (corners[2] as f64).clamp(0.0, 1.0) * width;
            let y2 = (corners[3] as f64).clamp(0.0, 1.0) * height;
            DetectedSubject::face(
                CropArea::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0)),
                score[1],
            )
        })
        .filter(|face| face.bbox.area() > 0.0)
        .collect()
}

/// Greedy non-maximum suppression, highest score first.
fn non_max_suppression(mut candidates: Vec<DetectedSubject>, iou_threshold: f32) -> Vec<DetectedSubject> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<DetectedSubject> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.bbox.iou(&candidate.bbox) > iou_threshold as f64);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
