//! Smart crop planning from subject detections.
//!
//! Detections are weighted (score × category multiplier), grouped into
//! clusters of nearby boxes, and the heaviest cluster decides where the crop
//! goes. Without usable detections the planner returns a centred box.

use serde::{Deserialize, Serialize};

use super::area::{AspectRatio, CropArea};
use crate::config::CropConfig;
use crate::detect::{DetectedSubject, SubjectDetector, SubjectKind};
use crate::error::ProcessResult;
use crate::pipeline::RasterImage;

/// Planner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartCropResult {
    /// Crop rectangle, always inside the source image
    pub crop_area: CropArea,
    /// Detections that intersect the crop
    pub detected_subjects: Vec<DetectedSubject>,
    /// 0.0 to 1.0; 0 when nothing intersects the crop
    pub confidence: f32,
}

/// A detection with its planning weight.
#[derive(Debug, Clone)]
struct Weighted {
    subject: DetectedSubject,
    multiplier: f64,
    weight: f64,
}

/// Plans crops from detections using the configured weights.
pub struct CropPlanner {
    config: CropConfig,
}

impl CropPlanner {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    /// Detect subjects in `image` and plan a crop.
    ///
    /// Detector failures never fail the plan; they only remove detections.
    pub fn plan(
        &self,
        image: &RasterImage,
        detector: &dyn SubjectDetector,
        aspect: AspectRatio,
    ) -> SmartCropResult {
        let detections = collect_detections(image, detector);
        self.plan_with(image.width, image.height, &detections, aspect)
    }

    /// Plan a crop for a `width × height` image from known detections.
    pub fn plan_with(
        &self,
        width: u32,
        height: u32,
        detections: &[DetectedSubject],
        aspect: AspectRatio,
    ) -> SmartCropResult {
        let ratio = aspect.resolve(width, height);
        let weighted = self.weigh(width, height, detections);

        let raw = if weighted.is_empty() {
            self.fallback(width, height, ratio)
        } else {
            self.around_heaviest_cluster(width, height, &weighted, ratio)
        };
        let crop_area = raw.clamp_to(width, height);

        let total: f64 = weighted.iter().map(|w| w.multiplier).sum();
        let contributing: Vec<&Weighted> = weighted
            .iter()
            .filter(|w| w.subject.bbox.intersects(&crop_area))
            .collect();
        let confidence = if contributing.is_empty() || total <= 0.0 {
            0.0
        } else {
            let sum: f64 = contributing.iter().map(|w| w.weight).sum();
            (sum / total).clamp(0.0, 1.0) as f32
        };

        tracing::debug!(
            "Crop plan for {}x{}: {:?} from {} detection(s), confidence {:.2}",
            width,
            height,
            crop_area,
            weighted.len(),
            confidence
        );

        SmartCropResult {
            crop_area,
            detected_subjects: contributing.into_iter().map(|w| w.subject.clone()).collect(),
            confidence,
        }
    }

    /// Move an existing crop by `(dx, dy)`, keeping it inside the image.
    pub fn reposition(&self, area: &CropArea, dx: f64, dy: f64, width: u32, height: u32) -> CropArea {
        area.translated(dx, dy).clamp_to(width, height)
    }

    /// Accept a user-drawn crop, applying the same bounds rules as planned crops.
    pub fn adjust(&self, area: &CropArea, width: u32, height: u32) -> CropArea {
        area.clamp_to(width, height)
    }

    fn multiplier(&self, kind: SubjectKind) -> f64 {
        match kind {
            SubjectKind::Face => self.config.face_weight as f64,
            SubjectKind::Object => self.config.object_weight as f64,
        }
    }

    /// Keep detections with a positive score and a non-empty in-image box.
    fn weigh(&self, width: u32, height: u32, detections: &[DetectedSubject]) -> Vec<Weighted> {
        let bounds = CropArea::full(width, height);
        detections
            .iter()
            .filter(|d| d.score > 0.0 && d.bbox.intersects(&bounds))
            .map(|d| {
                let multiplier = self.multiplier(d.kind);
                Weighted {
                    subject: d.clone(),
                    multiplier,
                    weight: d.score as f64 * multiplier,
                }
            })
            .collect()
    }

    fn fallback(&self, width: u32, height: u32, ratio: Option<f64>) -> CropArea {
        let (w, h) = (width as f64, height as f64);
        let f = self.config.fallback_fraction;
        let (cw, ch) = match ratio {
            None => {
                let side = w.min(h) * f;
                (side, side)
            }
            Some(r) if w / h > r => (h * r * f, h * f),
            Some(r) => (w * f, w / r * f),
        };
        CropArea::new((w - cw) / 2.0, (h - ch) / 2.0, cw, ch)
    }

    fn around_heaviest_cluster(
        &self,
        width: u32,
        height: u32,
        weighted: &[Weighted],
        ratio: Option<f64>,
    ) -> CropArea {
        let clusters = cluster(weighted, self.config.cluster_gap);
        let best = clusters
            .iter()
            .fold(None::<(&Vec<usize>, f64)>, |best, members| {
                let total: f64 = members.iter().map(|&i| weighted[i].weight).sum();
                match best {
                    Some((_, t)) if t >= total => best,
                    _ => Some((members, total)),
                }
            });
        let Some((members, total_weight)) = best else {
            return self.fallback(width, height, ratio);
        };

        let (mut cx, mut cy) = (0.0, 0.0);
        for &i in members {
            let (x, y) = weighted[i].subject.bbox.center();
            cx += x * weighted[i].weight;
            cy += y * weighted[i].weight;
        }
        cx /= total_weight;
        cy /= total_weight;

        let bounds = members
            .iter()
            .map(|&i| weighted[i].subject.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| CropArea::new(cx, cy, 0.0, 0.0));

        // Half-extents that cover the cluster while centred on the centroid.
        let pad_x = bounds.width * self.config.padding;
        let pad_y = bounds.height * self.config.padding;
        let mut cw = 2.0 * (cx - bounds.x).max(bounds.right() - cx) + 2.0 * pad_x;
        let mut ch = 2.0 * (cy - bounds.y).max(bounds.bottom() - cy) + 2.0 * pad_y;

        let (w, h) = (width as f64, height as f64);
        match ratio {
            Some(r) => {
                if cw / ch < r {
                    cw = ch * r;
                } else {
                    ch = cw / r;
                }
                let scale = (w / cw).min(h / ch).min(1.0);
                cw *= scale;
                ch *= scale;
            }
            None => {
                cw = cw.min(w);
                ch = ch.min(h);
            }
        }

        CropArea::new(cx - cw / 2.0, cy - ch / 2.0, cw, ch)
    }
}

/// Run both detectors, absorbing unavailability.
fn collect_detections(image: &RasterImage, detector: &dyn SubjectDetector) -> Vec<DetectedSubject> {
    if !detector.is_available() {
        tracing::debug!(
            "Detector '{}' unavailable, using centred crop",
            detector.name()
        );
        return Vec::new();
    }

    let mut detections = absorb(detector.detect_faces(image), "face");
    detections.extend(absorb(detector.detect_objects(image), "object"));
    detections
}

fn absorb(result: ProcessResult<Vec<DetectedSubject>>, what: &str) -> Vec<DetectedSubject> {
    match result {
        Ok(found) => found,
        Err(e) if e.is_recoverable() => {
            tracing::debug!("No {what} detections: {e}");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("{what} detection failed, continuing without it: {e}");
            Vec::new()
        }
    }
}

/// Group detections whose gap-expanded boxes overlap (single linkage).
fn cluster(weighted: &[Weighted], gap: f64) -> Vec<Vec<usize>> {
    let expanded: Vec<CropArea> = weighted.iter().map(|w| w.subject.bbox.expanded(gap)).collect();
    let mut parent: Vec<usize> = (0..weighted.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..expanded.len() {
        for j in (i + 1)..expanded.len() {
            if expanded[i].intersects(&expanded[j]) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                if a != b {
                    parent[b.max(a)] = a.min(b);
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut index_of_root: Vec<Option<usize>> = vec![None; weighted.len()];
    for i in 0..weighted.len() {
        let r = root(&mut parent, i);
        match index_of_root[r] {
            Some(g) => groups[g].push(i),
            None => {
                index_of_root[r] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}
