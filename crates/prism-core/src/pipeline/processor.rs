//! Per-file pipeline: validate, decode, run operations, encode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::crop::{apply_crop_shape, AspectRatio, CropArea, CropPlanner, CropShape, SmartCropResult};
use crate::detect::{load_detector, SubjectDetector};
use crate::error::{ProcessError, ProcessResult};
use crate::filter::{FilterEngine, FilterRequest};
use crate::geometry::{resize, ResizeOptions};

use super::decode::{RasterDecoder, RasterImage};
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::encode::{EncodeOptions, EncodedImage, FormatEncoder, OutputFormat};
use super::naming::{derive_name, NameSuffix};
use super::validate::Validator;

/// One transform applied between decode and encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Resize(ResizeOptions),
    /// Plan a crop from detected subjects, then cut it out
    SmartCrop { aspect: AspectRatio, shape: CropShape },
    /// Cut out a caller-supplied area
    Crop { area: CropArea, shape: CropShape },
    Filter(FilterRequest),
}

impl Operation {
    fn suffix(&self) -> NameSuffix {
        match self {
            Self::Resize(_) => NameSuffix::Resized,
            Self::SmartCrop { .. } | Self::Crop { .. } => NameSuffix::Cropped,
            Self::Filter(_) => NameSuffix::Filtered,
        }
    }

    fn shape(&self) -> Option<CropShape> {
        match self {
            Self::SmartCrop { shape, .. } | Self::Crop { shape, .. } => Some(*shape),
            _ => None,
        }
    }
}

/// What to do with one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Applied in order
    pub operations: Vec<Operation>,
    pub encode: EncodeOptions,
}

/// Result of processing one image.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    /// Source file name as given
    pub source_name: String,
    /// Derived output file name
    pub output_name: String,
    pub encoded: EncodedImage,
    /// Size of the source bytes
    pub original_size: u64,
    /// Source dimensions
    pub source_width: u32,
    pub source_height: u32,
    /// Plan from the last smart crop, if any
    pub crop: Option<SmartCropResult>,
    pub elapsed_ms: u64,
}

impl ProcessedOutput {
    /// Signed size change in percent (negative = smaller).
    pub fn compression_delta(&self) -> f64 {
        self.encoded.compression_delta(self.original_size)
    }
}

/// The main image processor that wires the stages together.
pub struct ImageProcessor {
    validator: Validator,
    decoder: RasterDecoder,
    encoder: FormatEncoder,
    planner: CropPlanner,
    filters: FilterEngine,
    detector: Arc<dyn SubjectDetector>,
    discovery: FileDiscovery,
    max_dimension: u32,
}

impl ImageProcessor {
    /// Create a processor, loading the configured detector.
    pub fn new(config: &Config) -> Self {
        Self::with_detector(config, load_detector(config))
    }

    /// Create a processor with an explicit detector.
    pub fn with_detector(config: &Config, detector: Arc<dyn SubjectDetector>) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            decoder: RasterDecoder::new(config.limits.clone()),
            encoder: FormatEncoder::new(config.encode.clone()),
            planner: CropPlanner::new(config.crop.clone()),
            filters: FilterEngine::new(config.filter.clone()),
            detector,
            discovery: FileDiscovery::new(&config.batch),
            max_dimension: config.limits.max_image_dimension,
        }
    }

    pub fn detector(&self) -> &dyn SubjectDetector {
        self.detector.as_ref()
    }

    pub fn planner(&self) -> &CropPlanner {
        &self.planner
    }

    /// Validate and decode without further processing.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> ProcessResult<RasterImage> {
        self.validator.validate(name, bytes)?;
        self.decoder.decode(bytes, name)
    }

    /// Plan a smart crop for an already decoded image.
    pub fn plan_crop(&self, image: &RasterImage, aspect: AspectRatio) -> SmartCropResult {
        self.planner.plan(image, self.detector.as_ref(), aspect)
    }

    /// Read a file and process it.
    pub fn process_path(&self, path: &Path, options: &ProcessOptions) -> ProcessResult<ProcessedOutput> {
        let bytes = std::fs::read(path).map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        self.process_bytes(name, &bytes, options)
    }

    /// Run the full pipeline over in-memory bytes.
    pub fn process_bytes(&self, name: &str, bytes: &[u8], options: &ProcessOptions) -> ProcessResult<ProcessedOutput> {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {}", name);

        self.validator.validate(name, bytes)?;
        let decode_start = std::time::Instant::now();
        let mut image = self.decoder.decode(bytes, name)?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());
        let (source_width, source_height) = (image.width, image.height);

        let target = self.encoder.resolve_format(&image, options.encode.format);
        let mut crop = None;

        for operation in &options.operations {
            let op_start = std::time::Instant::now();
            if let Some(shape) = operation.shape() {
                self.warn_if_alpha_lost(name, shape, target, &options.encode);
            }
            image = match operation {
                Operation::Resize(resize_options) => resize(image, resize_options, self.max_dimension)?.0,
                Operation::SmartCrop { aspect, shape } => {
                    let plan = self.plan_crop(&image, *aspect);
                    let cropped = apply_crop_shape(image, &plan.crop_area, *shape)?;
                    crop = Some(plan);
                    cropped
                }
                Operation::Crop { area, shape } => {
                    let area = self.planner.adjust(area, image.width, image.height);
                    apply_crop_shape(image, &area, *shape)?
                }
                Operation::Filter(request) => {
                    let pipeline = request.to_pipeline()?;
                    self.filters.apply(image, &pipeline)
                }
            };
            tracing::trace!("  {:?}: {:?}", operation.suffix(), op_start.elapsed());
        }

        let encode_start = std::time::Instant::now();
        let encoded = self.encoder.convert(
            &image,
            &EncodeOptions {
                format: Some(target),
                ..options.encode.clone()
            },
        )?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());
        drop(image);

        let suffix = options
            .operations
            .last()
            .map(Operation::suffix)
            .unwrap_or(NameSuffix::Converted);
        let output_name = derive_name(name, suffix, encoded.format);

        let elapsed = start.elapsed();
        tracing::debug!(
            "Processed {} -> {} in {:?} ({}x{} -> {}x{})",
            name,
            output_name,
            elapsed,
            source_width,
            source_height,
            encoded.width,
            encoded.height
        );

        Ok(ProcessedOutput {
            source_name: name.to_string(),
            output_name,
            original_size: bytes.len() as u64,
            source_width,
            source_height,
            encoded,
            crop,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Discover all image files at a path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }

    /// Discover image files at a path, skipping `excluded` directories.
    pub fn discover_excluding(&self, path: &Path, excluded: &[PathBuf]) -> Vec<DiscoveredFile> {
        self.discovery.discover_excluding(path, excluded)
    }

    fn warn_if_alpha_lost(&self, name: &str, shape: CropShape, format: OutputFormat, encode: &EncodeOptions) {
        if shape.needs_alpha() && (!format.supports_alpha() || !encode.preserve_transparency) {
            tracing::warn!(
                "{}: {:?} crop written as {} loses its transparency (corners filled with background)",
                name,
                shape,
                format
            );
        }
    }
}
