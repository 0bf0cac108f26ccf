//! Prism Core - Embeddable raster image processing engine.
//!
//! Prism takes encoded images as input and produces re-encoded images:
//! resized, converted, smart-cropped (optionally into a circle or oval) and
//! filtered. Batches run with bounded concurrency and can be packaged into a
//! ZIP archive.
//!
//! # Architecture
//!
//! ```text
//! Bytes → Validate → Decode → [Resize | Crop | Filter]* → Encode → Bytes
//!                                   ↑
//!                         Subject detector (optional)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, Operation, Prism, ProcessOptions, ResizeOptions};
//!
//! let prism = Prism::new(Config::load()?);
//! let options = ProcessOptions {
//!     operations: vec![Operation::Resize(ResizeOptions::percent(50.0))],
//!     ..ProcessOptions::default()
//! };
//! let output = prism.process_path("./photo.jpg".as_ref(), &options)?;
//! std::fs::write(&output.output_name, &output.encoded.bytes)?;
//! ```

pub mod batch;
pub mod config;
pub mod crop;
pub mod detect;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod math;
pub mod output;
pub mod pipeline;

pub use batch::{BatchJob, BatchRunner, BatchSummary, CancelToken, ItemStatus, ProgressSink, SourceRef};
pub use config::Config;
pub use crop::{AspectRatio, CropArea, CropShape, SmartCropResult};
pub use detect::{DetectedSubject, SubjectDetector};
pub use error::{ConfigError, PrismError, ProcessError, ProcessResult, Result};
pub use filter::{ArtisticEffect, FilterConfig, FilterRequest};
pub use geometry::{ResizeOptions, ResizeQuality};
pub use output::{BatchReport, ReportFormat, ReportWriter};
pub use pipeline::{
    DiscoveredFile, EncodeOptions, ImageProcessor, Operation, OutputFormat, ProcessOptions, ProcessedOutput,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prism engine - the main entry point.
///
/// Owns the configuration and a shared [`ImageProcessor`]. Cheap to clone
/// handles out of: the processor is behind an `Arc` so batch runners can share it.
pub struct Prism {
    config: Config,
    processor: Arc<ImageProcessor>,
}

impl Prism {
    /// Create an engine, loading the configured subject detector.
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing Prism v{}", VERSION);
        let processor = Arc::new(ImageProcessor::new(&config));
        Self { config, processor }
    }

    /// Create an engine with an explicit detector.
    pub fn with_detector(config: Config, detector: Arc<dyn SubjectDetector>) -> Self {
        let processor = Arc::new(ImageProcessor::with_detector(&config, detector));
        Self { config, processor }
    }

    /// Create an engine from the config file at the default location.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &Arc<ImageProcessor> {
        &self.processor
    }

    /// Batch runner sharing this engine's processor.
    pub fn runner(&self) -> BatchRunner {
        BatchRunner::new(Arc::clone(&self.processor), &self.config.batch)
    }

    /// Process one file.
    pub fn process_path(&self, path: &Path, options: &ProcessOptions) -> ProcessResult<ProcessedOutput> {
        self.processor.process_path(path, options)
    }

    /// Process in-memory bytes.
    pub fn process_bytes(&self, name: &str, bytes: &[u8], options: &ProcessOptions) -> ProcessResult<ProcessedOutput> {
        self.processor.process_bytes(name, bytes, options)
    }

    /// Build a batch from every supported file under `path`.
    pub fn discover_job(&self, path: &Path) -> BatchJob {
        self.discover_job_excluding(path, &[])
    }

    /// Build a batch from `path`, leaving out the `excluded` directories.
    pub fn discover_job_excluding(&self, path: &Path, excluded: &[PathBuf]) -> BatchJob {
        let files = self.processor.discover_excluding(path, excluded);
        tracing::debug!(
            "Discovered {} file(s), {} bytes total",
            files.len(),
            pipeline::FileDiscovery::total_size(&files)
        );
        BatchJob::new(files.into_iter().map(|f| f.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::NoProgress;
    use crate::detect::NullDetector;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn engine() -> Prism {
        Prism::with_detector(Config::default(), Arc::new(NullDetector))
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_prism_process_bytes() {
        let options = ProcessOptions {
            operations: vec![Operation::Resize(ResizeOptions::percent(50.0))],
            ..ProcessOptions::default()
        };
        let output = engine().process_bytes("tile.png", &png(40, 20), &options).unwrap();
        assert_eq!((output.encoded.width, output.encoded.height), (20, 10));
        assert_eq!(output.output_name, "tile_resized.png");
    }

    #[tokio::test]
    async fn test_prism_runner_shares_processor() {
        let prism = engine();
        assert_eq!(prism.runner().max_in_flight(), prism.config().batch.max_in_flight);

        let mut job = BatchJob::new(vec![
            SourceRef::memory("a.png", png(8, 8)),
            SourceRef::memory("b.png", png(8, 8)),
        ]);
        let summary = prism
            .runner()
            .run(&mut job, &ProcessOptions::default(), &NoProgress, &CancelToken::new())
            .await;
        assert_eq!(summary.succeeded, 2);
        assert_eq!(job.progress(), 100.0);
    }

    #[test]
    fn test_discover_job() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.png"), png(4, 4)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        let job = engine().discover_job(dir.path());
        assert_eq!(job.len(), 1);
        assert_eq!(job.items()[0].name(), "one.png");
    }
}
