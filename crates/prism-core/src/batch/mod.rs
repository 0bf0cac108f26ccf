//! Batch processing: item state, orchestration, and archive packaging.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::batch::{BatchJob, BatchRunner, CancelToken, NoProgress};
//!
//! let mut job = BatchJob::new(paths);
//! let runner = BatchRunner::new(processor, &config.batch);
//! let summary = runner.run(&mut job, &options, &NoProgress, &CancelToken::new()).await;
//! let (zip, _) = prism_core::batch::archive_to_vec(&job, false)?;
//! ```

pub mod archive;
pub mod job;
pub mod runner;

pub use archive::{archive_to_vec, unique_name, write_archive, write_archive_file, ArchiveManifest};
pub use job::{BatchCounts, BatchItem, BatchJob, ItemError, ItemStatus, SourceRef, TransitionError};
pub use runner::{BatchRunner, BatchSummary, CancelToken, CompletionNotifier, NoProgress, ProgressSink};
