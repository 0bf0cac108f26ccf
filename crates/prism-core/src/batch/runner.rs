//! Batch orchestration.
//!
//! Each item's whole pipeline runs on tokio's blocking pool. At most
//! `max_in_flight` items are decoded at once (1 by default, so the batch is
//! strictly sequential), which bounds peak memory to that many decoded
//! buffers. Between items the runner yields, reports progress, and checks
//! for cancellation; a running item is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;

use super::job::{BatchJob, ItemError, ItemStatus};
use crate::config::{BatchConfig, MAX_IN_FLIGHT};
use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::{ImageProcessor, ProcessOptions, ProcessedOutput};

/// Receives progress after every finished item.
pub trait ProgressSink: Send + Sync {
    /// `percent` is 0-100.
    fn on_progress(&self, percent: f64, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, &str) + Send + Sync,
{
    fn on_progress(&self, percent: f64, message: &str) {
        self(percent, message)
    }
}

/// Sink that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _percent: f64, _message: &str) {}
}

/// Receives the batch summary once a run ends. Delivery is the host's job.
pub trait CompletionNotifier: Send + Sync {
    fn on_complete(&self, summary: &BatchSummary);
}

/// Cooperative cancellation flag, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items left pending because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub elapsed_ms: u64,
}

impl BatchSummary {
    /// Signed size change across successful items, in percent.
    pub fn compression_delta(&self) -> f64 {
        crate::pipeline::compression_delta(self.bytes_in, self.bytes_out)
    }
}

/// Drives a [`BatchJob`] through an [`ImageProcessor`].
pub struct BatchRunner {
    processor: Arc<ImageProcessor>,
    max_in_flight: usize,
    notifier: Option<Arc<dyn CompletionNotifier>>,
}

impl BatchRunner {
    pub fn new(processor: Arc<ImageProcessor>, config: &BatchConfig) -> Self {
        Self {
            processor,
            max_in_flight: config.max_in_flight.clamp(1, MAX_IN_FLIGHT),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Process every pending item of `job`.
    ///
    /// Failures are recorded on their item and never stop the batch. Items
    /// that were already finished are left alone, so a job with resubmitted
    /// items can be run again.
    pub async fn run(
        &self,
        job: &mut BatchJob,
        options: &ProcessOptions,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> BatchSummary {
        let start = Instant::now();
        let options = Arc::new(options.clone());
        let mut queue = job.pending_indices().into_iter();
        let mut in_flight: JoinSet<(usize, ProcessResult<ProcessedOutput>)> = JoinSet::new();
        let mut cancelled = false;

        tracing::info!(
            "Starting batch of {} item(s), {} in flight",
            queue.len(),
            self.max_in_flight
        );

        loop {
            while !cancelled && in_flight.len() < self.max_in_flight {
                if cancel.is_cancelled() {
                    tracing::info!("Batch cancelled; waiting for running items");
                    cancelled = true;
                    break;
                }
                let Some(index) = queue.next() else { break };
                let Some(item) = job.item_mut(index) else { continue };
                if let Err(e) = item.start() {
                    tracing::warn!("Skipping item: {e}");
                    continue;
                }

                let source = item.source.clone();
                let processor = Arc::clone(&self.processor);
                let options = Arc::clone(&options);
                in_flight.spawn(async move {
                    let name = source.name();
                    let label = name.clone();
                    let work = tokio::task::spawn_blocking(move || {
                        source.with_bytes(|bytes| processor.process_bytes(&name, bytes, &options))
                    });
                    let result = match work.await {
                        Ok(result) => result,
                        Err(e) => Err(worker_failed(label, &e)),
                    };
                    (index, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined {
                Ok((index, result)) => self.record(job, index, result, progress),
                Err(e) => tracing::error!("Batch task failed to join: {e}"),
            }
            tokio::task::yield_now().await;
        }
        self.fail_orphans(job, progress);

        let summary = summarize(job, cancelled, start.elapsed().as_millis() as u64);
        tracing::info!(
            "Batch finished: {} succeeded, {} failed, {} skipped in {}ms",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.elapsed_ms
        );
        if let Some(notifier) = &self.notifier {
            notifier.on_complete(&summary);
        }
        summary
    }

    fn record(
        &self,
        job: &mut BatchJob,
        index: usize,
        result: ProcessResult<ProcessedOutput>,
        progress: &dyn ProgressSink,
    ) {
        let Some(item) = job.item_mut(index) else {
            return;
        };
        let name = item.name();
        let (outcome, message) = match result {
            Ok(output) => {
                let message = format!("{name} -> {}", output.output_name);
                (item.finish(output), message)
            }
            Err(e) => {
                tracing::warn!("Failed {}: {}", name, e);
                let message = format!("{name} failed ({})", e.kind());
                (item.fail(ItemError::from(&e)), message)
            }
        };
        if let Err(e) = outcome {
            tracing::error!("Inconsistent batch state: {e}");
        }
        progress.on_progress(job.progress(), &message);
    }

    /// Fail items whose task was lost before reporting back.
    fn fail_orphans(&self, job: &mut BatchJob, progress: &dyn ProgressSink) {
        let orphans: Vec<usize> = job
            .items()
            .iter()
            .filter(|item| item.status() == ItemStatus::Processing)
            .map(|item| item.index)
            .collect();
        for index in orphans {
            let name = job.item(index).map(|item| item.name()).unwrap_or_default();
            let error = ProcessError::WorkerFailed {
                name,
                message: "task ended without a result".to_string(),
            };
            self.record(job, index, Err(error), progress);
        }
    }
}

fn worker_failed(name: String, error: &tokio::task::JoinError) -> ProcessError {
    let message = if error.is_panic() {
        "processing panicked".to_string()
    } else {
        error.to_string()
    };
    ProcessError::WorkerFailed { name, message }
}

fn summarize(job: &BatchJob, cancelled: bool, elapsed_ms: u64) -> BatchSummary {
    let counts = job.counts();
    let (bytes_in, bytes_out) = job
        .outputs()
        .fold((0u64, 0u64), |(i, o), out| (i + out.original_size, o + out.encoded.size()));
    BatchSummary {
        total: counts.total,
        succeeded: counts.done,
        failed: counts.failed,
        skipped: job
            .items()
            .iter()
            .filter(|i| i.status() == ItemStatus::Pending)
            .count(),
        cancelled,
        bytes_in,
        bytes_out,
        elapsed_ms,
    }
}
