//! Batch state: items, their lifecycle, and aggregate progress.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::ProcessedOutput;

/// Where an item's bytes come from.
#[derive(Debug, Clone)]
pub enum SourceRef {
    Path(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl SourceRef {
    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name used for reports and derived output names.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Memory { name, .. } => name.clone(),
        }
    }

    /// Run `f` over the source bytes, reading the file if needed.
    pub fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> ProcessResult<T>) -> ProcessResult<T> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| ProcessError::Io {
                    path: path.clone(),
                    source,
                })?;
                f(&bytes)
            }
            Self::Memory { bytes, .. } => f(bytes),
        }
    }
}

impl From<PathBuf> for SourceRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for SourceRef {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Lifecycle of a batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl ItemStatus {
    /// Forward-only transitions. Going back to `Pending` is only possible
    /// through [`BatchItem::reset`].
    pub fn can_advance_to(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Done)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Rejected status change.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("item {index} cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub index: usize,
    pub from: ItemStatus,
    pub to: ItemStatus,
}

/// Error recorded on a failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// Stable kind, e.g. `invalid_input`
    pub kind: String,
    pub message: String,
}

impl From<&ProcessError> for ItemError {
    fn from(error: &ProcessError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// One file's state within a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub source: SourceRef,
    status: ItemStatus,
    output: Option<ProcessedOutput>,
    error: Option<ItemError>,
}

impl BatchItem {
    pub fn new(index: usize, source: SourceRef) -> Self {
        Self {
            index,
            source,
            status: ItemStatus::Pending,
            output: None,
            error: None,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn output(&self) -> Option<&ProcessedOutput> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&ItemError> {
        self.error.as_ref()
    }

    pub fn name(&self) -> String {
        self.source.name()
    }

    fn advance(&mut self, to: ItemStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(to) {
            return Err(TransitionError {
                index: self.index,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Pending → Processing.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.advance(ItemStatus::Processing)
    }

    /// Processing → Done, keeping the output.
    pub fn finish(&mut self, output: ProcessedOutput) -> Result<(), TransitionError> {
        self.advance(ItemStatus::Done)?;
        self.output = Some(output);
        Ok(())
    }

    /// Processing → Failed, recording the error.
    pub fn fail(&mut self, error: ItemError) -> Result<(), TransitionError> {
        self.advance(ItemStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Back to Pending for resubmission, dropping any result.
    pub fn reset(&mut self) {
        self.status = ItemStatus::Pending;
        self.output = None;
        self.error = None;
    }
}

/// Per-status item counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
}

/// Ordered collection of batch items.
#[derive(Debug, Clone, Default)]
pub struct BatchJob {
    items: Vec<BatchItem>,
}

impl BatchJob {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceRef>,
    {
        Self {
            items: sources
                .into_iter()
                .enumerate()
                .map(|(index, source)| BatchItem::new(index, source.into()))
                .collect(),
        }
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&BatchItem> {
        self.items.get(index)
    }

    pub(crate) fn item_mut(&mut self, index: usize) -> Option<&mut BatchItem> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts {
            total: self.items.len(),
            ..BatchCounts::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Processing => counts.processing += 1,
                ItemStatus::Done => counts.done += 1,
                ItemStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Finished items as a percentage of all items (100 for an empty job).
    pub fn progress(&self) -> f64 {
        if self.items.is_empty() {
            return 100.0;
        }
        let finished = self.items.iter().filter(|i| i.status.is_terminal()).count();
        finished as f64 / self.items.len() as f64 * 100.0
    }

    pub fn is_finished(&self) -> bool {
        self.items.iter().all(|i| i.status.is_terminal())
    }

    /// Indices of items waiting to run, in order.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .map(|i| i.index)
            .collect()
    }

    /// Reset every failed item so the next run retries it. Returns how many.
    pub fn resubmit_failed(&mut self) -> usize {
        let mut count = 0;
        for item in self.items.iter_mut().filter(|i| i.status == ItemStatus::Failed) {
            item.reset();
            count += 1;
        }
        count
    }

    /// Successful outputs in item order.
    pub fn outputs(&self) -> impl Iterator<Item = &ProcessedOutput> {
        self.items.iter().filter_map(|i| i.output.as_ref())
    }
}
