//! Machine-readable batch reports in JSON or JSON Lines.

use serde::Serialize;
use std::io::{self, Write};

use crate::batch::{BatchItem, BatchSummary, ItemError, ItemStatus};
use crate::crop::SmartCropResult;
use crate::pipeline::ProcessedOutput;

/// Report serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One JSON document
    Json,
    /// One JSON object per line
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Report line for one batch item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub index: usize,
    pub source: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    /// Signed percent, negative when the output is smaller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<SmartCropResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl ItemReport {
    /// Report for a successful result outside of a batch.
    pub fn done(index: usize, output: &ProcessedOutput) -> Self {
        Self {
            source: output.source_name.clone(),
            status: ItemStatus::Done,
            ..Self::with_output(index, Some(output))
        }
    }

    fn with_output(index: usize, output: Option<&ProcessedOutput>) -> Self {
        Self {
            index,
            source: String::new(),
            status: ItemStatus::Pending,
            output: output.map(|o| o.output_name.clone()),
            format: output.map(|o| o.encoded.format.to_string()),
            width: output.map(|o| o.encoded.width),
            height: output.map(|o| o.encoded.height),
            original_size: output.map(|o| o.original_size),
            output_size: output.map(|o| o.encoded.size()),
            compression_delta: output.map(|o| (o.compression_delta() * 10.0).round() / 10.0),
            crop: output.and_then(|o| o.crop.clone()),
            error: None,
        }
    }
}

impl From<&BatchItem> for ItemReport {
    fn from(item: &BatchItem) -> Self {
        Self {
            source: item.name(),
            status: item.status(),
            error: item.error().cloned(),
            ..Self::with_output(item.index, item.output())
        }
    }
}

/// Whole-batch report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new(summary: BatchSummary, items: &[BatchItem]) -> Self {
        Self {
            summary,
            items: items.iter().map(ItemReport::from).collect(),
        }
    }
}

/// Serializes reports to a writer.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// `pretty` only affects [`ReportFormat::Json`].
    pub fn new(writer: W, format: ReportFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one value followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == ReportFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// JSON: the report as one document. JSONL: one line per item, then
    /// the summary as the last line.
    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => self.write(report),
            ReportFormat::JsonLines => {
                for item in &report.items {
                    self.write(item)?;
                }
                self.write(&report.summary)
            }
        }
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize a value to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchJob, SourceRef};

    fn failed_job() -> BatchJob {
        let mut job = BatchJob::new(vec![
            SourceRef::memory("one.png", b"x".to_vec()),
            SourceRef::memory("two.png", b"y".to_vec()),
        ]);
        let item = job.item_mut(0).unwrap();
        item.start().unwrap();
        item.fail(ItemError {
            kind: "invalid_input".into(),
            message: "corrupt".into(),
        })
        .unwrap();
        job
    }

    #[test]
    fn test_item_report_fields() {
        let job = failed_job();
        let report = ItemReport::from(&job.items()[0]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "invalid_input");
        assert!(json.get("output").is_none());

        let pending = serde_json::to_value(ItemReport::from(&job.items()[1])).unwrap();
        assert_eq!(pending["status"], "pending");
    }

    #[test]
    fn test_jsonl_report_has_summary_last() {
        let job = failed_job();
        let report = BatchReport::new(
            BatchSummary {
                total: 2,
                failed: 1,
                skipped: 1,
                ..BatchSummary::default()
            },
            job.items(),
        );
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::new(&mut buffer, ReportFormat::JsonLines, true);
        writer.write_report(&report).unwrap();
        assert_eq!(writer.items_written(), 3);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 3);
        let last: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last["total"], 2);
    }

    #[test]
    fn test_json_report_is_single_document() {
        let job = failed_job();
        let report = BatchReport::new(BatchSummary::default(), job.items());
        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer, ReportFormat::Json, true)
            .write_report(&report)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("json"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("NDJSON"), Some(ReportFormat::JsonLines));
        assert_eq!(ReportFormat::parse("xml"), None);
    }
}
