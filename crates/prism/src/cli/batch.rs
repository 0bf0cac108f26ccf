//! The `prism batch` command: a folder of images through one pipeline.
//!
//! Operations run in a fixed order: smart crop, resize, filter.
//! Converted files are written to `--output` and/or packaged into
//! `--archive`; Ctrl-C stops the batch after the running item.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use prism_core::batch::{unique_name, write_archive_file, BatchJob, BatchSummary, CancelToken};
use prism_core::output::{BatchReport, ReportFormat, ReportWriter};
use prism_core::{Config, Operation, Prism, ProcessOptions};

use super::common::{expand, human_bytes, CropFlags, EncodeArgs, FilterFlags, SizeArgs};

/// Arguments for the `batch` command.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Folder (or single image) to process
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub crop: CropFlags,

    #[command(flatten)]
    pub size: SizeArgs,

    #[command(flatten)]
    pub filter: FilterFlags,

    #[command(flatten)]
    pub encode: EncodeArgs,

    /// Directory for converted files (default: <input>/converted unless --archive is given; never re-read as input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a ZIP archive with the converted files
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Also put the untouched originals into the archive
    #[arg(long, requires = "archive")]
    pub include_originals: bool,

    /// Images processed at once (1-4)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Write a per-item report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format: json or jsonl (default from config)
    #[arg(long)]
    pub report_format: Option<String>,
}

impl BatchArgs {
    /// Assemble the per-file pipeline from the flags.
    pub fn to_options(&self, config: &Config) -> anyhow::Result<ProcessOptions> {
        let mut operations = Vec::new();
        if self.crop.is_set() {
            operations.push(Operation::SmartCrop {
                aspect: self.crop.aspect()?,
                shape: self.crop.shape()?,
            });
        }
        if let Some(resize) = self.size.to_options(config)? {
            operations.push(Operation::Resize(resize));
        }
        if let Some(request) = self.filter.to_request()? {
            operations.push(Operation::Filter(request));
        }
        Ok(ProcessOptions {
            operations,
            encode: self.encode.to_options(config)?,
        })
    }

    fn output_dir(&self, input: &Path) -> Option<PathBuf> {
        match (&self.output, &self.archive) {
            (Some(dir), _) => Some(expand(dir)),
            (None, Some(_)) => None,
            (None, None) => {
                let base = if input.is_dir() {
                    input.to_path_buf()
                } else {
                    input.parent().map(Path::to_path_buf).unwrap_or_default()
                };
                Some(base.join("converted"))
            }
        }
    }
}

pub async fn execute(args: BatchArgs, mut config: Config) -> anyhow::Result<()> {
    let input = expand(&args.input);
    if !input.exists() {
        bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the folder path and try again.",
            input
        );
    }
    if let Some(parallel) = args.parallel {
        config.batch.max_in_flight = parallel;
    }
    if args.include_originals {
        config.batch.include_originals = true;
    }
    let format_name = args.report_format.as_deref().unwrap_or(&config.output.format);
    let report_format =
        ReportFormat::parse(format_name).ok_or_else(|| anyhow!("Unknown report format '{format_name}'"))?;
    let options = args.to_options(&config)?;

    let output_dir = args.output_dir(&input);
    let prism = Prism::new(config);
    let mut job = discover_inputs(&prism, &input, output_dir.as_deref());
    if job.is_empty() {
        tracing::warn!("No supported image files found at {:?}", input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to process", job.len());

    let summary = run_with_progress(&prism, &mut job, &options).await;

    if let Some(dir) = &output_dir {
        let written = write_outputs(dir, &job)?;
        tracing::info!("Wrote {} file(s) to {:?}", written, dir);
    }
    if let Some(path) = &args.archive {
        let path = expand(path);
        let manifest = write_archive_file(&path, &job, prism.config().batch.include_originals)?;
        tracing::info!("Archive written to {:?} ({} entries)", path, manifest.entries.len());
    }
    if let Some(path) = &args.report {
        let path = expand(path);
        let file = File::create(&path)?;
        let mut writer = ReportWriter::new(BufWriter::new(file), report_format, prism.config().output.pretty);
        writer.write_report(&BatchReport::new(summary.clone(), job.items()))?;
        writer.flush()?;
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&summary);
    Ok(())
}

/// Discover inputs, leaving out the output directory when it sits inside the input tree.
fn discover_inputs(prism: &Prism, input: &Path, output_dir: Option<&Path>) -> BatchJob {
    let excluded: Vec<PathBuf> = output_dir.map(Path::to_path_buf).into_iter().collect();
    prism.discover_job_excluding(input, &excluded)
}

/// Run the batch with a progress bar and Ctrl-C cancellation.
async fn run_with_progress(prism: &Prism, job: &mut BatchJob, options: &ProcessOptions) -> BatchSummary {
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing the running item");
            on_signal.cancel();
        }
    });

    let total = job.len() as u64;
    let progress = create_progress_bar(total);
    let sink = |percent: f64, message: &str| {
        progress.set_position((percent / 100.0 * total as f64).round() as u64);
        progress.set_message(message.to_string());
    };

    let summary = prism.runner().run(job, options, &sink, &cancel).await;
    progress.finish_and_clear();
    watcher.abort();
    summary
}

/// Write every successful output into `dir`, de-duplicating names.
fn write_outputs(dir: &Path, job: &BatchJob) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut taken = std::collections::HashSet::new();
    let mut written = 0;
    for output in job.outputs() {
        let name = unique_name(&mut taken, &output.output_name);
        std::fs::write(dir.join(name), &output.encoded.bytes)?;
        written += 1;
    }
    Ok(written)
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Progress template rejected: {e}"),
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(summary: &BatchSummary) {
    let seconds = summary.elapsed_ms as f64 / 1000.0;
    let rate = if seconds > 0.0 {
        (summary.succeeded + summary.failed) as f64 / seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total);
    eprintln!("    Duration:     {:>7.1}s", seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!(
        "    Size:         {} -> {} ({:+.1}%)",
        human_bytes(summary.bytes_in),
        human_bytes(summary.bytes_out),
        summary.compression_delta()
    );
    if summary.cancelled {
        eprintln!("    Cancelled before all items ran");
    }
    eprintln!("  ====================================");
}
