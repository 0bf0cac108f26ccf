//! Prism CLI - Batch image resize, convert, smart-crop and filter tool.
//!
//! # Usage
//!
//! ```bash
//! # Resize one image to half size
//! prism resize photo.jpg --percent 50
//!
//! # Square smart crop into a circle, written as PNG
//! prism crop portrait.jpg --aspect 1:1 --shape circle --format png
//!
//! # Apply a preset at 60% strength
//! prism filter street.jpg --preset noir --intensity 60
//!
//! # Convert a folder to WebP and package it
//! prism batch ./photos --format webp --archive photos.zip --report report.jsonl
//!
//! # List presets, view configuration
//! prism presets
//! prism config show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Prism - Batch image resize, convert, smart-crop and filter tool.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PRISM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resize an image by pixels or percentage
    Resize(cli::resize::ResizeArgs),

    /// Re-encode an image in another format or quality
    Convert(cli::convert::ConvertArgs),

    /// Crop around detected subjects or to an explicit area
    Crop(cli::crop::CropArgs),

    /// Apply a preset and/or custom color adjustments
    Filter(cli::filter::FilterArgs),

    /// Process a folder of images and package the results
    Batch(cli::batch::BatchArgs),

    /// List the built-in filter presets
    Presets(cli::presets::PresetsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match &cli.config {
        Some(path) => {
            let path = cli::common::expand(path);
            prism_core::Config::load_from(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => match prism_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `prism config path`."
                );
                prism_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    let config_path = cli
        .config
        .as_deref()
        .map(cli::common::expand)
        .unwrap_or_else(prism_core::Config::default_path);

    match cli.command {
        Commands::Resize(args) => cli::resize::execute(args, config).await,
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Crop(args) => cli::crop::execute(args, config).await,
        Commands::Filter(args) => cli::filter::execute(args, config).await,
        Commands::Batch(args) => cli::batch::execute(args, config).await,
        Commands::Presets(args) => cli::presets::execute(args),
        Commands::Config(args) => cli::config::execute(args, config, &config_path),
    }
}
