//! The `prism convert` command: re-encode without changing the pixels.

use clap::Args;
use prism_core::{Config, ProcessOptions};
use std::path::PathBuf;

use super::common::{run_single, EncodeArgs, OutputArgs};

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image file to convert
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub encode: EncodeArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn execute(args: ConvertArgs, config: Config) -> anyhow::Result<()> {
    let encode = args.encode.to_options(&config)?;
    if encode.format.is_none() && args.encode.quality.is_none() && !args.encode.flatten {
        tracing::warn!("No --format, --quality or --flatten given; re-encoding with defaults");
    }
    let options = ProcessOptions {
        operations: Vec::new(),
        encode,
    };
    run_single(config, &args.input, options, &args.output).await
}
