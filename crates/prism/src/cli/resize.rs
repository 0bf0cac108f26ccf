//! The `prism resize` command.

use anyhow::anyhow;
use clap::Args;
use prism_core::{Config, Operation, ProcessOptions};
use std::path::PathBuf;

use super::common::{run_single, EncodeArgs, OutputArgs, SizeArgs};

/// Arguments for the `resize` command.
#[derive(Args, Debug)]
pub struct ResizeArgs {
    /// Image file to resize
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub size: SizeArgs,

    #[command(flatten)]
    pub encode: EncodeArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn execute(args: ResizeArgs, config: Config) -> anyhow::Result<()> {
    let resize = args
        .size
        .to_options(&config)?
        .ok_or_else(|| anyhow!("Nothing to do: pass --width, --height or --percent"))?;
    let options = ProcessOptions {
        operations: vec![Operation::Resize(resize)],
        encode: args.encode.to_options(&config)?,
    };
    run_single(config, &args.input, options, &args.output).await
}
