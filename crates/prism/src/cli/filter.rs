//! The `prism filter` command.

use anyhow::anyhow;
use clap::Args;
use prism_core::{Config, Operation, ProcessOptions};
use std::path::PathBuf;

use super::common::{run_single, EncodeArgs, FilterFlags, OutputArgs};

/// Arguments for the `filter` command.
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Image file to filter
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub filter: FilterFlags,

    #[command(flatten)]
    pub encode: EncodeArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn execute(args: FilterArgs, config: Config) -> anyhow::Result<()> {
    let request = args
        .filter
        .to_request()?
        .ok_or_else(|| anyhow!("Nothing to do: pass --preset or at least one adjustment"))?;
    let options = ProcessOptions {
        operations: vec![Operation::Filter(request)],
        encode: args.encode.to_options(&config)?,
    };
    run_single(config, &args.input, options, &args.output).await
}
