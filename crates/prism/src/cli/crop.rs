//! The `prism crop` command.
//!
//! Without `--area` the crop is planned around detected faces and objects.
//! `--offset` nudges the planned box; `--plan` prints the plan and stops.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::Args;
use prism_core::crop::{AspectRatio, CropArea};
use prism_core::output::to_json;
use prism_core::{Config, Operation, ProcessOptions, SmartCropResult};

use super::common::{engine, require_file, run_single, CropFlags, EncodeArgs, OutputArgs};

/// Arguments for the `crop` command.
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Image file to crop
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub crop: CropFlags,

    /// Explicit crop box as x,y,width,height (skips subject detection)
    #[arg(long, conflicts_with = "aspect")]
    pub area: Option<String>,

    /// Move the planned box by dx,dy pixels
    #[arg(long, allow_hyphen_values = true, conflicts_with = "area")]
    pub offset: Option<String>,

    /// Print the crop plan as JSON without writing an image
    #[arg(long)]
    pub plan: bool,

    #[command(flatten)]
    pub encode: EncodeArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_numbers<const N: usize>(text: &str, what: &str) -> anyhow::Result<[f64; N]> {
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("Invalid {what} '{text}': {e}"))?;
    values
        .try_into()
        .map_err(|_| anyhow!("Invalid {what} '{text}': expected {N} comma-separated numbers"))
}

pub fn parse_area(text: &str) -> anyhow::Result<CropArea> {
    let [x, y, width, height] = parse_numbers::<4>(text, "area")?;
    if width <= 0.0 || height <= 0.0 {
        bail!("Crop area must have a positive width and height");
    }
    Ok(CropArea::new(x, y, width, height))
}

pub fn parse_offset(text: &str) -> anyhow::Result<(f64, f64)> {
    let [dx, dy] = parse_numbers::<2>(text, "offset")?;
    Ok((dx, dy))
}

pub async fn execute(args: CropArgs, config: Config) -> anyhow::Result<()> {
    let shape = args.crop.shape()?;
    let aspect = args.crop.aspect()?;
    let encode = args.encode.to_options(&config)?;

    let operation = if let Some(area) = args.area.as_deref() {
        Operation::Crop {
            area: parse_area(area)?,
            shape,
        }
    } else if args.plan || args.offset.is_some() {
        let offset = args.offset.as_deref().map(parse_offset).transpose()?;
        let (plan, area) = plan_crop(&config, &args.input, aspect, offset).await?;
        if args.plan {
            println!("{}", to_json(&plan, true)?);
            return Ok(());
        }
        Operation::Crop { area, shape }
    } else {
        Operation::SmartCrop { aspect, shape }
    };

    let options = ProcessOptions {
        operations: vec![operation],
        encode,
    };
    run_single(config, &args.input, options, &args.output).await
}

/// Plan a crop for `input`, optionally repositioned by `offset`.
async fn plan_crop(
    config: &Config,
    input: &std::path::Path,
    aspect: AspectRatio,
    offset: Option<(f64, f64)>,
) -> anyhow::Result<(SmartCropResult, CropArea)> {
    let input = require_file(input)?;
    let processor = Arc::clone(engine(config.clone()).processor());

    let planned = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let bytes = std::fs::read(&input)?;
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image = processor.decode(&name, &bytes)?;
        let plan = processor.plan_crop(&image, aspect);
        let area = match offset {
            Some((dx, dy)) => processor
                .planner()
                .reposition(&plan.crop_area, dx, dy, image.width, image.height),
            None => plan.crop_area,
        };
        Ok((plan, area))
    })
    .await??;

    tracing::debug!("Planned crop {:?} (confidence {:.2})", planned.1, planned.0.confidence);
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_area_accepts_four_numbers() {
        let area = parse_area("10, 20, 300.5, 200").unwrap();
        assert_eq!(area, CropArea::new(10.0, 20.0, 300.5, 200.0));
    }

    #[test]
    fn parse_area_rejects_bad_input() {
        assert!(parse_area("10,20,300").is_err());
        assert!(parse_area("a,b,c,d").is_err());
        assert!(parse_area("0,0,0,10").is_err());
    }

    #[test]
    fn parse_offset_allows_negative() {
        assert_eq!(parse_offset("-15,40").unwrap(), (-15.0, 40.0));
        assert!(parse_offset("5").is_err());
    }
}
