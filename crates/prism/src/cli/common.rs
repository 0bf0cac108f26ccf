//! Flag groups and helpers shared by the image commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::Args;
use prism_core::crop::{AspectRatio, CropShape};
use prism_core::filter::FilterConfig;
use prism_core::output::{to_json, ItemReport};
use prism_core::{
    Config, EncodeOptions, FilterRequest, OutputFormat, Prism, ProcessOptions, ProcessedOutput, ResizeOptions,
    ResizeQuality,
};

/// Target size flags.
#[derive(Args, Debug, Default)]
pub struct SizeArgs {
    /// Target width in pixels
    #[arg(long)]
    pub width: Option<f64>,

    /// Target height in pixels
    #[arg(long)]
    pub height: Option<f64>,

    /// Scale both sides by this percentage (overrides width/height)
    #[arg(long)]
    pub percent: Option<f64>,

    /// Use width and height exactly instead of fitting inside them
    #[arg(long)]
    pub stretch: bool,

    /// Resampling quality: fast, balanced or high
    #[arg(long)]
    pub resample: Option<String>,
}

impl SizeArgs {
    /// `None` when no size flag was given.
    pub fn to_options(&self, config: &Config) -> anyhow::Result<Option<ResizeOptions>> {
        if self.width.is_none() && self.height.is_none() && self.percent.is_none() {
            return Ok(None);
        }
        let name = self.resample.as_deref().unwrap_or(&config.resize.quality);
        let quality = ResizeQuality::parse(name)
            .ok_or_else(|| anyhow!("Unknown resample quality '{name}' (expected fast, balanced or high)"))?;
        Ok(Some(ResizeOptions {
            width: self.width,
            height: self.height,
            percentage: self.percent,
            maintain_aspect_ratio: config.resize.maintain_aspect_ratio && !self.stretch,
            quality,
        }))
    }
}

/// Output encoding flags.
#[derive(Args, Debug, Default)]
pub struct EncodeArgs {
    /// Output format: jpeg, png, webp, gif, bmp, tiff (default: keep source format)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Quality for lossy formats, 0.0 to 1.0
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Flatten transparency onto the configured background
    #[arg(long)]
    pub flatten: bool,
}

impl EncodeArgs {
    pub fn to_options(&self, config: &Config) -> anyhow::Result<EncodeOptions> {
        let format = match self.format.as_deref() {
            Some(name) => Some(parse_format(name)?),
            None => None,
        };
        let quality = self.quality.unwrap_or(config.encode.quality);
        if !(0.0..=1.0).contains(&quality) {
            bail!("Quality must be between 0.0 and 1.0 (got {quality})");
        }
        Ok(EncodeOptions {
            format,
            quality,
            preserve_transparency: !self.flatten,
        })
    }
}

pub fn parse_format(name: &str) -> anyhow::Result<OutputFormat> {
    OutputFormat::parse(name).ok_or_else(|| anyhow!("Unknown output format '{name}'"))
}

/// Smart crop flags.
#[derive(Args, Debug, Default)]
pub struct CropFlags {
    /// Aspect ratio: W:H, a decimal ratio, "original" or "free"
    #[arg(long)]
    pub aspect: Option<String>,

    /// Crop shape: rectangle, circle or oval
    #[arg(long)]
    pub shape: Option<String>,
}

impl CropFlags {
    pub fn is_set(&self) -> bool {
        self.aspect.is_some() || self.shape.is_some()
    }

    pub fn aspect(&self) -> anyhow::Result<AspectRatio> {
        let text = self.aspect.as_deref().unwrap_or("free");
        AspectRatio::parse(text).ok_or_else(|| anyhow!("Invalid aspect ratio '{text}'"))
    }

    pub fn shape(&self) -> anyhow::Result<CropShape> {
        let text = self.shape.as_deref().unwrap_or("rectangle");
        CropShape::parse(text).ok_or_else(|| anyhow!("Invalid crop shape '{text}'"))
    }
}

/// Filter flags: a preset, custom adjustments, or both.
#[derive(Args, Debug, Default)]
pub struct FilterFlags {
    /// Preset id (see `prism presets`)
    #[arg(long)]
    pub preset: Option<String>,

    /// Overall filter strength, 0 to 100
    #[arg(long)]
    pub intensity: Option<f32>,

    /// Sepia amount, 0 to 100
    #[arg(long)]
    pub sepia: Option<f32>,

    /// Brightness, 0 to 200 (100 = unchanged)
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Contrast, 0 to 200 (100 = unchanged)
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Saturation, 0 to 200 (100 = unchanged)
    #[arg(long)]
    pub saturation: Option<f32>,

    /// Hue rotation in degrees, -180 to 180
    #[arg(long, allow_hyphen_values = true)]
    pub hue: Option<f32>,

    /// Blur radius in pixels, 0 to 20
    #[arg(long)]
    pub blur: Option<f32>,

    /// Sharpen amount, 0 to 100
    #[arg(long)]
    pub sharpen: Option<f32>,

    /// Vignette strength, 0 to 100
    #[arg(long)]
    pub vignette: Option<f32>,
}

impl FilterFlags {
    fn custom(&self) -> Option<FilterConfig> {
        let fields = [
            self.sepia,
            self.brightness,
            self.contrast,
            self.saturation,
            self.hue,
            self.blur,
            self.sharpen,
            self.vignette,
        ];
        if fields.iter().all(Option::is_none) {
            return None;
        }
        let base = FilterConfig::default();
        Some(FilterConfig {
            sepia: self.sepia.unwrap_or(base.sepia),
            brightness: self.brightness.unwrap_or(base.brightness),
            contrast: self.contrast.unwrap_or(base.contrast),
            saturation: self.saturation.unwrap_or(base.saturation),
            hue: self.hue.unwrap_or(base.hue),
            blur: self.blur.unwrap_or(base.blur),
            sharpen: self.sharpen.unwrap_or(base.sharpen),
            vignette: self.vignette.unwrap_or(base.vignette),
        })
    }

    /// `None` when neither a preset nor any adjustment was given.
    pub fn to_request(&self) -> anyhow::Result<Option<FilterRequest>> {
        let custom = self.custom();
        if self.preset.is_none() && custom.is_none() {
            return Ok(None);
        }
        let request = FilterRequest {
            preset: self.preset.clone(),
            custom,
            intensity: self.intensity.unwrap_or(100.0),
        };
        // Surface bad presets and ranges before any file is touched.
        request.to_pipeline()?;
        Ok(Some(request))
    }
}

/// Where single-file results go.
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Output directory (default: next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a JSON report instead of a summary line
    #[arg(long)]
    pub json: bool,
}

/// Expand `~` in a user-supplied path.
pub fn expand(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&text).into_owned())
}

pub fn require_file(input: &Path) -> anyhow::Result<PathBuf> {
    let input = expand(input);
    if !input.exists() {
        bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }
    if input.is_dir() {
        bail!(
            "{:?} is a directory\n\n  Hint: Use `prism batch` to process a folder.",
            input
        );
    }
    Ok(input)
}

/// Engine for one CLI invocation.
pub fn engine(config: Config) -> Prism {
    Prism::new(config)
}

/// Run the pipeline for one file off the async runtime.
pub async fn process_file(prism: &Prism, input: PathBuf, options: ProcessOptions) -> anyhow::Result<ProcessedOutput> {
    let processor = Arc::clone(prism.processor());
    let output = tokio::task::spawn_blocking(move || processor.process_path(&input, &options)).await??;
    Ok(output)
}

/// Write `output` into `dir`, never overwriting the source.
pub fn write_output(dir: &Path, output: &ProcessedOutput) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&output.output_name);
    std::fs::write(&path, &output.encoded.bytes)?;
    Ok(path)
}

/// Process one file, write the result, and report it.
pub async fn run_single(
    config: Config,
    input: &Path,
    options: ProcessOptions,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    let input = require_file(input)?;
    let dir = match &out.output {
        Some(dir) => expand(dir),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let prism = engine(config);
    let output = process_file(&prism, input, options).await?;
    let path = write_output(&dir, &output)?;
    tracing::info!("Output written to {:?}", path);

    if out.json {
        println!("{}", to_json(&ItemReport::done(0, &output), true)?);
    } else {
        println!("{}", summary_line(&output, &path));
    }
    Ok(())
}

pub fn summary_line(output: &ProcessedOutput, path: &Path) -> String {
    format!(
        "{} -> {} ({}x{} -> {}x{}, {} -> {}, {:+.1}%)",
        output.source_name,
        path.display(),
        output.source_width,
        output.source_height,
        output.encoded.width,
        output.encoded.height,
        human_bytes(output.original_size),
        human_bytes(output.encoded.size()),
        output.compression_delta()
    )
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
