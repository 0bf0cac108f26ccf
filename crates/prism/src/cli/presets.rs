//! The `prism presets` command.

use anyhow::bail;
use clap::Args;
use prism_core::filter::{presets, FilterPreset};

/// Arguments for the `presets` command.
#[derive(Args, Debug)]
pub struct PresetsArgs {
    /// Only show presets in this category (classic, vintage, bw, artistic)
    #[arg(long)]
    pub category: Option<String>,

    /// Print the presets with their settings as JSON
    #[arg(long)]
    pub json: bool,
}

fn matches_category(preset: &FilterPreset, wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    let label = preset.category.label().to_lowercase();
    match wanted.as_str() {
        "bw" | "b&w" | "black_and_white" | "black-and-white" => label == "black & white",
        _ => label == wanted,
    }
}

pub fn select(category: Option<&str>) -> Vec<FilterPreset> {
    presets()
        .into_iter()
        .filter(|p| category.map_or(true, |c| matches_category(p, c)))
        .collect()
}

pub fn execute(args: PresetsArgs) -> anyhow::Result<()> {
    let selected = select(args.category.as_deref());
    if selected.is_empty() {
        bail!(
            "No presets in category '{}'",
            args.category.unwrap_or_default()
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    println!("{:<14} {:<16} {:<15} EFFECT", "ID", "NAME", "CATEGORY");
    for preset in &selected {
        println!(
            "{:<14} {:<16} {:<15} {}",
            preset.id,
            preset.name,
            preset.category.label(),
            preset.effect.map(|e| e.as_str()).unwrap_or("-")
        );
    }
    Ok(())
}
