//! Built-in filter presets.

use serde::Serialize;

use super::artistic::ArtisticEffect;
use super::FilterConfig;

/// Grouping shown in preset listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetCategory {
    Classic,
    Vintage,
    BlackAndWhite,
    Artistic,
}

impl PresetCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::Vintage => "Vintage",
            Self::BlackAndWhite => "Black & White",
            Self::Artistic => "Artistic",
        }
    }
}

/// A named filter combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub category: PresetCategory,
    pub config: FilterConfig,
    /// Algorithmic effect run after the color adjustments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<ArtisticEffect>,
}

fn preset(
    id: &'static str,
    name: &'static str,
    category: PresetCategory,
    config: FilterConfig,
) -> FilterPreset {
    FilterPreset {
        id,
        name,
        category,
        config,
        effect: None,
    }
}

fn effect(id: &'static str, name: &'static str, effect: ArtisticEffect) -> FilterPreset {
    FilterPreset {
        id,
        name,
        category: PresetCategory::Artistic,
        config: FilterConfig::default(),
        effect: Some(effect),
    }
}

/// The full preset catalogue, in display order.
pub fn presets() -> Vec<FilterPreset> {
    use PresetCategory::*;
    let base = FilterConfig::default();
    vec![
        preset(
            "vivid",
            "Vivid",
            Classic,
            FilterConfig {
                contrast: 115.0,
                saturation: 140.0,
                ..base
            },
        ),
        preset(
            "bright",
            "Bright",
            Classic,
            FilterConfig {
                brightness: 120.0,
                contrast: 105.0,
                ..base
            },
        ),
        preset(
            "crisp",
            "Crisp",
            Classic,
            FilterConfig {
                contrast: 110.0,
                sharpen: 60.0,
                ..base
            },
        ),
        preset(
            "cool",
            "Cool",
            Classic,
            FilterConfig {
                hue: -15.0,
                saturation: 110.0,
                ..base
            },
        ),
        preset(
            "sepia",
            "Sepia",
            Vintage,
            FilterConfig {
                sepia: 100.0,
                ..base
            },
        ),
        preset(
            "faded",
            "Faded",
            Vintage,
            FilterConfig {
                sepia: 30.0,
                contrast: 80.0,
                saturation: 70.0,
                brightness: 110.0,
                ..base
            },
        ),
        preset(
            "retro",
            "Retro",
            Vintage,
            FilterConfig {
                sepia: 50.0,
                contrast: 120.0,
                hue: 10.0,
                vignette: 50.0,
                ..base
            },
        ),
        preset(
            "grayscale",
            "Grayscale",
            BlackAndWhite,
            FilterConfig {
                saturation: 0.0,
                ..base
            },
        ),
        preset(
            "noir",
            "Noir",
            BlackAndWhite,
            FilterConfig {
                saturation: 0.0,
                contrast: 150.0,
                brightness: 90.0,
                vignette: 60.0,
                ..base
            },
        ),
        preset(
            "silver",
            "Silver",
            BlackAndWhite,
            FilterConfig {
                saturation: 0.0,
                brightness: 115.0,
                contrast: 90.0,
                ..base
            },
        ),
        preset(
            "dreamy",
            "Dreamy",
            Artistic,
            FilterConfig {
                blur: 2.0,
                brightness: 110.0,
                saturation: 120.0,
                ..base
            },
        ),
        effect("oil-painting", "Oil Painting", ArtisticEffect::OilPainting),
        effect("watercolor", "Watercolor", ArtisticEffect::Watercolor),
        effect("sketch", "Sketch", ArtisticEffect::Sketch),
    ]
}

/// Look up a preset by id (case-insensitive).
pub fn find_preset(id: &str) -> Option<FilterPreset> {
    presets().into_iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let all = presets();
        let ids: HashSet<&str> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn test_every_category_present() {
        let all = presets();
        for category in [
            PresetCategory::Classic,
            PresetCategory::Vintage,
            PresetCategory::BlackAndWhite,
            PresetCategory::Artistic,
        ] {
            assert!(all.iter().any(|p| p.category == category), "{category:?}");
        }
    }

    #[test]
    fn test_preset_configs_are_in_range() {
        for preset in presets() {
            assert!(preset.config.validate().is_ok(), "{}", preset.id);
        }
    }

    #[test]
    fn test_find_preset() {
        let sepia = find_preset("SEPIA").unwrap();
        assert_eq!(sepia.config.sepia, 100.0);
        assert_eq!(
            find_preset("sketch").unwrap().effect,
            Some(ArtisticEffect::Sketch)
        );
        assert!(find_preset("nope").is_none());
    }
}
