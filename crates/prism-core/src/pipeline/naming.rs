//! Output file naming.

use std::path::Path;

use super::encode::OutputFormat;

/// Suffix appended to the source stem, describing what was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSuffix {
    Resized,
    Cropped,
    Filtered,
    Converted,
}

impl NameSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resized => "resized",
            Self::Cropped => "cropped",
            Self::Filtered => "filtered",
            Self::Converted => "converted",
        }
    }
}

/// `<stem>_<suffix>.<ext>` for a source called `original`.
///
/// Directory components are dropped; a missing stem becomes `image`.
pub fn derive_name(original: &str, suffix: NameSuffix, format: OutputFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}_{}.{}", suffix.as_str(), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_name() {
        assert_eq!(
            derive_name("holiday.png", NameSuffix::Cropped, OutputFormat::Png),
            "holiday_cropped.png"
        );
        assert_eq!(
            derive_name("dir/IMG_0001.HEIC.jpeg", NameSuffix::Converted, OutputFormat::WebP),
            "IMG_0001.HEIC_converted.webp"
        );
        assert_eq!(
            derive_name("", NameSuffix::Filtered, OutputFormat::Jpeg),
            "image_filtered.jpg"
        );
    }
}
