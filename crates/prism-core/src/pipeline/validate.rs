//! Input gate applied before a file enters the pipeline.

use crate::config::LimitsConfig;
use crate::error::{ProcessError, ProcessResult};

/// Validates source bytes before decoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks:
    /// - Size is within limits
    /// - Content starts with known image magic bytes
    pub fn validate(&self, name: &str, bytes: &[u8]) -> ProcessResult<()> {
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if bytes.len() as u64 > max_bytes {
            return Err(ProcessError::FileTooLarge {
                name: name.to_string(),
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if bytes.len() < 4 {
            return Err(ProcessError::invalid_input(
                name,
                "File too small to be a valid image",
            ));
        }

        if !Self::is_valid_image_header(bytes) {
            return Err(ProcessError::invalid_input(
                name,
                "Unrecognized image format (invalid magic bytes)",
            ));
        }

        Ok(())
    }

    /// Check if the leading bytes match known image formats.
    fn is_valid_image_header(header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            if header.len() >= 12 {
                return &header[8..12] == b"WEBP";
            }
            // Could be WebP, allow it to proceed
            return true;
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        if header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
        {
            return true;
        }

        // AVIF/HEIF: ftyp box at offset 4
        header.len() >= 12 && &header[4..8] == b"ftyp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(LimitsConfig::default())
    }

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_riff_wave_rejected() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_tiff() {
        assert!(Validator::is_valid_image_header(&[b'I', b'I', 0x2A, 0x00]));
        assert!(Validator::is_valid_image_header(&[b'M', b'M', 0x00, 0x2A]));
        assert!(!Validator::is_valid_image_header(&[b'I', b'I', 0x00, 0x00]));
    }

    #[test]
    fn test_magic_bytes_invalid() {
        let header = [0x00; 12];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_validate_too_small() {
        let err = validator().validate("tiny.png", &[0x89, b'P']).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_validate_too_large() {
        let validator = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        let mut bytes = vec![0xFF, 0xD8, 0xFF];
        bytes.resize(2 * 1024 * 1024, 0);
        let err = validator.validate("big.jpg", &bytes).unwrap_err();
        assert_eq!(err.kind(), "file_too_large");
    }

    #[test]
    fn test_huge_size_limit_does_not_overflow() {
        let validator = Validator::new(LimitsConfig {
            max_file_size_mb: u64::MAX,
            ..LimitsConfig::default()
        });
        assert!(validator.validate("ok.jpg", &[0xFF, 0xD8, 0xFF, 0xE0]).is_ok());
    }
}
