//! Per-image pipeline stages.
//!
//! - **validate**: size and magic-byte gate before decoding
//! - **decode**: sniff and decode bytes into a [`RasterImage`]
//! - **encode**: write a raster in the target format
//! - **naming**: derived output file names
//! - **discovery**: find image files in directories
//! - **processor**: runs one file through all of the above

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod naming;
pub mod processor;
pub mod validate;

pub use decode::{format_to_string, RasterDecoder, RasterImage};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::{compression_delta, EncodeOptions, EncodedImage, FormatEncoder, OutputFormat};
pub use naming::{derive_name, NameSuffix};
pub use processor::{ImageProcessor, Operation, ProcessOptions, ProcessedOutput};
pub use validate::Validator;
