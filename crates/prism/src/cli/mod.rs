//! Command implementations.

pub mod batch;
pub mod common;
pub mod config;
pub mod convert;
pub mod crop;
pub mod filter;
pub mod presets;
pub mod resize;
