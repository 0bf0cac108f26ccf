//! Crop planning and extraction.
//!
//! [`CropPlanner`] turns detections into a [`SmartCropResult`];
//! [`apply_crop_shape`] cuts the planned (or user-supplied) [`CropArea`] out
//! of the raster. Both go through [`CropArea::clamp_to`], so automatic and
//! manual crops obey the same bounds rules.

mod area;
mod planner;
mod shape;

pub use area::{AspectRatio, CropArea};
pub use planner::{CropPlanner, SmartCropResult};
pub use shape::{apply_crop_shape, CropShape};
