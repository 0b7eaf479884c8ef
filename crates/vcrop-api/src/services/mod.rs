//! Business logic services.

pub mod cropper;

pub use cropper::{CropOutcome, CropPlan, CropService, CropSource};
