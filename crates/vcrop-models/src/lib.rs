//! Shared data models for the crop service.
//!
//! This crate provides Serde-serializable types for:
//! - Crop rectangles and clamping
//! - Detector thresholds and profiles
//! - Per-request crop parameters
//! - Output encoding configuration

pub mod encoding;
pub mod error;
pub mod params;
pub mod profile;
pub mod rect;
pub mod request;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use params::{
    ConsensusParams, ContentBoxParams, DarkBandParams, DetectionParams, OverlayParams,
    RefinementParams,
};
pub use profile::{CropMode, DetectionProfile, ProfileName, WidthPolicy};
pub use rect::{Rectangle, SignedRect};
pub use request::{CropParams, FixedCrop, DEFAULT_SAMPLE_COUNT, MAX_SAMPLE_COUNT};
