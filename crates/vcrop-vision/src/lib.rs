//! Vision-model crop refinement.
//!
//! This crate provides:
//! - A Gemini-compatible client that sends sampled frames plus the safe region
//! - A strict parser for free-text answers with embedded JSON
//! - The refinement gate, which clamps answers and falls back on any failure

pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod parse;
pub mod prompt;
pub mod types;

pub use client::{CropAdvisor, VisionClient};
pub use config::VisionConfig;
pub use error::{VisionError, VisionResult};
pub use gate::{constrain, RefinementGate};
pub use types::{CropSuggestion, EncodedFrame, RefinedCrop, RefinementRequest, RefinementSource};
