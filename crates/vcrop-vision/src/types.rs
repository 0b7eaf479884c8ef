//! Refinement request and result types.

use serde::{Deserialize, Serialize};
use vcrop_models::{Rectangle, SignedRect};

/// A frame encoded for transport to the reasoning service.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub timestamp: f64,
    /// JPEG bytes
    pub jpeg: Vec<u8>,
}

/// Everything the reasoning service is told about one crop.
#[derive(Debug, Clone)]
pub struct RefinementRequest {
    /// Hard boundary for the answer
    pub safe_region: Rectangle,
    pub source_width: u32,
    pub source_height: u32,
    pub frames: Vec<EncodedFrame>,
}

/// Raw, untrusted answer from the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSuggestion {
    pub rect: SignedRect,
    pub confidence: Option<f64>,
    pub reason: Option<String>,
}

/// Where the final rectangle came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RefinementSource {
    /// Model answer, clamped into the safe region
    Model {
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rationale: Option<String>,
        /// Whether clamping or the width policy changed the answer
        adjusted: bool,
    },
    /// Consensus rectangle, used because refinement failed
    Fallback { reason: String },
}

/// Output of the refinement gate. `rect` always lies inside the safe region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedCrop {
    pub rect: Rectangle,
    #[serde(flatten)]
    pub source: RefinementSource,
}

impl RefinedCrop {
    pub fn fallback(rect: Rectangle, reason: impl Into<String>) -> Self {
        Self {
            rect,
            source: RefinementSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, RefinementSource::Fallback { .. })
    }
}
