//! Vision client errors.
//!
//! None of these are fatal to a crop request: the refinement gate turns every
//! variant into a fallback to the consensus rectangle.

use thiserror::Error;

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision API key not configured")]
    MissingApiKey,

    #[error("Vision request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Vision request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Vision service returned {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("Vision service returned no text")]
    EmptyResponse,

    #[error("No JSON object found in vision response")]
    NoJsonObject,

    #[error("Invalid crop suggestion: {0}")]
    InvalidSuggestion(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisionError {
    pub fn invalid_suggestion(msg: impl Into<String>) -> Self {
        Self::InvalidSuggestion(msg.into())
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            VisionError::MissingApiKey => "not_configured",
            VisionError::Network(_) => "network",
            VisionError::Timeout(_) => "timeout",
            VisionError::ServiceError { .. } => "service_error",
            VisionError::EmptyResponse => "empty_response",
            VisionError::NoJsonObject => "no_json",
            VisionError::InvalidSuggestion(_) | VisionError::Json(_) => "invalid_response",
        }
    }
}
