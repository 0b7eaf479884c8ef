//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid rectangle: {0}")]
    InvalidRectangle(String),

    #[error("Invalid value for '{param}': {reason}")]
    InvalidParam { param: String, reason: String },

    #[error("Unknown detection profile: {0}")]
    UnknownProfile(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl ModelError {
    pub fn invalid_rectangle(msg: impl Into<String>) -> Self {
        Self::InvalidRectangle(msg.into())
    }

    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            param: param.into(),
            reason: reason.into(),
        }
    }
}
