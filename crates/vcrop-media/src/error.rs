//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("No frames could be extracted ({attempted} timestamps attempted)")]
    NoFramesExtracted { attempted: usize },

    #[error("Invalid value for '{param}': {reason}")]
    InvalidParams { param: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid parameter error naming the parameter.
    pub fn invalid_params(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error is caused by the caller's media or parameters
    /// rather than by the service.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidVideo(_)
                | MediaError::NoFramesExtracted { .. }
                | MediaError::InvalidParams { .. }
                | MediaError::FileNotFound(_)
                | MediaError::FfprobeFailed { .. }
        )
    }

    /// Diagnostic output of the external tool, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

impl From<vcrop_models::ModelError> for MediaError {
    fn from(err: vcrop_models::ModelError) -> Self {
        match err {
            vcrop_models::ModelError::InvalidParam { param, reason } => {
                Self::InvalidParams { param, reason }
            }
            other => Self::InvalidParams {
                param: "params".to_string(),
                reason: other.to_string(),
            },
        }
    }
}
