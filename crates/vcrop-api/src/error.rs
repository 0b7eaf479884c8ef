//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vcrop_media::MediaError;
use vcrop_models::ModelError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid value for '{param}': {reason}")]
    InvalidParam { param: String, reason: String },

    #[error("Upload too large")]
    PayloadTooLarge,

    #[error("Unusable media: {0}")]
    UnprocessableMedia(String),

    #[error("Transcoding failed: {message}")]
    Transcode {
        message: String,
        diagnostic: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidParam { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnprocessableMedia(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Transcode { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::InvalidParam { .. } => "invalid_parameter",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::UnprocessableMedia(_) => "unprocessable_media",
            ApiError::Transcode { .. } => "transcode_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidParam { param, reason } => Self::InvalidParam { param, reason },
            ModelError::UnknownProfile(name) => Self::InvalidParam {
                param: "profile".to_string(),
                reason: format!("unknown profile '{}'", name),
            },
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidParams { param, reason } => Self::InvalidParam { param, reason },
            e if e.is_input_error() => Self::UnprocessableMedia(e.to_string()),
            MediaError::FfmpegFailed {
                message, stderr, ..
            } => Self::Transcode {
                message,
                diagnostic: stderr,
            },
            MediaError::Timeout(secs) => Self::Transcode {
                message: format!("ffmpeg timed out after {} seconds", secs),
                diagnostic: None,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Transcode { .. } => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else if let ApiError::Transcode {
                    diagnostic: Some(diagnostic),
                    ..
                } = &self
                {
                    format!("{}\n{}", self, diagnostic)
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}
