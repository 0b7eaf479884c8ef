//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vcrop_media::{check_ffmpeg, check_ffprobe, MediaResult};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    /// Informational; requests fall back to consensus when disabled
    pub refinement: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CheckStatus {
    fn from_binary(result: MediaResult<std::path::PathBuf>) -> Self {
        match result {
            Ok(path) => Self {
                status: "ok".to_string(),
                error: None,
                path: Some(path.display().to_string()),
            },
            Err(e) => Self {
                status: "error".to_string(),
                error: Some(e.to_string()),
                path: None,
            },
        }
    }

    fn flag(enabled: bool) -> Self {
        Self {
            status: if enabled { "enabled" } else { "disabled" }.to_string(),
            error: None,
            path: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that the ffmpeg and ffprobe binaries are on PATH.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg = CheckStatus::from_binary(check_ffmpeg());
    let ffprobe = CheckStatus::from_binary(check_ffprobe());
    let all_ok = ffmpeg.is_ok() && ffprobe.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg,
            ffprobe,
            refinement: CheckStatus::flag(state.cropper.refinement_enabled()),
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
