//! Crop endpoint: upload a video, receive the cropped MP4.

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Extension;
use tracing::{field, info, info_span, Instrument, Span};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{CROP_RECT_HEADER, CROP_SOURCE_HEADER};
use crate::state::AppState;
use crate::upload::read_upload;

/// Crop an uploaded video.
///
/// Responds with the re-encoded file and `X-Crop-Rect` / `X-Crop-Source`
/// headers describing the rectangle applied.
pub async fn crop_video(
    State(state): State<AppState>,
    Extension(request_id): Extension<String>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let span = info_span!("crop_request", request_id = %request_id, profile = field::Empty);

    async move {
        let upload = read_upload(multipart, &state.config).await?;
        Span::current().record("profile", upload.params.profile.as_str());
        info!(size = upload.size(), mode = ?upload.params.mode, "Crop requested");

        let output = upload.output_path();
        let outcome = state
            .cropper
            .crop(upload.input(), &output, &upload.params)
            .await?;

        // Upload directory (and output) is removed when `upload` drops
        let bytes = tokio::fs::read(&output).await?;

        let disposition = format!("attachment; filename=\"{}\"", upload.download_name());
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "video/mp4")
            .header(header::CONTENT_LENGTH, bytes.len())
            .header(header::CONTENT_DISPOSITION, disposition)
            .header(CROP_RECT_HEADER, outcome.applied.to_header_value())
            .header(CROP_SOURCE_HEADER, outcome.plan.source.as_str())
            .body(Body::from(bytes))
            .map_err(|e| ApiError::internal(format!("failed to build response: {}", e)))
    }
    .instrument(span)
    .await
}
