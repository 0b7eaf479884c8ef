//! Detection endpoint: report the crop decision without transcoding.

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use tracing::{field, info, info_span, Instrument, Span};

use crate::error::{ApiError, ApiResult};
use crate::services::CropPlan;
use crate::state::AppState;
use crate::upload::read_upload;

/// Run detection on an uploaded video and return the full report.
pub async fn detect_crop(
    State(state): State<AppState>,
    Extension(request_id): Extension<String>,
    multipart: Multipart,
) -> ApiResult<Json<CropPlan>> {
    let span = info_span!("crop_request", request_id = %request_id, profile = field::Empty);

    async move {
        let upload = read_upload(multipart, &state.config).await?;
        Span::current().record("profile", upload.params.profile.as_str());

        let plan = state.cropper.plan(upload.input(), &upload.params).await?;
        info!(rect = %plan.rect, source = plan.source.as_str(), "Detection complete");

        Ok::<_, ApiError>(Json(plan))
    }
    .instrument(span)
    .await
}
