//! Multipart upload intake.
//!
//! The `file` field is streamed to disk inside a per-request temporary
//! directory; every other field is a crop parameter.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use vcrop_models::CropParams;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Name of the multipart field carrying the video.
pub const FILE_FIELD: &str = "file";

/// A received upload. Its directory is deleted when this is dropped.
#[derive(Debug)]
pub struct Upload {
    dir: TempDir,
    input: PathBuf,
    file_name: Option<String>,
    size: u64,
    pub params: CropParams,
}

impl Upload {
    /// Path of the uploaded video.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path for transcoded output, inside the same directory.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("output.mp4")
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Download name for the cropped file, derived from the upload name.
    pub fn download_name(&self) -> String {
        let stem = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .map(|stem| {
                stem.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                    .take(80)
                    .collect::<String>()
            })
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "video".to_string());
        format!("{}_cropped.mp4", stem)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// Keep a short alphanumeric extension so ffprobe sees a familiar name.
fn input_extension(file_name: Option<&str>) -> &str {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
}

async fn save_field(mut field: Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Read the whole multipart body into an [`Upload`].
pub async fn read_upload(mut multipart: Multipart, config: &ApiConfig) -> ApiResult<Upload> {
    let dir = tempfile::Builder::new()
        .prefix("vcrop-req-")
        .tempdir_in(&config.work_dir)?;

    let mut params = config.default_crop_params();
    let mut received: Option<(PathBuf, Option<String>, u64)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            if received.is_some() {
                return Err(ApiError::bad_request("only one 'file' field is allowed"));
            }
            let file_name = field.file_name().map(str::to_string);
            let path = dir
                .path()
                .join(format!("input.{}", input_extension(file_name.as_deref())));
            let size = save_field(field, &path).await?;
            debug!(size, file_name = ?file_name, "Upload saved");
            received = Some((path, file_name, size));
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            params.apply_field(&name, &value)?;
        }
    }

    params.validate()?;

    let (input, file_name, size) =
        received.ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;
    if size == 0 {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    Ok(Upload {
        dir,
        input,
        file_name,
        size,
        params,
    })
}
