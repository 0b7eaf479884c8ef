//! Crop application.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use vcrop_models::{EncodingConfig, Rectangle};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Optional trim applied before cropping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trim {
    pub start: Option<f64>,
    pub duration: Option<f64>,
}

/// Build the ffmpeg command for cropping `input` to `rect`.
///
/// The rectangle is aligned to even offsets and dimensions by shrinking it,
/// which 4:2:0 encoders require.
pub fn build_crop_command(
    input: &Path,
    output: &Path,
    rect: &Rectangle,
    trim: Trim,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let aligned = rect.align_even();

    let mut cmd = FfmpegCommand::new(input, output);
    if let Some(start) = trim.start.filter(|s| *s > 0.0) {
        cmd = cmd.seek(start);
    }
    if let Some(duration) = trim.duration {
        cmd = cmd.duration(duration);
    }

    cmd.video_filter(aligned.to_crop_filter())
        .output_args(encoding.to_ffmpeg_args())
}

/// Crop and re-encode `input` into `output`.
///
/// Returns the rectangle actually applied after even alignment. The
/// rectangle must fit inside the `source_width x source_height` frame.
pub async fn apply_crop(
    input: &Path,
    output: &Path,
    rect: &Rectangle,
    source: (u32, u32),
    trim: Trim,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<Rectangle> {
    let (source_width, source_height) = source;
    rect.validate_within(source_width, source_height, 1)
        .map_err(|e| MediaError::invalid_params("crop", e.to_string()))?;

    let aligned = rect.align_even();
    let cmd = build_crop_command(input, output, rect, trim, encoding);

    info!(
        rect = %aligned,
        start = ?trim.start,
        duration = ?trim.duration,
        "Applying crop"
    );

    let last_logged = Arc::new(AtomicI64::new(0));
    runner
        .run_with_progress(&cmd, move |progress| {
            // Log roughly every ten seconds of output
            let seconds = progress.out_time_ms / 1000;
            if progress.is_complete || seconds - last_logged.load(Ordering::Relaxed) >= 10 {
                last_logged.store(seconds, Ordering::Relaxed);
                debug!(
                    out_seconds = seconds,
                    speed = progress.speed,
                    complete = progress.is_complete,
                    "Crop progress"
                );
            }
        })
        .await?;

    if !tokio::fs::try_exists(output).await.unwrap_or(false) {
        return Err(MediaError::ffmpeg_failed(
            "FFmpeg finished without writing output",
            None,
            None,
        ));
    }

    Ok(aligned)
}
