//! Frame sampling.
//!
//! Frames are extracted one timestamp at a time into a per-request temporary
//! directory. A failed timestamp is skipped; the batch fails only when no
//! frame survives.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vcrop_models::MAX_SAMPLE_COUNT;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::detection::FrameSample;
use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Fraction of the duration skipped at each end.
const EDGE_MARGIN: f64 = 0.08;

/// Per-frame extraction timeout.
const DEFAULT_FRAME_TIMEOUT_SECS: u64 = 60;

/// `count` timestamps spread over the middle of a clip.
///
/// Timestamps sit at bucket centres of `[0.08 d, 0.92 d]`, so they are
/// strictly increasing and avoid opening and closing transitions. An unknown
/// or zero duration yields a single timestamp at 0.
pub fn representative_timestamps(duration: f64, count: u32) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return vec![0.0];
    }

    let n = count.clamp(1, MAX_SAMPLE_COUNT);
    let start = duration * EDGE_MARGIN;
    let span = duration * (1.0 - 2.0 * EDGE_MARGIN);

    (0..n)
        .map(|i| start + span * (i as f64 + 0.5) / n as f64)
        .collect()
}

/// Frames that survived extraction.
#[derive(Debug)]
pub struct SampleBatch {
    pub frames: Vec<FrameSample>,
    /// Timestamps whose extraction or decode failed
    pub skipped: Vec<f64>,
}

/// Extracts decoded frames at chosen timestamps.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    work_dir: Option<PathBuf>,
    runner: FfmpegRunner,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSampler {
    pub fn new() -> Self {
        Self {
            work_dir: None,
            runner: FfmpegRunner::new().with_timeout(DEFAULT_FRAME_TIMEOUT_SECS),
        }
    }

    /// Create temporary frame directories under `dir` instead of the system temp dir.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Per-frame extraction timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = FfmpegRunner::new().with_timeout(secs);
        self
    }

    /// Sample `count` representative frames of a probed video.
    pub async fn sample_representative(
        &self,
        input: &Path,
        info: &VideoInfo,
        count: u32,
    ) -> MediaResult<SampleBatch> {
        let timestamps = representative_timestamps(info.duration, count);
        self.sample(input, &timestamps).await
    }

    /// Extract one frame per timestamp, sequentially.
    ///
    /// The temporary directory is removed when this future completes or is
    /// dropped.
    pub async fn sample(&self, input: &Path, timestamps: &[f64]) -> MediaResult<SampleBatch> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vcrop-frames-");
        let temp_dir = match &self.work_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };

        let mut frames = Vec::with_capacity(timestamps.len());
        let mut skipped = Vec::new();

        for (index, &timestamp) in timestamps.iter().enumerate() {
            let frame_path = temp_dir.path().join(format!("frame_{:03}.png", index));
            match self.extract_frame(input, timestamp, &frame_path).await {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    warn!(timestamp, error = %e, "Frame extraction failed, skipping");
                    skipped.push(timestamp);
                }
            }
        }

        if frames.is_empty() {
            return Err(MediaError::NoFramesExtracted {
                attempted: timestamps.len(),
            });
        }

        debug!(
            sampled = frames.len(),
            skipped = skipped.len(),
            "Frame sampling complete"
        );

        Ok(SampleBatch { frames, skipped })
    }

    async fn extract_frame(&self, input: &Path, timestamp: f64, frame_path: &Path) -> MediaResult<FrameSample> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(MediaError::invalid_params(
                "timestamp",
                format!("{} is not a valid position", timestamp),
            ));
        }

        let cmd = FfmpegCommand::new(input, frame_path)
            .seek(timestamp)
            .single_frame();
        self.runner.run(&cmd).await?;

        let bytes = tokio::fs::read(frame_path).await?;
        let frame = FrameSample::decode(&bytes, timestamp)?;

        // Decoded pixels are all we keep
        let _ = tokio::fs::remove_file(frame_path).await;

        Ok(frame)
    }
}
