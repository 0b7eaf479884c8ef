//! Crop orchestration: probe, sample, detect, refine, apply.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};
use vcrop_media::{
    apply_crop, probe_video, DetectionPipeline, DetectionRun, FfmpegRunner, FrameSample,
    FrameSampler, MediaError, Trim, VideoInfo,
};
use vcrop_models::{CropMode, CropParams, EncodingConfig, ProfileName, Rectangle};
use vcrop_vision::{EncodedFrame, RefinedCrop, RefinementGate, RefinementRequest, VisionConfig};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Where the final crop rectangle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CropSource {
    /// Caller-supplied coordinates
    Fixed,
    /// Pixel-detector consensus
    Detected,
    /// Model answer, clamped into the consensus region
    Model,
    /// Refinement was attempted but the consensus was kept
    Fallback,
}

impl CropSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropSource::Fixed => "fixed",
            CropSource::Detected => "detected",
            CropSource::Model => "model",
            CropSource::Fallback => "fallback",
        }
    }
}

/// Everything decided about a request before transcoding.
#[derive(Debug, Clone, Serialize)]
pub struct CropPlan {
    pub video: VideoInfo,
    pub mode: CropMode,
    pub profile: ProfileName,
    /// Dimensions the rectangle is expressed in
    pub source_width: u32,
    pub source_height: u32,
    /// Timestamps that produced a frame
    pub timestamps: Vec<f64>,
    /// Timestamps whose extraction failed
    pub skipped: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionRun>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinedCrop>,
    pub rect: Rectangle,
    pub source: CropSource,
}

/// A finished crop: the plan plus the rectangle actually applied.
#[derive(Debug, Clone)]
pub struct CropOutcome {
    pub plan: CropPlan,
    /// Even-aligned rectangle passed to ffmpeg
    pub applied: Rectangle,
}

/// Runs the detection pipeline and crop application for one request at a time.
///
/// Holds no per-request state; concurrent requests share it freely.
#[derive(Debug, Clone)]
pub struct CropService {
    sampler: FrameSampler,
    runner: FfmpegRunner,
    gate: RefinementGate,
    encoding: EncodingConfig,
    jpeg_quality: u8,
    max_model_frames: usize,
}

impl CropService {
    pub fn new(config: &ApiConfig, vision: &VisionConfig, gate: RefinementGate) -> Self {
        Self {
            sampler: FrameSampler::new().with_work_dir(&config.work_dir),
            runner: FfmpegRunner::new().with_timeout(config.ffmpeg_timeout_secs),
            gate,
            encoding: config.encoding.clone(),
            jpeg_quality: vision.jpeg_quality,
            max_model_frames: vision.max_frames,
        }
    }

    /// Whether an external advisor is configured.
    pub fn refinement_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Decide the crop rectangle for `input` without transcoding.
    pub async fn plan(&self, input: &Path, params: &CropParams) -> ApiResult<CropPlan> {
        let video = probe_video(input).await?;
        debug!(
            width = video.width,
            height = video.height,
            duration = video.duration,
            "Probed upload"
        );

        match params.mode {
            CropMode::Fixed => self.plan_fixed(video, params),
            CropMode::Auto => self.plan_detected(input, video, params).await,
        }
    }

    fn plan_fixed(&self, video: VideoInfo, params: &CropParams) -> ApiResult<CropPlan> {
        let rect = params.fixed.unwrap_or_default().resolve()?;
        rect.validate_within(video.width, video.height, 1)
            .map_err(|e| ApiError::invalid_param("crop", e.to_string()))?;

        info!(rect = %rect, "Using fixed crop");

        Ok(CropPlan {
            mode: CropMode::Fixed,
            profile: params.profile,
            source_width: video.width,
            source_height: video.height,
            video,
            timestamps: Vec::new(),
            skipped: Vec::new(),
            detection: None,
            refinement: None,
            rect,
            source: CropSource::Fixed,
        })
    }

    async fn plan_detected(
        &self,
        input: &Path,
        video: VideoInfo,
        params: &CropParams,
    ) -> ApiResult<CropPlan> {
        let batch = self
            .sampler
            .sample_representative(input, &video, params.sample_count)
            .await?;
        metrics::record_frames_sampled(batch.frames.len(), batch.skipped.len());

        let timestamps: Vec<f64> = batch.frames.iter().map(FrameSample::timestamp).collect();
        let profile = params.profile.profile();
        let pipeline = DetectionPipeline::new(profile, params.detection.clone());
        let encode = profile.refine.then_some((self.max_model_frames, self.jpeg_quality));

        // Pixel scans are CPU-bound; keep them off the async workers
        let started = Instant::now();
        let frames = batch.frames;
        let (run, encoded) = tokio::task::spawn_blocking(move || {
            let run = pipeline.run(&frames)?;
            let encoded = match encode {
                Some((max, quality)) => encode_for_model(&frames, max, quality),
                None => Vec::new(),
            };
            Ok::<_, MediaError>((run, encoded))
        })
        .await
        .map_err(|e| ApiError::internal(format!("detection task failed: {}", e)))??;
        metrics::record_detection_duration(profile.name.as_str(), started.elapsed().as_secs_f64());

        let safe = run.consensus.rect;
        let (rect, refinement, source) = if profile.refine {
            let refined = self.refine(&run, encoded, params).await;
            let source = if refined.is_fallback() {
                CropSource::Fallback
            } else {
                CropSource::Model
            };
            (refined.rect, Some(refined), source)
        } else {
            (safe, None, CropSource::Detected)
        };

        Ok(CropPlan {
            mode: CropMode::Auto,
            profile: params.profile,
            source_width: run.width,
            source_height: run.height,
            video,
            timestamps,
            skipped: batch.skipped,
            detection: Some(run),
            refinement,
            rect,
            source,
        })
    }

    async fn refine(
        &self,
        run: &DetectionRun,
        frames: Vec<EncodedFrame>,
        params: &CropParams,
    ) -> RefinedCrop {
        let safe = run.consensus.rect;
        let refined = if frames.is_empty() {
            warn!("No frames could be encoded for refinement");
            RefinedCrop::fallback(safe, "no_frames")
        } else {
            let request = RefinementRequest {
                safe_region: safe,
                source_width: run.width,
                source_height: run.height,
                frames,
            };
            self.gate.refine(&request, &params.detection.refinement).await
        };

        metrics::record_refinement(if refined.is_fallback() {
            "fallback"
        } else {
            "accepted"
        });
        refined
    }

    /// Plan the crop and transcode `input` into `output`.
    pub async fn crop(&self, input: &Path, output: &Path, params: &CropParams) -> ApiResult<CropOutcome> {
        let plan = self.plan(input, params).await?;

        let started = Instant::now();
        let applied = apply_crop(
            input,
            output,
            &plan.rect,
            (plan.source_width, plan.source_height),
            Trim {
                start: params.start,
                duration: params.duration,
            },
            &self.encoding,
            &self.runner,
        )
        .await?;
        metrics::record_transcode_duration(started.elapsed().as_secs_f64());

        info!(
            rect = %applied,
            source = plan.source.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crop applied"
        );

        Ok(CropOutcome { plan, applied })
    }
}

/// JPEG-encode up to `max` frames, spread evenly across the batch.
fn encode_for_model(frames: &[FrameSample], max: usize, quality: u8) -> Vec<EncodedFrame> {
    pick_evenly(frames.len(), max)
        .into_iter()
        .filter_map(|index| {
            let frame = &frames[index];
            match frame.to_jpeg(quality) {
                Ok(jpeg) => Some(EncodedFrame {
                    timestamp: frame.timestamp(),
                    jpeg,
                }),
                Err(e) => {
                    warn!(timestamp = frame.timestamp(), error = %e, "JPEG encoding failed");
                    None
                }
            }
        })
        .collect()
}

/// Indices of `count` items spread across `len`, first and last included.
fn pick_evenly(len: usize, count: usize) -> Vec<usize> {
    let count = count.min(len);
    match count {
        0 => Vec::new(),
        1 => vec![len / 2],
        _ => (0..count).map(|i| i * (len - 1) / (count - 1)).collect(),
    }
}
