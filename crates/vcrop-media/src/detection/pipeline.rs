//! Per-request detection pipeline.
//!
//! Runs the stages enabled by a [`DetectionProfile`] on every sampled frame,
//! combines the stage outputs per frame, then reduces the frames to a
//! consensus rectangle.

use serde::Serialize;
use tracing::{debug, info};
use vcrop_models::{DetectionParams, DetectionProfile, Rectangle};

use super::consensus::{intersect_step, Consensus, ConsensusBox};
use super::content_box::detect_content_box;
use super::dark_band::{detect_dark_bands, BandCuts};
use super::frame::FrameSample;
use super::overlay::{detect_overlay, OverlayBounds};
use crate::error::{MediaError, MediaResult};

/// Stage outputs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDetection {
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<BandCuts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_box: Option<Rectangle>,
    /// Intersection of the enabled stages for this frame
    pub combined: Rectangle,
}

/// Result of running the pipeline over all sampled frames.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRun {
    /// Frame dimensions the rectangles refer to
    pub width: u32,
    pub height: u32,
    pub frames: Vec<FrameDetection>,
    pub consensus: ConsensusBox,
}

/// Stateless detector configuration for one request.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    profile: DetectionProfile,
    params: DetectionParams,
}

impl DetectionPipeline {
    pub fn new(profile: DetectionProfile, params: DetectionParams) -> Self {
        Self { profile, params }
    }

    pub fn profile(&self) -> &DetectionProfile {
        &self.profile
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Run the enabled stages on one frame.
    ///
    /// A stage whose output leaves no usable region contributes the full
    /// frame instead, so a glitching detector never shrinks the result.
    pub fn detect_frame(&self, frame: &FrameSample) -> FrameDetection {
        let (width, height) = (frame.width(), frame.height());
        let full = Rectangle::full_frame(width, height);
        let floor = self.params.consensus.collapse_floor.max(1);

        let bands = self
            .profile
            .dark_band
            .then(|| detect_dark_bands(frame, &self.params.dark_band));
        let overlay = self
            .profile
            .text_overlay
            .then(|| detect_overlay(frame, &self.params.overlay));
        let content_box = self
            .profile
            .content_box
            .then(|| detect_content_box(frame, &self.params.content_box));

        let stage_rects = [
            bands.map(|b| b.to_rect(width, height).unwrap_or(full)),
            overlay.map(|o| o.to_rect(width).unwrap_or(full)),
            content_box,
        ];

        let combined = stage_rects
            .iter()
            .flatten()
            .fold(full, |acc, rect| intersect_step(&acc, rect, floor).0);

        debug!(
            timestamp = frame.timestamp(),
            ?bands,
            ?overlay,
            ?content_box,
            combined = %combined,
            "Frame detection"
        );

        FrameDetection {
            timestamp: frame.timestamp(),
            bands,
            overlay,
            content_box,
            combined,
        }
    }

    /// Run the pipeline over every frame and reduce to a consensus.
    ///
    /// All frames must share the dimensions of the first one; frames that
    /// differ are skipped. Fails only when there are no frames.
    pub fn run(&self, frames: &[FrameSample]) -> MediaResult<DetectionRun> {
        let first = frames
            .first()
            .ok_or(MediaError::NoFramesExtracted { attempted: 0 })?;
        let (width, height) = (first.width(), first.height());

        let mut consensus = Consensus::new(self.params.consensus.collapse_floor);
        let mut detections = Vec::with_capacity(frames.len());

        for frame in frames {
            if (frame.width(), frame.height()) != (width, height) {
                debug!(
                    timestamp = frame.timestamp(),
                    "Skipping frame with mismatched dimensions"
                );
                continue;
            }
            let detection = self.detect_frame(frame);
            consensus.push(detection.combined);
            detections.push(detection);
        }

        let consensus = consensus
            .finish()
            .ok_or(MediaError::NoFramesExtracted { attempted: frames.len() })?;

        info!(
            profile = %self.profile.name,
            frames = detections.len(),
            rejected = consensus.rejected,
            rect = %consensus.rect,
            "Consensus crop detected"
        );

        Ok(DetectionRun {
            width,
            height,
            frames: detections,
            consensus,
        })
    }
}
