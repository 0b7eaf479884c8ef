//! FFmpeg wrapper and crop detection for the crop service.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - Video probing via ffprobe
//! - Frame sampling into decoded RGBA buffers
//! - Pixel detectors (dark bands, text overlays, content box) and consensus
//! - Crop application with even alignment

pub mod command;
pub mod crop;
pub mod detection;
pub mod error;
pub mod probe;
pub mod progress;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use crop::{apply_crop, build_crop_command, Trim};
pub use detection::{
    BandCuts, ConsensusBox, DetectionPipeline, DetectionRun, FrameDetection, FrameSample,
    OverlayBounds,
};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use sampler::{representative_timestamps, FrameSampler, SampleBatch};
