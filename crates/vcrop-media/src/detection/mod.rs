//! Pixel heuristics that locate the content region of a frame.
//!
//! Every detector is a pure function of one [`FrameSample`] and its explicit
//! parameters. The [`DetectionPipeline`] chooses which detectors run and
//! reconciles their output across frames.

pub mod consensus;
pub mod content_box;
pub mod dark_band;
pub mod frame;
pub mod overlay;
pub mod pipeline;

pub use consensus::{consensus, intersect_step, Consensus, ConsensusBox};
pub use content_box::detect_content_box;
pub use dark_band::{detect_dark_bands, BandCuts};
pub use frame::{luma, FrameSample};
pub use overlay::{detect_overlay, OverlayBounds};
pub use pipeline::{DetectionPipeline, DetectionRun, FrameDetection};
