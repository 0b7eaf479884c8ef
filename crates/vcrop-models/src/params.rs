//! Tunable thresholds for the crop detectors.
//!
//! Every stage receives its parameters explicitly; nothing is read from
//! ambient request state. Defaults are the values the detectors are tuned for.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::ModelResult;
use crate::profile::WidthPolicy;

/// Hard cap on the top overlay scan window, as a fraction of frame height.
pub const OVERLAY_TOP_SCAN_CAP: f64 = 0.45;
/// Hard cap on the bottom overlay scan window, as a fraction of frame height.
pub const OVERLAY_BOTTOM_SCAN_CAP: f64 = 0.30;

/// Floor below which a consensus intersection counts as collapsed.
pub const DEFAULT_COLLAPSE_FLOOR: u32 = 10;
/// Minimum width/height of a refined crop.
pub const DEFAULT_REFINEMENT_MIN_SIZE: u32 = 10;

fn finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("not_finite"))
    }
}

/// Parameters for the dark-band detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DarkBandParams {
    /// Mean row luma below this is "dark" (0-255)
    #[validate(custom(function = "finite"), range(min = 0.0, max = 255.0))]
    pub dark_threshold: f64,
    /// Bands shorter than this fraction of the height are discarded
    #[validate(custom(function = "finite"), range(min = 0.0, max = 0.5))]
    pub min_band_ratio: f64,
    /// The scan never walks further than this fraction of the height
    #[validate(custom(function = "finite"), range(min = 0.0, max = 0.5))]
    pub max_band_ratio: f64,
}

impl Default for DarkBandParams {
    fn default() -> Self {
        Self {
            dark_threshold: 35.0,
            min_band_ratio: 0.03,
            max_band_ratio: 0.35,
        }
    }
}

/// Parameters for the text-on-dark overlay detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OverlayParams {
    /// Pixels at or below this luma are dark
    pub dark_lum: u8,
    /// Pixels at or above this luma are bright (caption text)
    pub white_lum: u8,
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub min_dark_ratio: f64,
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub min_white_ratio: f64,
    /// Top scan window; capped at [`OVERLAY_TOP_SCAN_CAP`]
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub top_scan_ratio: f64,
    /// Bottom scan window; capped at [`OVERLAY_BOTTOM_SCAN_CAP`]
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub bottom_scan_ratio: f64,
    /// Runs shorter than this fraction of the height are ignored
    #[validate(custom(function = "finite"), range(min = 0.0, max = 0.5))]
    pub min_band_ratio: f64,
    /// A run must start within this fraction of the height from its edge
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub max_edge_gap_ratio: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            dark_lum: 40,
            white_lum: 235,
            min_dark_ratio: 0.55,
            min_white_ratio: 0.003,
            top_scan_ratio: 0.40,
            bottom_scan_ratio: 0.30,
            min_band_ratio: 0.015,
            max_edge_gap_ratio: 0.10,
        }
    }
}

impl OverlayParams {
    /// Top scan window after applying the hard cap.
    pub fn effective_top_scan(&self) -> f64 {
        self.top_scan_ratio.min(OVERLAY_TOP_SCAN_CAP)
    }

    /// Bottom scan window after applying the hard cap.
    pub fn effective_bottom_scan(&self) -> f64 {
        self.bottom_scan_ratio.min(OVERLAY_BOTTOM_SCAN_CAP)
    }
}

/// Parameters for the content-box detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ContentBoxParams {
    /// Pixels at or above this luma count as content
    pub lum_threshold: u8,
    /// Row is content if at least this fraction of its pixels are
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub row_frac: f64,
    /// Column is content if at least this fraction of its pixels are
    #[validate(custom(function = "finite"), range(min = 0.0, max = 1.0))]
    pub col_frac: f64,
    /// Minimum run of consecutive content rows/columns at an edge
    #[validate(range(min = 1))]
    pub consecutive: u32,
    /// Inward shrink applied on all sides
    pub safe_margin: u32,
    /// An axis narrower than this falls back to the full extent
    pub min_size: u32,
}

impl Default for ContentBoxParams {
    fn default() -> Self {
        Self {
            lum_threshold: 26,
            row_frac: 0.12,
            col_frac: 0.10,
            consecutive: 6,
            safe_margin: 8,
            min_size: 200,
        }
    }
}

/// Parameters for multi-frame consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsensusParams {
    #[validate(range(min = 1))]
    pub collapse_floor: u32,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            collapse_floor: DEFAULT_COLLAPSE_FLOOR,
        }
    }
}

/// Parameters for the external refinement gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RefinementParams {
    #[validate(range(min = 1))]
    pub min_size: u32,
    #[validate(custom(function = "crate::profile::validate_width_policy"))]
    pub width_policy: WidthPolicy,
}

impl Default for RefinementParams {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_REFINEMENT_MIN_SIZE,
            width_policy: WidthPolicy::default(),
        }
    }
}

/// All tunables for one detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DetectionParams {
    #[validate(nested)]
    pub dark_band: DarkBandParams,
    #[validate(nested)]
    pub overlay: OverlayParams,
    #[validate(nested)]
    pub content_box: ContentBoxParams,
    #[validate(nested)]
    pub consensus: ConsensusParams,
    #[validate(nested)]
    pub refinement: RefinementParams,
}

impl DetectionParams {
    /// Validate all thresholds, returning the params on success.
    pub fn validated(self) -> ModelResult<Self> {
        self.validate()?;
        Ok(self)
    }
}
