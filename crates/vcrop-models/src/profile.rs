//! Detection profiles and crop policies.
//!
//! A profile decides which pixel detectors run on each sampled frame and
//! whether the consensus box is sent for external refinement.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::error::ModelError;

/// How the crop rectangle is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    /// Caller-supplied coordinates, no detection.
    Fixed,
    /// Detected from sampled frames.
    #[default]
    Auto,
}

impl FromStr for CropMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" | "manual" => Ok(Self::Fixed),
            "auto" | "detect" => Ok(Self::Auto),
            other => Err(ModelError::invalid_param(
                "mode",
                format!("expected 'fixed' or 'auto', got '{}'", other),
            )),
        }
    }
}

/// Named detection presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    /// Solid letterbox bars only.
    DarkBands,
    /// Letterbox bars plus caption/watermark strips.
    TextOverlay,
    /// Non-dark pixel density per row and column.
    #[default]
    ContentBox,
    /// All pixel detectors combined.
    Layered,
    /// All pixel detectors plus external model refinement.
    Assisted,
}

impl ProfileName {
    pub const ALL: [ProfileName; 5] = [
        ProfileName::DarkBands,
        ProfileName::TextOverlay,
        ProfileName::ContentBox,
        ProfileName::Layered,
        ProfileName::Assisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::DarkBands => "dark_bands",
            ProfileName::TextOverlay => "text_overlay",
            ProfileName::ContentBox => "content_box",
            ProfileName::Layered => "layered",
            ProfileName::Assisted => "assisted",
        }
    }

    /// Expand the preset into its stage configuration.
    pub fn profile(&self) -> DetectionProfile {
        match self {
            ProfileName::DarkBands => DetectionProfile {
                name: *self,
                dark_band: true,
                text_overlay: false,
                content_box: false,
                refine: false,
            },
            ProfileName::TextOverlay => DetectionProfile {
                name: *self,
                dark_band: true,
                text_overlay: true,
                content_box: false,
                refine: false,
            },
            ProfileName::ContentBox => DetectionProfile {
                name: *self,
                dark_band: false,
                text_overlay: false,
                content_box: true,
                refine: false,
            },
            ProfileName::Layered => DetectionProfile {
                name: *self,
                dark_band: true,
                text_overlay: true,
                content_box: true,
                refine: false,
            },
            ProfileName::Assisted => DetectionProfile {
                name: *self,
                dark_band: true,
                text_overlay: true,
                content_box: true,
                refine: true,
            },
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase().replace('-', "_");
        ProfileName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(ModelError::UnknownProfile(s))
    }
}

/// Which stages run for a detection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionProfile {
    pub name: ProfileName,
    pub dark_band: bool,
    pub text_overlay: bool,
    pub content_box: bool,
    /// Send the consensus box to the external model
    pub refine: bool,
}

impl Default for DetectionProfile {
    fn default() -> Self {
        ProfileName::default().profile()
    }
}

impl DetectionProfile {
    /// Whether any pixel detector is enabled.
    pub fn has_pixel_stage(&self) -> bool {
        self.dark_band || self.text_overlay || self.content_box
    }
}

/// Policy for model-suggested crops that are narrower than the source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum WidthPolicy {
    /// Use the refined width as-is.
    #[default]
    KeepDetected,
    /// Widen to the full safe extent when the refined width is below
    /// `min_ratio` of the source width.
    PreferFullWidth { min_ratio: f64 },
}

impl WidthPolicy {
    /// Whether a crop of `width` out of `source_width` should be widened.
    pub fn should_widen(&self, width: u32, source_width: u32) -> bool {
        match self {
            WidthPolicy::KeepDetected => false,
            WidthPolicy::PreferFullWidth { min_ratio } => {
                (width as f64) < min_ratio * source_width as f64
            }
        }
    }
}

pub(crate) fn validate_width_policy(policy: &WidthPolicy) -> Result<(), ValidationError> {
    match policy {
        WidthPolicy::KeepDetected => Ok(()),
        WidthPolicy::PreferFullWidth { min_ratio }
            if min_ratio.is_finite() && *min_ratio > 0.0 && *min_ratio <= 1.0 =>
        {
            Ok(())
        }
        WidthPolicy::PreferFullWidth { .. } => Err(ValidationError::new("min_ratio_out_of_range")),
    }
}
