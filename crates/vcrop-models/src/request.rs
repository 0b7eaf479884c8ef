//! Per-request crop parameters.
//!
//! Upload intake delivers loose string fields; [`CropParams::apply_field`]
//! turns them into typed values, naming the offending field on error.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::params::DetectionParams;
use crate::profile::{CropMode, ProfileName, WidthPolicy};
use crate::rect::Rectangle;

/// Default number of frames sampled for detection.
pub const DEFAULT_SAMPLE_COUNT: u32 = 5;
/// Upper bound on frames sampled per request.
pub const MAX_SAMPLE_COUNT: u32 = 24;

/// Parameters for one crop or detection request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropParams {
    pub mode: CropMode,
    pub profile: ProfileName,
    /// Fixed crop, required when `mode` is `Fixed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<FixedCrop>,
    /// Trim start in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// Trim duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub sample_count: u32,
    pub detection: DetectionParams,
}

/// Partially specified fixed crop, filled in field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCrop {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FixedCrop {
    /// Resolve into a rectangle; every coordinate must be present.
    pub fn resolve(&self) -> ModelResult<Rectangle> {
        let require = |value: Option<u32>, name: &str| {
            value.ok_or_else(|| ModelError::invalid_param(name, "required in fixed mode"))
        };
        Ok(Rectangle::new(
            require(self.x, "x")?,
            require(self.y, "y")?,
            require(self.width, "width")?,
            require(self.height, "height")?,
        ))
    }
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            mode: CropMode::default(),
            profile: ProfileName::default(),
            fixed: None,
            start: None,
            duration: None,
            sample_count: DEFAULT_SAMPLE_COUNT,
            detection: DetectionParams::default(),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> ModelResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ModelError::invalid_param(name, format!("cannot parse '{}'", value.trim())))
}

fn parse_f64(name: &str, value: &str) -> ModelResult<f64> {
    let parsed: f64 = parse(name, value)?;
    if !parsed.is_finite() {
        return Err(ModelError::invalid_param(name, "must be a finite number"));
    }
    Ok(parsed)
}

impl CropParams {
    /// Apply one named form field. Unknown names are rejected.
    pub fn apply_field(&mut self, name: &str, value: &str) -> ModelResult<()> {
        let det = &mut self.detection;
        match name {
            "mode" => self.mode = value.parse()?,
            "profile" => self.profile = value.parse()?,
            "x" => self.fixed.get_or_insert_with(FixedCrop::default).x = Some(parse(name, value)?),
            "y" => self.fixed.get_or_insert_with(FixedCrop::default).y = Some(parse(name, value)?),
            "width" | "w" => {
                self.fixed.get_or_insert_with(FixedCrop::default).width = Some(parse(name, value)?)
            }
            "height" | "h" => {
                self.fixed.get_or_insert_with(FixedCrop::default).height = Some(parse(name, value)?)
            }
            "start" => self.start = Some(parse_f64(name, value)?),
            "duration" => self.duration = Some(parse_f64(name, value)?),
            "sample_count" | "samples" => self.sample_count = parse(name, value)?,

            "dark_threshold" => det.dark_band.dark_threshold = parse_f64(name, value)?,
            "min_band_ratio" => det.dark_band.min_band_ratio = parse_f64(name, value)?,
            "max_band_ratio" => det.dark_band.max_band_ratio = parse_f64(name, value)?,

            "overlay_dark_lum" => det.overlay.dark_lum = parse(name, value)?,
            "overlay_white_lum" => det.overlay.white_lum = parse(name, value)?,
            "overlay_min_dark_ratio" => det.overlay.min_dark_ratio = parse_f64(name, value)?,
            "overlay_min_white_ratio" => det.overlay.min_white_ratio = parse_f64(name, value)?,
            "overlay_top_scan_ratio" => det.overlay.top_scan_ratio = parse_f64(name, value)?,
            "overlay_bottom_scan_ratio" => det.overlay.bottom_scan_ratio = parse_f64(name, value)?,
            "overlay_min_band_ratio" => det.overlay.min_band_ratio = parse_f64(name, value)?,
            "overlay_max_edge_gap_ratio" => {
                det.overlay.max_edge_gap_ratio = parse_f64(name, value)?
            }

            "lum_threshold" => det.content_box.lum_threshold = parse(name, value)?,
            "row_frac" => det.content_box.row_frac = parse_f64(name, value)?,
            "col_frac" => det.content_box.col_frac = parse_f64(name, value)?,
            "consecutive" => det.content_box.consecutive = parse(name, value)?,
            "safe_margin" => det.content_box.safe_margin = parse(name, value)?,
            "min_size" => det.content_box.min_size = parse(name, value)?,

            "collapse_floor" => det.consensus.collapse_floor = parse(name, value)?,
            "refine_min_size" => det.refinement.min_size = parse(name, value)?,
            "width_policy_min_ratio" => {
                det.refinement.width_policy = WidthPolicy::PreferFullWidth {
                    min_ratio: parse_f64(name, value)?,
                }
            }
            other => {
                return Err(ModelError::invalid_param(other, "unknown parameter"));
            }
        }
        Ok(())
    }

    /// Check cross-field constraints after all fields are applied.
    pub fn validate(&self) -> ModelResult<()> {
        if self.mode == CropMode::Fixed {
            self.fixed.unwrap_or_default().resolve()?;
        }
        if let Some(start) = self.start {
            if start < 0.0 {
                return Err(ModelError::invalid_param("start", "must not be negative"));
            }
        }
        if let Some(duration) = self.duration {
            if duration <= 0.0 {
                return Err(ModelError::invalid_param("duration", "must be positive"));
            }
        }
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(ModelError::invalid_param(
                "sample_count",
                format!("must be between 1 and {}", MAX_SAMPLE_COUNT),
            ));
        }
        validator::Validate::validate(&self.detection)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(fields: &[(&str, &str)]) -> ModelResult<CropParams> {
        let mut params = CropParams::default();
        for (name, value) in fields {
            params.apply_field(name, value)?;
        }
        params.validate()?;
        Ok(params)
    }

    #[test]
    fn test_fixed_mode_requires_all_coordinates() {
        let params = apply(&[
            ("mode", "fixed"),
            ("x", "0"),
            ("y", "100"),
            ("width", "1080"),
            ("height", "1600"),
        ])
        .unwrap();
        assert_eq!(
            params.fixed.unwrap().resolve().unwrap(),
            Rectangle::new(0, 100, 1080, 1600)
        );

        let err = apply(&[("mode", "fixed"), ("x", "0"), ("y", "0")]).unwrap_err();
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn test_fixed_crop_with_huge_offset_fails_frame_check() {
        let params = apply(&[
            ("mode", "fixed"),
            ("x", "4294967295"),
            ("y", "0"),
            ("width", "2"),
            ("height", "100"),
        ])
        .unwrap();
        let rect = params.fixed.unwrap().resolve().unwrap();
        assert!(rect.validate_within(1920, 1080, 1).is_err());

        assert!(apply(&[("mode", "fixed"), ("x", "4294967296")]).is_err());
    }

    #[test]
    fn test_threshold_overrides() {
        let params = apply(&[
            ("profile", "layered"),
            ("dark_threshold", "50"),
            ("row_frac", "0.2"),
            ("consecutive", "3"),
            ("width_policy_min_ratio", "0.85"),
        ])
        .unwrap();
        assert_eq!(params.profile, ProfileName::Layered);
        assert_eq!(params.detection.dark_band.dark_threshold, 50.0);
        assert_eq!(params.detection.content_box.row_frac, 0.2);
        assert_eq!(params.detection.content_box.consecutive, 3);
        assert_eq!(
            params.detection.refinement.width_policy,
            WidthPolicy::PreferFullWidth { min_ratio: 0.85 }
        );
    }

    #[test]
    fn test_bad_values_name_the_parameter() {
        let err = apply(&[("row_frac", "lots")]).unwrap_err();
        assert!(err.to_string().contains("row_frac"));

        let err = apply(&[("dark_threshold", "NaN")]).unwrap_err();
        assert!(err.to_string().contains("dark_threshold"));

        let err = apply(&[("colour", "blue")]).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_trim_and_sample_bounds() {
        assert!(apply(&[("start", "-1")]).is_err());
        assert!(apply(&[("duration", "0")]).is_err());
        assert!(apply(&[("sample_count", "0")]).is_err());
        assert!(apply(&[("sample_count", "100")]).is_err());
        assert!(apply(&[("start", "2.5"), ("duration", "10")]).is_ok());
    }

    #[test]
    fn test_out_of_range_threshold_fails_validation() {
        assert!(apply(&[("max_band_ratio", "0.9")]).is_err());
    }
}
