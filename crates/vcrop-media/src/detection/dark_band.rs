//! Solid letterbox bar detection.
//!
//! Walks inward from the top and bottom edges while the row mean luma stays
//! below the darkness threshold. The walk is hard-bounded by
//! `max_band_ratio * height`, so all-dark frames terminate early.

use serde::Serialize;
use vcrop_models::{DarkBandParams, Rectangle};

use super::frame::FrameSample;

/// Rows to cut from each edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BandCuts {
    pub top: u32,
    pub bottom: u32,
}

impl BandCuts {
    /// Region left after removing both bands, `None` if nothing remains.
    pub fn to_rect(&self, width: u32, height: u32) -> Option<Rectangle> {
        let kept = height.checked_sub(self.top)?.checked_sub(self.bottom)?;
        (kept > 0 && width > 0).then(|| Rectangle::new(0, self.top, width, kept))
    }
}

/// Find dark bands at the top and bottom of one frame.
pub fn detect_dark_bands(frame: &FrameSample, params: &DarkBandParams) -> BandCuts {
    let height = frame.height();
    let max_rows = ((params.max_band_ratio * height as f64).floor() as u32).min(height);
    let min_rows = params.min_band_ratio * height as f64;

    let is_dark = |y: u32| frame.row_mean_luma(y) < params.dark_threshold;

    let mut top = 0;
    while top < max_rows && is_dark(top) {
        top += 1;
    }

    let mut bottom = 0;
    while bottom < max_rows && is_dark(height - 1 - bottom) {
        bottom += 1;
    }

    // Short dark runs are noise, not a bar
    let keep = |cut: u32| if (cut as f64) < min_rows { 0 } else { cut };

    BandCuts {
        top: keep(top),
        bottom: keep(bottom),
    }
}
