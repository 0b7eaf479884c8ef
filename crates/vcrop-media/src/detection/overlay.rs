//! Text-on-dark overlay detection.
//!
//! Catches caption and watermark strips that the dark-band walk misses: rows
//! that are mostly dark but carry a sprinkle of near-white pixels. The mean
//! luma of such rows is often well above the band threshold.

use serde::Serialize;
use vcrop_models::{OverlayParams, Rectangle};

use super::frame::FrameSample;

/// Overlay boundaries for one frame.
///
/// `top_end` is exclusive (0 when no top overlay), `bottom_start` is the first
/// overlay row at the bottom (`height` when no bottom overlay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayBounds {
    pub top_end: u32,
    pub bottom_start: u32,
}

impl OverlayBounds {
    /// No overlay on either edge.
    pub fn none(height: u32) -> Self {
        Self {
            top_end: 0,
            bottom_start: height,
        }
    }

    /// Region between the overlays, `None` if they meet.
    pub fn to_rect(&self, width: u32) -> Option<Rectangle> {
        (self.bottom_start > self.top_end && width > 0)
            .then(|| Rectangle::new(0, self.top_end, width, self.bottom_start - self.top_end))
    }
}

/// Longest run of qualifying rows, in iteration order.
#[derive(Debug, Clone, Copy)]
struct Run {
    last: u32,
    len: u32,
}

/// Longest run starting no more than `max_gap` rows from the edge.
///
/// `rows` must walk inward from the edge.
fn longest_edge_run(
    rows: impl Iterator<Item = u32>,
    max_gap: u32,
    qualifies: impl Fn(u32) -> bool,
) -> Option<Run> {
    let mut best: Option<Run> = None;
    let mut len = 0u32;

    for (offset, y) in (0u32..).zip(rows) {
        if qualifies(y) {
            len += 1;
            let anchored = offset + 1 - len <= max_gap;
            if anchored && best.map_or(true, |b| len > b.len) {
                best = Some(Run { last: y, len });
            }
        } else {
            len = 0;
            if offset >= max_gap {
                break;
            }
        }
    }

    best
}

/// Whether a row looks like bright text on a dark strip.
fn is_overlay_row(frame: &FrameSample, y: u32, params: &OverlayParams) -> bool {
    let dark_lum = params.dark_lum as f64;
    let white_lum = params.white_lum as f64;

    let (mut dark, mut bright) = (0u32, 0u32);
    for l in frame.row_luma(y) {
        if l <= dark_lum {
            dark += 1;
        } else if l >= white_lum {
            bright += 1;
        }
    }

    let width = frame.width() as f64;
    dark as f64 / width >= params.min_dark_ratio && bright as f64 / width >= params.min_white_ratio
}

/// Find caption/watermark strips near the top and bottom edges.
pub fn detect_overlay(frame: &FrameSample, params: &OverlayParams) -> OverlayBounds {
    let height = frame.height();
    let top_rows = ((params.effective_top_scan() * height as f64).floor() as u32).min(height);
    let bottom_rows = ((params.effective_bottom_scan() * height as f64).floor() as u32).min(height);
    let min_band_px = params.min_band_ratio * height as f64;
    let max_gap = (params.max_edge_gap_ratio * height as f64).floor() as u32;

    let accepted = |run: Option<Run>| run.filter(|r| r.len as f64 >= min_band_px);
    let qualifies = |y: u32| is_overlay_row(frame, y, params);

    let top_end = accepted(longest_edge_run(0..top_rows, max_gap, qualifies))
        .map_or(0, |r| r.last + 1);

    // Walking upward from the bottom edge, so `last` is the topmost row of the run
    let bottom_start = accepted(longest_edge_run((height - bottom_rows..height).rev(), max_gap, qualifies))
        .map_or(height, |r| r.last);

    OverlayBounds {
        top_end,
        bottom_start,
    }
}

#[cfg(test)]
mod tests {
    use super::super::frame::test_frames::{paint_rows, set, solid};
    use super::*;

    /// Dark strip over rows `from..to` with every 50th pixel white.
    fn caption_strip(frame: &mut FrameSample, from: u32, to: u32) {
        paint_rows(frame, from, to, 10);
        for y in from..to {
            for x in (0..frame.width()).step_by(50) {
                set(frame, x, y, 255);
            }
        }
    }

    #[test]
    fn test_top_and_bottom_captions() {
        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 0, 200);
        caption_strip(&mut frame, 1700, 1920);

        let bounds = detect_overlay(&frame, &OverlayParams::default());
        assert_eq!(bounds.top_end, 200);
        assert_eq!(bounds.bottom_start, 1700);
        assert_eq!(bounds.to_rect(1080), Some(Rectangle::new(0, 200, 1080, 1500)));
    }

    #[test]
    fn test_plain_black_bars_are_not_overlays() {
        let mut frame = solid(1080, 1920, 128);
        paint_rows(&mut frame, 0, 200, 0);
        assert_eq!(detect_overlay(&frame, &OverlayParams::default()), OverlayBounds::none(1920));
    }

    #[test]
    fn test_short_strip_rejected() {
        // 20 rows < 0.015 * 1920
        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 100, 120);
        assert_eq!(detect_overlay(&frame, &OverlayParams::default()).top_end, 0);
    }

    #[test]
    fn test_strip_away_from_edge_cuts_through_it() {
        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 150, 250);
        assert_eq!(detect_overlay(&frame, &OverlayParams::default()).top_end, 250);
    }

    #[test]
    fn test_strip_far_from_edge_is_ignored() {
        // Starts 400 rows down, past the 10% edge gap
        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 400, 500);
        assert_eq!(detect_overlay(&frame, &OverlayParams::default()).top_end, 0);

        let params = OverlayParams {
            max_edge_gap_ratio: 0.25,
            ..Default::default()
        };
        assert_eq!(detect_overlay(&frame, &params).top_end, 500);
    }

    #[test]
    fn test_anchored_run_wins_over_longer_inner_run() {
        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 0, 60);
        caption_strip(&mut frame, 500, 700);
        assert_eq!(detect_overlay(&frame, &OverlayParams::default()).top_end, 60);

        let mut frame = solid(1080, 1920, 128);
        caption_strip(&mut frame, 1300, 1400);
        assert_eq!(
            detect_overlay(&frame, &OverlayParams::default()).bottom_start,
            1920
        );
    }

    #[test]
    fn test_scan_window_is_capped() {
        let mut frame = solid(400, 1000, 128);
        caption_strip(&mut frame, 0, 600);

        let params = OverlayParams {
            top_scan_ratio: 0.9,
            ..Default::default()
        };
        // Cap is 45% of the height
        assert_eq!(detect_overlay(&frame, &params).top_end, 450);
    }
}
