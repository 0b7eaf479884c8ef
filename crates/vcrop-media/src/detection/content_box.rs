//! Content-box detection.
//!
//! Measures, per row and per column, the share of pixels bright enough to be
//! content. The box is bounded by the outermost runs of `consecutive` content
//! lines, shrunk by the safety margin. An axis that ends up narrower than the
//! configured minimum falls back to the full frame extent.

use vcrop_models::{ContentBoxParams, Rectangle};

use super::frame::FrameSample;

/// Per-line content flags for both axes.
fn content_lines(frame: &FrameSample, params: &ContentBoxParams) -> (Vec<bool>, Vec<bool>) {
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let threshold = params.lum_threshold as f64;

    let mut col_counts = vec![0u32; width];
    let mut rows = Vec::with_capacity(height);

    for y in 0..frame.height() {
        let mut row_count = 0u32;
        for (x, l) in frame.row_luma(y).enumerate() {
            if l >= threshold {
                row_count += 1;
                col_counts[x] += 1;
            }
        }
        rows.push(row_count as f64 / width as f64 >= params.row_frac);
    }

    let cols = col_counts
        .into_iter()
        .map(|count| count as f64 / height as f64 >= params.col_frac)
        .collect();

    (rows, cols)
}

/// First index where a run of `k` flagged lines begins, scanning forward.
fn first_run_start(flags: &[bool], k: usize) -> Option<usize> {
    let mut run = 0;
    for (i, &flag) in flags.iter().enumerate() {
        run = if flag { run + 1 } else { 0 };
        if run >= k {
            return Some(i + 1 - k);
        }
    }
    None
}

/// Last index where a run of `k` flagged lines ends, scanning backward.
fn last_run_end(flags: &[bool], k: usize) -> Option<usize> {
    let mut run = 0;
    for (i, &flag) in flags.iter().enumerate().rev() {
        run = if flag { run + 1 } else { 0 };
        if run >= k {
            return Some(i + k - 1);
        }
    }
    None
}

/// Inclusive `(start, end)` bounds along one axis of length `len`.
fn axis_bounds(flags: &[bool], len: u32, params: &ContentBoxParams) -> (u32, u32) {
    let full = (0, len - 1);
    let k = params.consecutive.max(1) as usize;

    let (Some(start), Some(end)) = (first_run_start(flags, k), last_run_end(flags, k)) else {
        return full;
    };

    let margin = params.safe_margin as i64;
    let start = start as i64 + margin;
    let end = end as i64 - margin;

    // Never narrower than the floor; a frame smaller than the floor keeps its full extent
    let floor = params.min_size.max(1).min(len) as i64;
    if end - start + 1 < floor {
        return full;
    }

    (start as u32, end as u32)
}

/// Detect the content rectangle of one frame.
///
/// Deterministic for a given frame and parameters. Width and height are each
/// at least `max(min_size, 1)`, or the full frame extent when the frame itself
/// is smaller than that.
pub fn detect_content_box(frame: &FrameSample, params: &ContentBoxParams) -> Rectangle {
    let (rows, cols) = content_lines(frame, params);
    let (top, bottom) = axis_bounds(&rows, frame.height(), params);
    let (left, right) = axis_bounds(&cols, frame.width(), params);

    Rectangle::new(left, top, right - left + 1, bottom - top + 1)
}
