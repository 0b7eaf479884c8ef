use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A crop region in source pixel coordinates.
///
/// `x`/`y` are the top-left corner; `right()`/`bottom()` are exclusive edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Build from inclusive edges (`left..=right`, `top..=bottom`).
    ///
    /// Returns `None` when the edges are inverted.
    pub fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Option<Self> {
        if right < left || bottom < top {
            return None;
        }
        Some(Self::new(left, top, right - left + 1, bottom - top + 1))
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    // Caller-supplied offsets are unbounded; compare edges without overflow.
    #[inline]
    fn wide_edges(&self) -> (u64, u64) {
        (
            self.x as u64 + self.width as u64,
            self.y as u64 + self.height as u64,
        )
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rectangle) -> bool {
        let (right, bottom) = self.wide_edges();
        let (other_right, other_bottom) = other.wide_edges();
        other.x >= self.x && other.y >= self.y && other_right <= right && other_bottom <= bottom
    }

    /// Whether the rectangle fits inside a `width x height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (right, bottom) = self.wide_edges();
        right <= width as u64 && bottom <= height as u64
    }

    /// Overlap of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rectangle::new(left, top, right - left, bottom - top))
    }

    /// Check the rectangle invariants against a source frame.
    pub fn validate_within(&self, width: u32, height: u32, min_size: u32) -> ModelResult<()> {
        let min_size = min_size.max(1);
        if self.width < min_size || self.height < min_size {
            return Err(ModelError::invalid_rectangle(format!(
                "{} is smaller than the {}px minimum",
                self, min_size
            )));
        }
        if !self.fits_within(width, height) {
            return Err(ModelError::invalid_rectangle(format!(
                "{} does not fit inside a {}x{} frame",
                self, width, height
            )));
        }
        Ok(())
    }

    /// Shrink inward so offsets and dimensions are even (4:2:0 chroma subsampling).
    ///
    /// Never grows the rectangle. Rectangles too small to align are returned unchanged.
    pub fn align_even(&self) -> Rectangle {
        let x = self.x.saturating_add(self.x & 1);
        let y = self.y.saturating_add(self.y & 1);
        let width = self.right().saturating_sub(x) & !1;
        let height = self.bottom().saturating_sub(y) & !1;

        if width == 0 || height == 0 {
            return *self;
        }

        Rectangle::new(x, y, width, height)
    }

    /// Force an untrusted rectangle inside `safe`.
    ///
    /// The result always lies within `safe` and is at least `min_size` on each
    /// axis (or the full safe extent when the safe region is smaller than that).
    pub fn clamp_into(raw: &SignedRect, safe: &Rectangle, min_size: u32) -> Rectangle {
        let min_w = min_size.max(1).min(safe.width) as i64;
        let min_h = min_size.max(1).min(safe.height) as i64;

        let (sx, sy) = (safe.x as i64, safe.y as i64);
        let (sr, sb) = (safe.right() as i64, safe.bottom() as i64);

        let x = raw.x.max(sx).min(sr - min_w);
        let y = raw.y.max(sy).min(sb - min_h);
        let width = raw.width.max(min_w).min(sr - x);
        let height = raw.height.max(min_h).min(sb - y);

        Rectangle::new(x as u32, y as u32, width as u32, height as u32)
    }

    /// FFmpeg crop filter for this rectangle.
    pub fn to_crop_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    /// Compact `x,y,w,h` form used in response headers.
    pub fn to_header_value(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Rectangle as reported by an untrusted source; may be negative or oversized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SignedRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl SignedRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Round floating-point coordinates; `None` if any value is not finite.
    pub fn from_f64(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if [x, y, width, height].iter().any(|v| !v.is_finite()) {
            return None;
        }
        // `as` saturates for out-of-range floats.
        Some(Self::new(
            x.round() as i64,
            y.round() as i64,
            width.round() as i64,
            height.round() as i64,
        ))
    }
}

impl From<Rectangle> for SignedRect {
    fn from(rect: Rectangle) -> Self {
        Self::new(
            rect.x as i64,
            rect.y as i64,
            rect.width as i64,
            rect.height as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_inclusive() {
        let rect = Rectangle::from_edges(10, 20, 109, 219).unwrap();
        assert_eq!(rect, Rectangle::new(10, 20, 100, 200));
        assert!(Rectangle::from_edges(10, 0, 9, 5).is_none());
    }

    #[test]
    fn test_intersection() {
        let a = Rectangle::new(0, 100, 1080, 1700);
        let b = Rectangle::new(0, 110, 1080, 1680);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(0, 110, 1080, 1680)));

        let disjoint = Rectangle::new(2000, 0, 10, 10);
        assert!(a.intersection(&disjoint).is_none());
    }

    #[test]
    fn test_contains() {
        let outer = Rectangle::new(0, 0, 100, 100);
        assert!(outer.contains(&Rectangle::new(10, 10, 90, 90)));
        assert!(!outer.contains(&Rectangle::new(10, 10, 91, 90)));
    }

    #[test]
    fn test_validate_within() {
        let rect = Rectangle::new(0, 0, 1080, 1920);
        assert!(rect.validate_within(1080, 1920, 10).is_ok());
        assert!(rect.validate_within(1000, 1920, 10).is_err());
        assert!(Rectangle::new(0, 0, 5, 5).validate_within(100, 100, 10).is_err());
    }

    #[test]
    fn test_huge_offset_does_not_fit() {
        let rect = Rectangle::new(u32::MAX, 0, 2, 100);
        assert!(!rect.fits_within(1920, 1080));
        assert!(rect.validate_within(1920, 1080, 1).is_err());

        let tall = Rectangle::new(0, u32::MAX - 1, 100, u32::MAX);
        assert!(!tall.fits_within(1920, 1080));

        let frame = Rectangle::full_frame(1920, 1080);
        assert!(!frame.contains(&rect));
        assert!(frame.intersection(&rect).is_none());
    }

    #[test]
    fn test_align_even_at_u32_limit() {
        let rect = Rectangle::new(u32::MAX, u32::MAX, 2, 2);
        let aligned = rect.align_even();
        assert!(aligned.x >= rect.x && aligned.y >= rect.y);
    }

    #[test]
    fn test_align_even_never_grows() {
        let rect = Rectangle::new(3, 7, 101, 55);
        let aligned = rect.align_even();
        assert_eq!(aligned.x % 2, 0);
        assert_eq!(aligned.y % 2, 0);
        assert_eq!(aligned.width % 2, 0);
        assert_eq!(aligned.height % 2, 0);
        assert!(rect.contains(&aligned));

        let already = Rectangle::new(0, 120, 1080, 1680);
        assert_eq!(already.align_even(), already);
    }

    #[test]
    fn test_clamp_wild_model_output() {
        let safe = Rectangle::new(0, 100, 1080, 1600);
        let raw = SignedRect::new(-50, 5000, 99999, 1);
        let clamped = Rectangle::clamp_into(&raw, &safe, 10);

        assert_eq!(clamped.x, 0);
        assert!(clamped.y >= 100 && clamped.y <= 1690);
        assert_eq!(clamped.width, 1080);
        assert_eq!(clamped.height, 10);
        assert!(safe.contains(&clamped));
    }

    #[test]
    fn test_clamp_keeps_valid_answer() {
        let safe = Rectangle::new(8, 120, 1064, 1660);
        let inside = Rectangle::new(8, 200, 1000, 1200);
        assert_eq!(Rectangle::clamp_into(&inside.into(), &safe, 10), inside);
    }

    #[test]
    fn test_clamp_safe_region_smaller_than_floor() {
        let safe = Rectangle::new(40, 40, 6, 6);
        let clamped = Rectangle::clamp_into(&SignedRect::new(0, 0, 1, 1), &safe, 10);
        assert_eq!(clamped, safe);
    }

    #[test]
    fn test_signed_rect_rejects_non_finite() {
        assert!(SignedRect::from_f64(f64::NAN, 0.0, 10.0, 10.0).is_none());
        assert!(SignedRect::from_f64(0.0, f64::INFINITY, 10.0, 10.0).is_none());
        assert_eq!(
            SignedRect::from_f64(1.4, 2.6, 100.0, -3.0),
            Some(SignedRect::new(1, 3, 100, -3))
        );
    }

    #[test]
    fn test_crop_filter() {
        assert_eq!(
            Rectangle::new(0, 110, 1080, 1680).to_crop_filter(),
            "crop=1080:1680:0:110"
        );
    }
}
