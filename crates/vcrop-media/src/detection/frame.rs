//! Decoded still frames.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, RgbaImage};

use crate::error::{MediaError, MediaResult};

/// One decoded still frame, RGBA, row-major.
#[derive(Debug, Clone)]
pub struct FrameSample {
    width: u32,
    height: u32,
    timestamp: f64,
    pixels: Vec<u8>,
}

/// Rec. 709 luma of an RGB triple, 0-255.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64
}

impl FrameSample {
    pub const CHANNELS: usize = 4;

    /// Wrap a raw RGBA buffer. The buffer length must match the dimensions.
    pub fn from_rgba(width: u32, height: u32, timestamp: f64, pixels: Vec<u8>) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "frame at {:.3}s has zero dimension ({}x{})",
                timestamp, width, height
            )));
        }
        let expected = width as usize * height as usize * Self::CHANNELS;
        if pixels.len() != expected {
            return Err(MediaError::internal(format!(
                "frame buffer is {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            timestamp,
            pixels,
        })
    }

    /// Convert a decoded image to RGBA.
    pub fn from_image(image: DynamicImage, timestamp: f64) -> MediaResult<Self> {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, timestamp, rgba.into_raw())
    }

    /// Decode an encoded image (PNG, JPEG, ...).
    pub fn decode(bytes: &[u8], timestamp: f64) -> MediaResult<Self> {
        Self::from_image(image::load_from_memory(bytes)?, timestamp)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source timestamp in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA bytes of row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * Self::CHANNELS;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    /// Luma of every pixel in row `y`.
    pub fn row_luma(&self, y: u32) -> impl Iterator<Item = f64> + '_ {
        self.row(y)
            .chunks_exact(Self::CHANNELS)
            .map(|px| luma(px[0], px[1], px[2]))
    }

    /// Mean luma of row `y`.
    pub fn row_mean_luma(&self, y: u32) -> f64 {
        self.row_luma(y).sum::<f64>() / self.width as f64
    }

    /// Encode as JPEG for the external reasoning service.
    pub fn to_jpeg(&self, quality: u8) -> MediaResult<Vec<u8>> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| MediaError::internal("frame buffer does not match its dimensions"))?;
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb).write_to(&mut out, ImageOutputFormat::Jpeg(quality))?;
        Ok(out.into_inner())
    }
}
