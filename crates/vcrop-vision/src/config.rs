//! Vision service configuration.

use std::time::Duration;

/// Default Gemini-compatible API base URL.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the external reasoning service.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// API base URL (without the `/models/...` suffix)
    pub api_url: String,
    /// Model name
    pub model: String,
    /// API key; refinement is disabled when absent
    pub api_key: Option<String>,
    /// Per-call timeout
    pub timeout: Duration,
    /// Maximum frames attached to one request
    pub max_frames: usize,
    /// JPEG quality for attached frames
    pub jpeg_quality: u8,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(45),
            max_frames: 3,
            jpeg_quality: 85,
        }
    }
}

impl VisionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("VISION_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            model: std::env::var("VISION_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            timeout: std::env::var("VISION_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_frames: std::env::var("VISION_MAX_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_frames),
            jpeg_quality: std::env::var("VISION_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|q: &u8| (1..=100).contains(q))
                .unwrap_or(defaults.jpeg_quality),
        }
    }

    /// Whether refinement calls can be made.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Builder-style API key setter.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder-style base URL setter.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}
