//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use vcrop_models::{
    CropParams, EncodingConfig, ProfileName, WidthPolicy, DEFAULT_SAMPLE_COUNT, MAX_SAMPLE_COUNT,
};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Directory for per-request temporary files
    pub work_dir: PathBuf,
    /// Timeout for a single ffmpeg invocation, in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Profile used when a request does not name one
    pub default_profile: ProfileName,
    /// Frames sampled when a request does not say
    pub default_sample_count: u32,
    /// Default policy for narrow refined crops
    pub width_policy: WidthPolicy,
    /// Encoder settings for cropped output
    pub encoding: EncodingConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(600),
            max_body_size: 1024 * 1024 * 1024, // 1GB
            environment: "development".to_string(),
            work_dir: std::env::temp_dir(),
            ffmpeg_timeout_secs: 900,
            default_profile: ProfileName::default(),
            default_sample_count: DEFAULT_SAMPLE_COUNT,
            width_policy: WidthPolicy::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_profile = match std::env::var("DEFAULT_PROFILE") {
            Ok(name) => name.parse().unwrap_or_else(|e| {
                warn!("Ignoring DEFAULT_PROFILE: {}", e);
                defaults.default_profile
            }),
            Err(_) => defaults.default_profile,
        };

        let width_policy = env_parse::<f64>("WIDTH_POLICY_MIN_RATIO")
            .filter(|r| r.is_finite() && *r > 0.0 && *r <= 1.0)
            .map(|min_ratio| WidthPolicy::PreferFullWidth { min_ratio })
            .unwrap_or(defaults.width_policy);

        let mut encoding = defaults.encoding;
        if let Some(crf) = env_parse::<u8>("OUTPUT_CRF") {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("OUTPUT_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout_secs: env_parse("FFMPEG_TIMEOUT").unwrap_or(defaults.ffmpeg_timeout_secs),
            default_profile,
            default_sample_count: env_parse::<u32>("DEFAULT_SAMPLE_COUNT")
                .map(|n| n.clamp(1, MAX_SAMPLE_COUNT))
                .unwrap_or(defaults.default_sample_count),
            width_policy,
            encoding,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Request parameters before any per-request overrides.
    pub fn default_crop_params(&self) -> CropParams {
        let mut params = CropParams {
            profile: self.default_profile,
            sample_count: self.default_sample_count,
            ..Default::default()
        };
        params.detection.refinement.width_policy = self.width_policy;
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_crop_params_follow_config() {
        let config = ApiConfig {
            default_profile: ProfileName::Layered,
            default_sample_count: 8,
            width_policy: WidthPolicy::PreferFullWidth { min_ratio: 0.85 },
            ..Default::default()
        };
        let params = config.default_crop_params();
        assert_eq!(params.profile, ProfileName::Layered);
        assert_eq!(params.sample_count, 8);
        assert_eq!(
            params.detection.refinement.width_policy,
            WidthPolicy::PreferFullWidth { min_ratio: 0.85 }
        );
    }

    #[test]
    fn test_production_flag() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
        assert!(!ApiConfig::default().is_production());
    }
}
