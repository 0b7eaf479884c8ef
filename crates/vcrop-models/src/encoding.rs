//! Output encoding for cropped videos.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Encoder settings applied when writing the cropped output.
///
/// Defaults to H.264 at CRF 18 with AAC audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    pub codec: String,
    /// x264 speed/quality preset
    pub preset: String,
    /// Constant Rate Factor, 0-51, lower is better
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Put the moov atom first so the file plays while downloading
    pub faststart: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }
}

impl EncodingConfig {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Output-side ffmpeg arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let crf = self.crf.to_string();
        let mut args: Vec<String> = [
            ("-c:v", self.codec.as_str()),
            ("-preset", self.preset.as_str()),
            ("-crf", crf.as_str()),
            ("-c:a", self.audio_codec.as_str()),
            ("-b:a", self.audio_bitrate.as_str()),
        ]
        .into_iter()
        .flat_map(|(flag, value)| [flag.to_string(), value.to_string()])
        .collect();

        if self.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let joined = EncodingConfig::default().to_ffmpeg_args().join(" ");
        assert_eq!(
            joined,
            "-c:v libx264 -preset fast -crf 18 -c:a aac -b:a 128k -movflags +faststart"
        );
    }

    #[test]
    fn test_overrides() {
        let config = EncodingConfig::default().with_crf(80).with_preset("medium");
        assert_eq!(config.crf, 51);
        let args = config.to_ffmpeg_args();
        assert!(args.windows(2).any(|w| w == ["-preset", "medium"]));
    }

    #[test]
    fn test_partial_json() {
        let config: EncodingConfig = serde_json::from_str(r#"{"crf": 23}"#).unwrap();
        assert_eq!(config.crf, 23);
        assert_eq!(config.codec, "libx264");
    }
}
