//! Strict parse boundary for free-text model answers.
//!
//! The service may wrap its JSON in prose or markdown fences. Only the first
//! balanced `{...}` block is considered; anything else is a parse failure.

use serde::Deserialize;
use vcrop_models::SignedRect;

use crate::error::{VisionError, VisionResult};
use crate::types::CropSuggestion;

/// Locate the first balanced JSON object in `text`.
///
/// Braces inside string literals (including escaped quotes) are ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(alias = "x")]
    crop_x: f64,
    #[serde(alias = "y")]
    crop_y: f64,
    #[serde(alias = "width", alias = "w")]
    crop_w: f64,
    #[serde(alias = "height", alias = "h")]
    crop_h: f64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "rationale")]
    reason: Option<String>,
}

/// Parse a model answer into an untrusted crop suggestion.
pub fn parse_suggestion(text: &str) -> VisionResult<CropSuggestion> {
    let json = extract_json_object(text).ok_or(VisionError::NoJsonObject)?;
    let raw: RawSuggestion = serde_json::from_str(json)?;

    let rect = SignedRect::from_f64(raw.crop_x, raw.crop_y, raw.crop_w, raw.crop_h)
        .ok_or_else(|| VisionError::invalid_suggestion("non-finite coordinates"))?;

    Ok(CropSuggestion {
        rect,
        confidence: raw.confidence.filter(|c| c.is_finite()),
        reason: raw.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
    })
}
