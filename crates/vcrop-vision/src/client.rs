//! Gemini-compatible vision client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VisionConfig;
use crate::error::{VisionError, VisionResult};
use crate::parse::parse_suggestion;
use crate::prompt::build_prompt;
use crate::types::{CropSuggestion, RefinementRequest};

/// Source of advisory crop rectangles.
#[async_trait]
pub trait CropAdvisor: Send + Sync {
    /// Ask for a crop. The answer is untrusted and must be clamped by the caller.
    async fn suggest(&self, request: &RefinementRequest) -> VisionResult<CropSuggestion>;
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "inline_data")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// HTTP client for the external reasoning service.
pub struct VisionClient {
    config: VisionConfig,
    api_key: String,
    client: Client,
}

impl VisionClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: VisionConfig) -> VisionResult<Self> {
        let api_key = config.api_key.clone().ok_or(VisionError::MissingApiKey)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn build_request(&self, request: &RefinementRequest) -> GeminiRequest {
        let mut parts = vec![Part::Text {
            text: build_prompt(request),
        }];
        parts.extend(request.frames.iter().take(self.config.max_frames).map(|frame| {
            Part::Image {
                inline_data: InlineData {
                    mime_type: "image/jpeg".to_string(),
                    data: BASE64.encode(&frame.jpeg),
                },
            }
        }));

        GeminiRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.0,
            },
        }
    }
}

#[async_trait]
impl CropAdvisor for VisionClient {
    async fn suggest(&self, request: &RefinementRequest) -> VisionResult<CropSuggestion> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url, self.config.model
        );
        let body = self.build_request(request);

        info!(
            model = %self.config.model,
            frames = request.frames.len().min(self.config.max_frames),
            safe_region = %request.safe_region,
            "Requesting crop refinement"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout(self.config.timeout.as_secs())
                } else {
                    VisionError::Network(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::ServiceError { status, body });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let text: String = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .filter(|t: &String| !t.trim().is_empty())
            .ok_or(VisionError::EmptyResponse)?;

        debug!(response = %text, "Vision response text");

        parse_suggestion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EncodedFrame;
    use vcrop_models::{Rectangle, SignedRect};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> RefinementRequest {
        RefinementRequest {
            safe_region: Rectangle::new(0, 100, 1080, 1600),
            source_width: 1080,
            source_height: 1920,
            frames: (0..5)
                .map(|i| EncodedFrame {
                    timestamp: i as f64,
                    jpeg: vec![0xFF, 0xD8, i],
                })
                .collect(),
        }
    }

    fn client(server: &MockServer) -> VisionClient {
        let config = VisionConfig::default()
            .with_api_key("test-key")
            .with_api_url(server.uri());
        VisionClient::new(config).unwrap()
    }

    fn gemini_text(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            VisionClient::new(VisionConfig::default()),
            Err(VisionError::MissingApiKey)
        ));
    }

    #[test]
    fn test_request_limits_frames() {
        let config = VisionConfig::default().with_api_key("k");
        let client = VisionClient::new(config).unwrap();
        let body = serde_json::to_value(client.build_request(&request())).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        // Prompt plus the default three frames
        assert_eq!(parts.len(), 4);
        assert!(parts[0]["text"].as_str().unwrap().contains("safe region"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], BASE64.encode([0xFFu8, 0xD8, 0]));
    }

    #[tokio::test]
    async fn test_suggest_parses_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text(
                "```json\n{\"crop_x\": 0, \"crop_y\": 140, \"crop_w\": 1080, \"crop_h\": 1500, \"confidence\": 0.9, \"reason\": \"subject\"}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let suggestion = client(&server).suggest(&request()).await.unwrap();
        assert_eq!(suggestion.rect, SignedRect::new(0, 140, 1080, 1500));
        assert_eq!(suggestion.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_service_error_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).suggest(&request()).await.unwrap_err();
        assert!(matches!(err, VisionError::ServiceError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client(&server).suggest(&request()).await.unwrap_err();
        assert!(matches!(err, VisionError::EmptyResponse));
    }
}
