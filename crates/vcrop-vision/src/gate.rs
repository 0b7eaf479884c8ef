//! Refinement gate.
//!
//! Wraps a [`CropAdvisor`] behind a parse-or-fallback boundary. Whatever the
//! advisor returns is clamped into the safe region; any failure, including a
//! timeout, yields the safe region itself. The gate never errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use vcrop_models::{Rectangle, RefinementParams, SignedRect};

use crate::client::{CropAdvisor, VisionClient};
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::types::{CropSuggestion, RefinedCrop, RefinementRequest, RefinementSource};

/// Clamp an untrusted suggestion into `safe` and apply the width policy.
///
/// Returns the constrained rectangle and whether it differs from the raw answer.
pub fn constrain(
    suggestion: &CropSuggestion,
    safe: &Rectangle,
    source_width: u32,
    params: &RefinementParams,
) -> (Rectangle, bool) {
    let mut rect = Rectangle::clamp_into(&suggestion.rect, safe, params.min_size);

    if params.width_policy.should_widen(rect.width, source_width) {
        rect = Rectangle {
            x: safe.x,
            width: safe.width,
            ..rect
        };
    }

    let adjusted = SignedRect::from(rect) != suggestion.rect;
    (rect, adjusted)
}

/// Bounded delegation to an external crop advisor.
#[derive(Clone)]
pub struct RefinementGate {
    advisor: Option<Arc<dyn CropAdvisor>>,
    timeout: Duration,
}

impl std::fmt::Debug for RefinementGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementGate")
            .field("enabled", &self.advisor.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RefinementGate {
    pub fn new(advisor: Arc<dyn CropAdvisor>, timeout: Duration) -> Self {
        Self {
            advisor: Some(advisor),
            timeout,
        }
    }

    /// A gate that always falls back.
    pub fn disabled() -> Self {
        Self {
            advisor: None,
            timeout: Duration::ZERO,
        }
    }

    /// Build a gate backed by the Gemini client, or a disabled gate when no
    /// API key is configured.
    pub fn from_config(config: &VisionConfig) -> Self {
        if !config.is_enabled() {
            info!("Vision refinement disabled (no API key)");
            return Self::disabled();
        }

        match VisionClient::new(config.clone()) {
            Ok(client) => Self::new(Arc::new(client), config.timeout),
            Err(e) => {
                warn!(error = %e, "Failed to build vision client, refinement disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.advisor.is_some()
    }

    /// Refine the safe region. Always returns a rectangle inside it.
    pub async fn refine(&self, request: &RefinementRequest, params: &RefinementParams) -> RefinedCrop {
        let safe = request.safe_region;

        let Some(advisor) = &self.advisor else {
            return RefinedCrop::fallback(safe, VisionError::MissingApiKey.kind());
        };

        let outcome = match tokio::time::timeout(self.timeout, advisor.suggest(request)).await {
            Ok(result) => result,
            Err(_) => Err(VisionError::Timeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(suggestion) => {
                let (rect, adjusted) = constrain(&suggestion, &safe, request.source_width, params);
                info!(
                    raw = ?suggestion.rect,
                    rect = %rect,
                    adjusted,
                    confidence = ?suggestion.confidence,
                    "Refinement accepted"
                );
                RefinedCrop {
                    rect,
                    source: RefinementSource::Model {
                        confidence: suggestion.confidence,
                        rationale: suggestion.reason,
                        adjusted,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Refinement failed, using consensus");
                RefinedCrop::fallback(safe, e.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vcrop_models::WidthPolicy;

    use crate::error::VisionResult;

    enum Behaviour {
        Answer(SignedRect),
        Fail,
        Hang,
    }

    struct FakeAdvisor(Behaviour);

    #[async_trait]
    impl CropAdvisor for FakeAdvisor {
        async fn suggest(&self, _request: &RefinementRequest) -> VisionResult<CropSuggestion> {
            match &self.0 {
                Behaviour::Answer(rect) => Ok(CropSuggestion {
                    rect: *rect,
                    confidence: Some(0.8),
                    reason: Some("subject".to_string()),
                }),
                Behaviour::Fail => Err(VisionError::NoJsonObject),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(VisionError::EmptyResponse)
                }
            }
        }
    }

    fn safe() -> Rectangle {
        Rectangle::new(0, 100, 1080, 1600)
    }

    fn request() -> RefinementRequest {
        RefinementRequest {
            safe_region: safe(),
            source_width: 1080,
            source_height: 1920,
            frames: Vec::new(),
        }
    }

    fn gate(behaviour: Behaviour) -> RefinementGate {
        RefinementGate::new(Arc::new(FakeAdvisor(behaviour)), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_wild_answer_is_clamped() {
        let refined = gate(Behaviour::Answer(SignedRect::new(-50, 5000, 99999, 1)))
            .refine(&request(), &RefinementParams::default())
            .await;

        let rect = refined.rect;
        assert!(safe().contains(&rect));
        assert_eq!(rect.x, 0);
        assert!(rect.y >= 100 && rect.y <= 1690);
        assert!(rect.width >= 10 && rect.height >= 10);
        assert!(matches!(
            refined.source,
            RefinementSource::Model { adjusted: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_valid_answer_used_as_is() {
        let answer = Rectangle::new(40, 200, 1000, 1400);
        let refined = gate(Behaviour::Answer(answer.into()))
            .refine(&request(), &RefinementParams::default())
            .await;
        assert_eq!(refined.rect, answer);
        assert!(matches!(
            refined.source,
            RefinementSource::Model { adjusted: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_safe_region() {
        let refined = gate(Behaviour::Fail)
            .refine(&request(), &RefinementParams::default())
            .await;
        assert_eq!(refined.rect, safe());
        assert!(refined.is_fallback());
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let refined = gate(Behaviour::Hang)
            .refine(&request(), &RefinementParams::default())
            .await;
        assert_eq!(refined.rect, safe());
        assert_eq!(
            refined.source,
            RefinementSource::Fallback {
                reason: "timeout".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_disabled_gate_falls_back() {
        let refined = RefinementGate::disabled()
            .refine(&request(), &RefinementParams::default())
            .await;
        assert_eq!(refined.rect, safe());
        assert!(refined.is_fallback());
    }

    #[test]
    fn test_width_policy_widens_to_safe_extent() {
        let safe = Rectangle::new(8, 100, 1064, 1600);
        let suggestion = CropSuggestion {
            rect: SignedRect::new(300, 200, 600, 1000),
            confidence: None,
            reason: None,
        };
        let params = RefinementParams {
            width_policy: WidthPolicy::PreferFullWidth { min_ratio: 0.85 },
            ..Default::default()
        };
        let (rect, adjusted) = constrain(&suggestion, &safe, 1080, &params);
        assert_eq!(rect, Rectangle::new(8, 200, 1064, 1000));
        assert!(adjusted);

        let (kept, _) = constrain(&suggestion, &safe, 1080, &RefinementParams::default());
        assert_eq!(kept.width, 600);
    }
}
