//! Application state.

use std::sync::Arc;

use vcrop_vision::{RefinementGate, VisionConfig};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::services::CropService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cropper: Arc<CropService>,
}

impl AppState {
    /// Create new application state, building the refinement gate from `vision`.
    pub fn new(config: ApiConfig, vision: VisionConfig) -> ApiResult<Self> {
        let gate = RefinementGate::from_config(&vision);
        Self::with_gate(config, &vision, gate)
    }

    /// Create state around an explicit refinement gate.
    pub fn with_gate(config: ApiConfig, vision: &VisionConfig, gate: RefinementGate) -> ApiResult<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let cropper = CropService::new(&config, vision, gate);

        Ok(Self {
            config,
            cropper: Arc::new(cropper),
        })
    }
}
