//! Axum HTTP API server for video crop detection.
//!
//! This crate provides:
//! - Multipart upload intake with per-request temporary directories
//! - Crop orchestration over the detection pipeline and refinement gate
//! - Security headers, request IDs and request logging
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod upload;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{CropPlan, CropService, CropSource};
pub use state::AppState;
