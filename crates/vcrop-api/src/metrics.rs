//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vcrop_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vcrop_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vcrop_http_requests_in_flight";

    // Detection metrics
    pub const FRAMES_SAMPLED_TOTAL: &str = "vcrop_frames_sampled_total";
    pub const FRAMES_SKIPPED_TOTAL: &str = "vcrop_frames_skipped_total";
    pub const DETECTION_DURATION_SECONDS: &str = "vcrop_detection_duration_seconds";
    pub const REFINEMENT_TOTAL: &str = "vcrop_refinement_total";

    // Processing metrics
    pub const TRANSCODE_DURATION_SECONDS: &str = "vcrop_transcode_duration_seconds";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the outcome of frame sampling.
pub fn record_frames_sampled(sampled: usize, skipped: usize) {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(sampled as u64);
    counter!(names::FRAMES_SKIPPED_TOTAL).increment(skipped as u64);
}

/// Record how long the pixel detectors took for one request.
pub fn record_detection_duration(profile: &str, duration_secs: f64) {
    let labels = [("profile", profile.to_string())];
    histogram!(names::DETECTION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a refinement outcome (`accepted` or `fallback`).
pub fn record_refinement(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::REFINEMENT_TOTAL, &labels).increment(1);
}

/// Record FFmpeg crop duration.
pub fn record_transcode_duration(duration_secs: f64) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(duration_secs);
}

/// Collapse request paths onto the known routes so label cardinality stays bounded.
fn route_label(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/api/crop" => "/api/crop",
        "/api/detect" => "/api/detect",
        "/health" => "/health",
        "/healthz" => "/healthz",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
