//! API integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vcrop_api::{create_router, ApiConfig, AppState};
use vcrop_models::SignedRect;
use vcrop_vision::{
    CropAdvisor, CropSuggestion, RefinementGate, RefinementRequest, VisionConfig, VisionResult,
};

const BOUNDARY: &str = "vcrop-test-boundary";

struct TestApp {
    router: Router,
    _work_dir: TempDir,
}

fn test_app_with(gate: RefinementGate, configure: impl FnOnce(&mut ApiConfig)) -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let mut config = ApiConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..Default::default()
    };
    configure(&mut config);

    let state = AppState::with_gate(config, &VisionConfig::default(), gate).unwrap();
    let handle = PrometheusBuilder::new().build_recorder().handle();

    TestApp {
        router: create_router(state, Some(handle)),
        _work_dir: work_dir,
    }
}

fn test_app() -> TestApp {
    test_app_with(RefinementGate::disabled(), |_| {})
}

/// Build a multipart body from text fields and an optional file.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("X-Request-ID", "req-1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-1234");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_generated_request_id() {
    let app = test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_unknown_profile_rejected() {
    let app = test_app();
    let body = multipart_body(&[("profile", "magic")], Some(("clip.mp4", b"not a video")));

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_parameter");
    assert!(body["detail"].as_str().unwrap().contains("profile"));
}

#[tokio::test]
async fn test_non_numeric_threshold_rejected() {
    let app = test_app();
    let body = multipart_body(&[("row_frac", "lots")], Some(("clip.mp4", b"not a video")));

    let response = app
        .router
        .oneshot(multipart_request("/api/detect", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("row_frac"));
}

#[tokio::test]
async fn test_fixed_mode_requires_coordinates() {
    let app = test_app();
    let body = multipart_body(
        &[("mode", "fixed"), ("x", "0"), ("y", "0")],
        Some(("clip.mp4", b"not a video")),
    );

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("width"));
}

#[tokio::test]
async fn test_missing_file_rejected() {
    let app = test_app();
    let body = multipart_body(&[("profile", "layered")], None);

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_empty_file_rejected() {
    let app = test_app();
    let body = multipart_body(&[], Some(("clip.mp4", b"")));

    let response = app
        .router
        .oneshot(multipart_request("/api/detect", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = test_app_with(RefinementGate::disabled(), |config| {
        config.max_body_size = 1024;
    });
    let body = multipart_body(&[], Some(("clip.mp4", &[7u8; 4096])));

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let app = test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/crop")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_request_directories_are_removed() {
    let work_dir = tempfile::tempdir().unwrap();
    let path = work_dir.path().to_path_buf();
    let app = test_app_with(RefinementGate::disabled(), |config| {
        config.work_dir = path.clone();
    });
    let body = multipart_body(&[("row_frac", "lots")], Some(("clip.mp4", b"payload")));

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_dir(&path).unwrap().count(), 0);
}

// Tests below drive real ffmpeg/ffprobe.

struct WildAdvisor;

#[async_trait]
impl CropAdvisor for WildAdvisor {
    async fn suggest(&self, _request: &RefinementRequest) -> VisionResult<CropSuggestion> {
        Ok(CropSuggestion {
            rect: SignedRect::new(-40, -40, 99_999, 99_999),
            confidence: Some(0.9),
            reason: Some("everything".to_string()),
        })
    }
}

/// Write a 320x240 test pattern letterboxed into a 320x360 frame.
fn letterboxed_clip(dir: &Path) -> Vec<u8> {
    let path = dir.join("letterboxed.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg("testsrc=size=320x240:rate=10:duration=3")
        .args(["-vf", "pad=320:360:0:60:black", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    std::fs::read(path).unwrap()
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_detect_letterboxed_clip() {
    let scratch = tempfile::tempdir().unwrap();
    let clip = letterboxed_clip(scratch.path());
    let app = test_app();
    let body = multipart_body(
        &[("profile", "layered"), ("min_size", "100")],
        Some(("letterboxed.mp4", &clip)),
    );

    let response = app
        .router
        .oneshot(multipart_request("/api/detect", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["source"], "detected");
    let y = body["rect"]["y"].as_u64().unwrap();
    let height = body["rect"]["height"].as_u64().unwrap();
    assert!(y >= 60, "top bar kept: y={}", y);
    assert!(y + height <= 300, "bottom bar kept: bottom={}", y + height);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_crop_letterboxed_clip_with_wild_model() {
    let scratch = tempfile::tempdir().unwrap();
    let clip = letterboxed_clip(scratch.path());
    let gate = RefinementGate::new(Arc::new(WildAdvisor), Duration::from_secs(5));
    let app = test_app_with(gate, |_| {});
    let body = multipart_body(
        &[("profile", "assisted"), ("min_size", "100"), ("duration", "1")],
        Some(("letterboxed.mp4", &clip)),
    );

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers()["x-crop-source"], "model");

    let rect: Vec<u32> = response.headers()["x-crop-rect"]
        .to_str()
        .unwrap()
        .split(',')
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(rect.len(), 4);
    assert!(rect[1] >= 60 && rect[1] + rect[3] <= 300);
    assert!(rect.iter().all(|v| v % 2 == 0));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_fixed_crop_outside_frame_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let clip = letterboxed_clip(scratch.path());
    let app = test_app();
    let body = multipart_body(
        &[
            ("mode", "fixed"),
            ("x", "100"),
            ("y", "0"),
            ("width", "320"),
            ("height", "360"),
        ],
        Some(("letterboxed.mp4", &clip)),
    );

    let response = app
        .router
        .oneshot(multipart_request("/api/crop", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_fixed_crop_huge_offset_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let clip = letterboxed_clip(scratch.path());
    let app = test_app();
    let body = multipart_body(
        &[
            ("mode", "fixed"),
            ("x", "4294967295"),
            ("y", "0"),
            ("width", "2"),
            ("height", "100"),
        ],
        Some(("letterboxed.mp4", &clip)),
    );

    let response = app
        .router
        .oneshot(multipart_request("/api/detect", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().contains("crop"));
}
