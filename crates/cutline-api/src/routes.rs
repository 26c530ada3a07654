//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{analyze_silence, health, map_timeline};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let silence_routes = Router::new()
        .route("/silence/analyze", post(analyze_silence))
        .route("/silence/map", post(map_timeline));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", silence_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use cutline_media::{AudioDecoder, DecodedAudio, MediaError, MediaResult};
    use cutline_worker::{AnalysisService, WorkerConfig};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use crate::config::ApiConfig;
    use crate::middleware::REQUEST_ID_HEADER;

    const SR: u32 = 22_050;

    /// Two seconds of tone, two of silence, repeated.
    struct ToneDecoder;

    #[async_trait]
    impl AudioDecoder for ToneDecoder {
        async fn decode(
            &self,
            path: &Path,
            sample_rate: u32,
            _cancel_rx: Option<watch::Receiver<bool>>,
        ) -> MediaResult<DecodedAudio> {
            if !path.exists() {
                return Err(MediaError::FileNotFound(path.to_path_buf()));
            }
            let mut samples = Vec::new();
            for block in 0..5 {
                for i in 0..(2 * SR as usize) {
                    let v = if block % 2 == 0 {
                        0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin()
                    } else {
                        0.0
                    };
                    samples.push(v);
                }
            }
            Ok(DecodedAudio::new(path, samples, sample_rate))
        }
    }

    fn test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let worker_config = WorkerConfig::default().with_cache_dir(dir.path().join("cache"));
        let service = AnalysisService::with_decoder(worker_config, Arc::new(ToneDecoder));
        let state = AppState::with_service(ApiConfig::default(), service);
        (dir, create_router(state, None))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["analysesInFlight"], 0);
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let (dir, app) = test_app();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"stub").unwrap();

        let response = app
            .oneshot(post_json(
                "/api/silence/analyze",
                json!({ "videoPath": video.to_string_lossy(), "silenceMargin": 0.2 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["fromCache"], false);
        assert_eq!(body["silenceSegments"].as_array().unwrap().len(), 2);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_analyze_second_request_hits_cache() {
        let (dir, app) = test_app();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"stub").unwrap();
        let payload = json!({ "videoPath": video.to_string_lossy() });

        let first = app
            .clone()
            .oneshot(post_json("/api/silence/analyze", payload.clone()))
            .await
            .unwrap();
        assert_eq!(body_json(first).await["fromCache"], false);

        let second = app
            .oneshot(post_json("/api/silence/analyze", payload))
            .await
            .unwrap();
        assert_eq!(body_json(second).await["fromCache"], true);
    }

    #[tokio::test]
    async fn test_analyze_missing_file_is_failed_analysis() {
        let (dir, app) = test_app();
        let video = dir.path().join("missing.mp4");

        let response = app
            .oneshot(post_json(
                "/api/silence/analyze",
                json!({ "videoPath": video.to_string_lossy() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("File not found"));
        assert!(body.get("silenceSegments").is_none());
    }

    #[tokio::test]
    async fn test_analyze_invalid_margin_is_bad_request() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/silence/analyze",
                json!({ "videoPath": "/videos/a.mp4", "silenceMargin": -1.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("silenceMargin"));
    }

    #[tokio::test]
    async fn test_analyze_malformed_json_is_bad_request() {
        let (_dir, app) = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/silence/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_map_to_compressed() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/silence/map",
                json!({
                    "silenceSegments": [
                        { "start": 2.0, "end": 4.0, "duration": 2.0, "confidence": 1.0 }
                    ],
                    "duration": 10.0,
                    "positions": [0.0, 3.0, 5.0],
                    "direction": "toCompressed"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["positions"], json!([0.0, 2.0, 3.0]));
        assert_eq!(body["compressedDuration"], json!(8.0));
    }

    #[tokio::test]
    async fn test_map_to_original() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/silence/map",
                json!({
                    "silenceSegments": [
                        { "start": 2.0, "end": 4.0, "duration": 2.0, "confidence": 1.0 }
                    ],
                    "duration": 10.0,
                    "positions": [1.0, 2.5, 20.0],
                    "direction": "toOriginal"
                }),
            ))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["positions"], json!([1.0, 4.5, 10.0]));
    }

    #[tokio::test]
    async fn test_map_rejects_negative_duration() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/silence/map",
                json!({
                    "silenceSegments": [],
                    "duration": -1.0,
                    "positions": [],
                    "direction": "toOriginal"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let (_dir, app) = test_app();
        let request = Request::get("/healthz")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "req-123"
        );
    }

    #[tokio::test]
    async fn test_metrics_route_disabled() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
