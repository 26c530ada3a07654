//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder.
///
/// Analysis metrics recorded by the worker crate are exported through the
/// same handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "cutline_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "cutline_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "cutline_http_requests_in_flight";
    pub const MAP_POSITIONS_TOTAL: &str = "cutline_map_positions_total";
}

const KNOWN_PATHS: &[&str] = &[
    "/api/silence/analyze",
    "/api/silence/map",
    "/health",
    "/healthz",
    "/metrics",
];

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record positions mapped by a timeline request.
pub fn record_map_positions(direction: &str, count: usize) {
    let labels = [("direction", direction.to_string())];
    counter!(names::MAP_POSITIONS_TOTAL, &labels).increment(count as u64);
}

/// Collapse unknown paths so scanners can't blow up label cardinality.
fn sanitize_path(path: &str) -> &str {
    KNOWN_PATHS
        .iter()
        .find(|known| **known == path)
        .copied()
        .unwrap_or("other")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/silence/analyze"), "/api/silence/analyze");
        assert_eq!(sanitize_path("/wp-admin/setup.php"), "other");
        assert_eq!(sanitize_path("/api/silence/analyze/extra"), "other");
    }
}
