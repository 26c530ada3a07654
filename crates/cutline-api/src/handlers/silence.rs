//! Silence analysis and timeline mapping handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use cutline_media::TimelineMap;
use cutline_models::{AnalysisRequest, AnalysisResponse, MapDirection, MapRequest, MapResponse};
use cutline_worker::WorkerError;
use tracing::{debug, error};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upper bound on positions per mapping request.
const MAX_MAP_POSITIONS: usize = 10_000;

/// Analyze a video for silence.
///
/// Responds 200 for both successful and failed analyses (the body carries
/// `success` and `error`); only a malformed request is a 400.
pub async fn analyze_silence(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let Json(request) = payload?;
    request.validate_request().map_err(WorkerError::from)?;

    debug!(
        video = %request.video_path,
        margin = request.silence_margin,
        smart = request.smart_detection,
        "Silence analysis requested"
    );

    // Run detached so a client disconnect doesn't abort a computation other
    // requests for the same key may be waiting on.
    let service = state.analysis.clone();
    let response = tokio::spawn(async move { service.handle(&request, None).await })
        .await
        .map_err(|e| {
            error!("Analysis task failed: {}", e);
            ApiError::internal("analysis task failed")
        })?;

    Ok(Json(response))
}

/// Map scrub positions between the original and compressed timelines.
pub async fn map_timeline(
    payload: Result<Json<MapRequest>, JsonRejection>,
) -> ApiResult<Json<MapResponse>> {
    let Json(request) = payload?;

    if !request.duration.is_finite() || request.duration < 0.0 {
        return Err(ApiError::validation(
            "duration must be a non-negative number",
        ));
    }
    if request.positions.len() > MAX_MAP_POSITIONS {
        return Err(ApiError::validation(format!(
            "at most {} positions per request",
            MAX_MAP_POSITIONS
        )));
    }
    if request.positions.iter().any(|p| !p.is_finite()) {
        return Err(ApiError::validation("positions must be finite numbers"));
    }

    let map = TimelineMap::new(&request.silence_segments, request.duration);
    let positions = map.map_timestamps(&request.positions, request.direction);

    let direction = match request.direction {
        MapDirection::ToOriginal => "to_original",
        MapDirection::ToCompressed => "to_compressed",
    };
    metrics::record_map_positions(direction, positions.len());

    Ok(Json(MapResponse {
        positions,
        compressed_duration: map.compressed_duration(),
    }))
}
