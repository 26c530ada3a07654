//! Request/response contract between the hosting layer and the engine.
//!
//! Parameters arrive once at the boundary, are validated here, and flow
//! through the engine as typed values from then on.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use validator::Validate;

use crate::{AnalysisResult, DetectionMode, SilenceSegment};

/// Default minimum silence duration eligible for cutting (seconds).
pub const DEFAULT_SILENCE_MARGIN_SECS: f64 = 0.2;

/// Default fixed threshold (dB relative to peak) when smart detection is off.
///
/// Matches a 0.07 linear normalized RMS level.
pub const DEFAULT_FIXED_THRESHOLD_DB: f32 = -23.0;

fn default_margin() -> f64 {
    DEFAULT_SILENCE_MARGIN_SECS
}

fn default_smart_detection() -> bool {
    true
}

/// Request validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Request to analyze a video's audio track for silence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Path to the video (or audio) file on local disk.
    #[validate(length(min = 1, message = "videoPath must not be empty"))]
    pub video_path: String,

    /// Minimum silence duration to cut, in seconds.
    #[serde(default = "default_margin")]
    #[validate(range(min = 0.0, max = 30.0, message = "silenceMargin must be within 0-30 seconds"))]
    pub silence_margin: f64,

    /// Use the adaptive threshold estimator instead of a fixed threshold.
    #[serde(default = "default_smart_detection")]
    pub smart_detection: bool,

    /// Fixed threshold in dB, used only when `smart_detection` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = -60.0, max = 0.0, message = "silenceThresholdDb must be within -60..0 dB"))]
    pub silence_threshold_db: Option<f32>,
}

impl AnalysisRequest {
    /// Create a request with default parameters.
    pub fn new(video_path: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            silence_margin: DEFAULT_SILENCE_MARGIN_SECS,
            smart_detection: true,
            silence_threshold_db: None,
        }
    }

    /// Builder-style setter for the silence margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.silence_margin = margin;
        self
    }

    /// Switch to a fixed threshold.
    pub fn with_fixed_threshold(mut self, threshold_db: f32) -> Self {
        self.smart_detection = false;
        self.silence_threshold_db = Some(threshold_db);
        self
    }

    /// Validate the request once at the boundary.
    pub fn validate_request(&self) -> Result<(), RequestError> {
        if !self.silence_margin.is_finite() {
            return Err(RequestError::Invalid(
                "silenceMargin must be a finite number".to_string(),
            ));
        }
        if let Some(threshold) = self.silence_threshold_db {
            if !threshold.is_finite() {
                return Err(RequestError::Invalid(
                    "silenceThresholdDb must be a finite number".to_string(),
                ));
            }
        }

        self.validate()
            .map_err(|e| RequestError::Invalid(e.to_string()))
    }

    pub fn detection_mode(&self) -> DetectionMode {
        DetectionMode::from_smart_flag(self.smart_detection)
    }

    /// Threshold used in fixed mode.
    pub fn fixed_threshold_db(&self) -> f32 {
        self.silence_threshold_db
            .unwrap_or(DEFAULT_FIXED_THRESHOLD_DB)
    }

    /// Base name of the video file, used to group cache entries.
    pub fn video_base_name(&self) -> String {
        Path::new(&self.video_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "video".to_string())
    }
}

/// Response returned to the hosting layer.
///
/// On failure `success` is false, `error` carries a human-readable message
/// and no result fields are present.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    /// True when the result was served from the analysis cache.
    #[serde(default)]
    pub from_cache: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn success(result: AnalysisResult, from_cache: bool) -> Self {
        Self {
            success: true,
            from_cache,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            from_cache: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Direction of a timeline mapping request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MapDirection {
    /// Compressed (cuts removed) position to original position.
    ToOriginal,
    /// Original position to compressed position.
    ToCompressed,
}

/// Request to map scrub positions between the two timelines.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    pub silence_segments: Vec<SilenceSegment>,
    /// Original video duration in seconds.
    pub duration: f64,
    pub positions: Vec<f64>,
    pub direction: MapDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub positions: Vec<f64>,
    pub compressed_duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: AnalysisRequest = serde_json::from_str(r#"{"videoPath": "/videos/a.mp4"}"#).unwrap();
        assert!((req.silence_margin - DEFAULT_SILENCE_MARGIN_SECS).abs() < f64::EPSILON);
        assert!(req.smart_detection);
        assert_eq!(req.detection_mode(), DetectionMode::Smart);
        assert!((req.fixed_threshold_db() - DEFAULT_FIXED_THRESHOLD_DB).abs() < f32::EPSILON);
        tokio_test::assert_ok!(req.validate_request());
    }

    #[test]
    fn test_request_rejects_empty_path() {
        let req = AnalysisRequest::new("");
        tokio_test::assert_err!(req.validate_request());
    }

    #[test]
    fn test_request_rejects_bad_margin() {
        tokio_test::assert_err!(AnalysisRequest::new("a.mp4").with_margin(-1.0).validate_request());
        tokio_test::assert_err!(AnalysisRequest::new("a.mp4").with_margin(f64::NAN).validate_request());
        tokio_test::assert_ok!(AnalysisRequest::new("a.mp4").with_margin(0.15).validate_request());
    }

    #[test]
    fn test_request_rejects_positive_threshold() {
        let req = AnalysisRequest::new("a.mp4").with_fixed_threshold(6.0);
        tokio_test::assert_err!(req.validate_request());

        let req = AnalysisRequest::new("a.mp4").with_fixed_threshold(-35.0);
        tokio_test::assert_ok!(req.validate_request());
        assert_eq!(req.detection_mode(), DetectionMode::Fixed);
    }

    #[test]
    fn test_video_base_name() {
        assert_eq!(AnalysisRequest::new("/tmp/uploads/lecture-01.mp4").video_base_name(), "lecture-01");
        assert_eq!(AnalysisRequest::new("clip").video_base_name(), "clip");
    }

    #[test]
    fn test_failure_response_shape() {
        let resp = AnalysisResponse::failure("No audio track found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No audio track found");
        assert!(json.get("silenceSegments").is_none());
    }

    #[test]
    fn test_map_direction_wire_format() {
        let dir: MapDirection = serde_json::from_str("\"toCompressed\"").unwrap();
        assert_eq!(dir, MapDirection::ToCompressed);
    }

    #[test]
    fn test_request_schema_uses_wire_names() {
        let schema = serde_json::to_value(schemars::schema_for!(AnalysisRequest)).unwrap();
        assert!(schema["properties"]["videoPath"].is_object());
        assert!(schema["properties"]["silenceMargin"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["videoPath"]));
    }
}
