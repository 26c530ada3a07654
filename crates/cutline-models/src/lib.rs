//! Shared data models for the cutline silence analysis engine.
//!
//! This crate provides Serde-serializable types for:
//! - Audio frames and silence/speech segments
//! - Clips derived from segments
//! - Analysis results and summary statistics
//! - The request/response contract used by the hosting layers

pub mod analysis;
pub mod audio;
pub mod clip;
pub mod request;
pub mod segment;

// Re-export common types
pub use analysis::{
    AnalysisResult, AnalysisStatistics, DetectionMode, ThresholdMethod, ANALYSIS_RESULT_VERSION,
};
pub use audio::AudioFrame;
pub use clip::{Clip, ClipId};
pub use request::{
    AnalysisRequest, AnalysisResponse, MapDirection, MapRequest, MapResponse, RequestError,
    DEFAULT_FIXED_THRESHOLD_DB, DEFAULT_SILENCE_MARGIN_SECS,
};
pub use segment::{SegmentKind, SilenceSegment, SpeechSegment};
