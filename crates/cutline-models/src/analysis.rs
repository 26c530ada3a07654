//! Silence analysis result models.
//!
//! An [`AnalysisResult`] is computed once per (video, parameter set) and is
//! immutable afterwards. A fresh computation supersedes it; nothing mutates
//! it in place.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Clip, SilenceSegment, SpeechSegment};

/// Current version of the persisted analysis format.
///
/// Bump this when the result schema or the detection algorithm changes so
/// that cached entries from older builds are treated as misses.
pub const ANALYSIS_RESULT_VERSION: u32 = 1;

/// How the silence threshold was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Adaptive threshold inferred from the level histogram.
    #[default]
    Smart,
    /// Caller-supplied threshold in dB.
    Fixed,
}

impl DetectionMode {
    pub fn from_smart_flag(smart: bool) -> Self {
        if smart {
            DetectionMode::Smart
        } else {
            DetectionMode::Fixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Smart => "smart",
            DetectionMode::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which branch of the threshold estimator produced the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Histogram valley between the two quietest peaks.
    Valley,
    /// Single histogram peak minus a fixed offset.
    SinglePeak,
    /// No usable peak, default threshold.
    Fallback,
    /// Caller-supplied threshold.
    Fixed,
}

impl ThresholdMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdMethod::Valley => "valley",
            ThresholdMethod::SinglePeak => "single_peak",
            ThresholdMethod::Fallback => "fallback",
            ThresholdMethod::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary metrics derived from the segment lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    /// Sum of all silence segment durations (seconds).
    pub total_silence_duration: f64,
    /// Share of the video removed by the cuts (0-100).
    pub time_saved_percentage: f64,
    /// Duration after the cuts are applied (seconds).
    pub new_duration: f64,
    pub silence_segment_count: usize,
    pub speech_segment_count: usize,
    pub clip_count: usize,
    /// Fraction of the timeline that is kept (0.0-1.0).
    pub speech_ratio: f64,
    /// Number of cuts a renderer would apply.
    pub estimated_cuts: usize,
}

/// Complete output of one silence analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Format version, see [`ANALYSIS_RESULT_VERSION`].
    #[serde(default)]
    pub version: u32,
    /// Track duration in seconds.
    pub duration: f64,
    pub silence_segments: Vec<SilenceSegment>,
    pub speech_segments: Vec<SpeechSegment>,
    /// Speech and silence clips, sorted by start.
    pub clips: Vec<Clip>,
    /// Normalized (0..1) display curve of fixed length.
    pub waveform_data: Vec<f32>,
    /// Threshold used for classification, in dB relative to peak.
    pub recommended_threshold: f32,
    pub threshold_method: ThresholdMethod,
    pub statistics: AnalysisStatistics,
    pub sample_rate: u32,
    /// Number of analysis frames produced by the extractor.
    pub analysis_frames: usize,
    /// Minimum silence duration used for this result (seconds).
    pub margin: f64,
    pub detection_mode: DetectionMode,
    pub average_level_db: f32,
    pub max_level_db: f32,
}

impl AnalysisResult {
    /// Check if this result was produced by the current analysis format.
    pub fn is_current_version(&self) -> bool {
        self.version == ANALYSIS_RESULT_VERSION
    }

    /// Clips that survive the cut, in timeline order.
    pub fn kept_clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(|c| !c.is_silent)
    }
}
