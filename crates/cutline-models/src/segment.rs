//! Silence and speech segment models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time range classified as silence and eligible for cutting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SilenceSegment {
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// `end - start`, always at least the detection margin.
    pub duration: f64,
    /// How far below the threshold the mean level sits (0.0-1.0).
    pub confidence: f32,
}

impl SilenceSegment {
    pub fn new(start: f64, end: f64, confidence: f32) -> Self {
        Self {
            start,
            end,
            duration: end - start,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Whether `t` falls inside `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Kind tag carried by speech segments on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    #[default]
    Speech,
}

/// A time range that is kept in the compressed timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSegment {
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    #[serde(rename = "type", default)]
    pub kind: SegmentKind,
}

impl SpeechSegment {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            kind: SegmentKind::Speech,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}
