//! Clip models derived from silence/speech segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a clip within one analysis result.
///
/// Ids are derived from the clip kind and its ordinal among clips of that
/// kind, so recomputing the same analysis yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Id for the `index`-th speech clip.
    pub fn speech(index: usize) -> Self {
        Self(format!("speech-{}", index))
    }

    /// Id for the `index`-th silence clip.
    pub fn silence(index: usize) -> Self {
        Self(format!("silence-{}", index))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An ordered unit of the timeline used by preview and rendering consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    /// Start in seconds on the edit timeline.
    pub start: f64,
    /// End in seconds on the edit timeline.
    pub end: f64,
    /// Start in seconds in the source video. Equal to `start` at detection
    /// time; a later editing stage may move it.
    pub source_start: f64,
    /// End in seconds in the source video.
    pub source_end: f64,
    pub duration: f64,
    /// True for silence clips (shown for visualization, cut on render).
    pub is_silent: bool,
}

impl Clip {
    /// Create a clip whose source range matches its timeline range.
    pub fn new(id: ClipId, start: f64, end: f64, is_silent: bool) -> Self {
        Self {
            id,
            start,
            end,
            source_start: start,
            source_end: end,
            duration: (end - start).max(0.0),
            is_silent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_ids_are_stable() {
        assert_eq!(ClipId::speech(3).as_str(), "speech-3");
        assert_eq!(ClipId::silence(0).to_string(), "silence-0");
        assert_ne!(ClipId::speech(0), ClipId::silence(0));
    }

    #[test]
    fn test_clip_source_range_matches() {
        let clip = Clip::new(ClipId::speech(0), 1.0, 3.5, false);
        assert_eq!(clip.source_start, 1.0);
        assert_eq!(clip.source_end, 3.5);
        assert!((clip.duration - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clip_camel_case() {
        let clip = Clip::new(ClipId::silence(1), 0.0, 1.0, true);
        let json = serde_json::to_value(&clip).unwrap();
        assert_eq!(json["isSilent"], true);
        assert_eq!(json["sourceStart"], 0.0);
        assert_eq!(json["id"], "silence-1");
    }
}
