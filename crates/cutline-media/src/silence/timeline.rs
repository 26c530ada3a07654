//! Mapping between the original and the compressed (silence-removed)
//! timelines.
//!
//! The compressed timeline plays the kept ranges back to back. Positions
//! inside a removed range map to the boundary where the next kept range
//! starts in the compressed timeline.

use cutline_models::{AnalysisResult, MapDirection, SilenceSegment};

/// Kept ranges of a video and their total compressed length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineMap {
    kept: Vec<(f64, f64)>,
    duration: f64,
    compressed_duration: f64,
}

impl TimelineMap {
    /// Build the map from silence segments over `[0, duration)`.
    ///
    /// Segments may be unsorted or overlapping; they are clipped to the
    /// video and merged first.
    pub fn new(silence: &[SilenceSegment], duration: f64) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

        let mut removed: Vec<(f64, f64)> = silence
            .iter()
            .map(|s| (s.start.max(0.0), s.end.min(duration)))
            .filter(|(start, end)| end > start)
            .collect();
        removed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(removed.len());
        for (start, end) in removed {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let mut kept = Vec::with_capacity(merged.len() + 1);
        let mut cursor = 0.0;
        for (start, end) in merged {
            if start > cursor {
                kept.push((cursor, start));
            }
            cursor = end;
        }
        if duration > cursor {
            kept.push((cursor, duration));
        }

        let compressed_duration = kept.iter().map(|(s, e)| e - s).sum();

        Self {
            kept,
            duration,
            compressed_duration,
        }
    }

    /// Build the map for an analysis result.
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self::new(&result.silence_segments, result.duration)
    }

    /// Length of the original timeline.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Length of the timeline with silence removed.
    pub fn compressed_duration(&self) -> f64 {
        self.compressed_duration
    }

    /// Kept `(start, end)` ranges in original time, ascending.
    pub fn kept_ranges(&self) -> &[(f64, f64)] {
        &self.kept
    }

    /// Map a compressed position to original time.
    pub fn compressed_to_original(&self, t: f64) -> f64 {
        if t.is_nan() || t < 0.0 {
            return 0.0;
        }
        if t >= self.compressed_duration {
            return self.duration;
        }

        let mut cumulative = 0.0;
        for &(start, end) in &self.kept {
            let len = end - start;
            if t < cumulative + len {
                return start + (t - cumulative);
            }
            cumulative += len;
        }

        self.duration
    }

    /// Map an original position to compressed time.
    pub fn original_to_compressed(&self, t: f64) -> f64 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= self.duration {
            return self.compressed_duration;
        }

        let mut cumulative = 0.0;
        for &(start, end) in &self.kept {
            if end <= t {
                cumulative += end - start;
            } else {
                if t > start {
                    cumulative += t - start;
                }
                break;
            }
        }

        cumulative
    }

    /// Map a batch of positions in one direction.
    pub fn map_timestamps(&self, positions: &[f64], direction: MapDirection) -> Vec<f64> {
        positions
            .iter()
            .map(|&t| match direction {
                MapDirection::ToOriginal => self.compressed_to_original(t),
                MapDirection::ToCompressed => self.original_to_compressed(t),
            })
            .collect()
    }
}

/// Map a compressed position to original time.
pub fn compressed_to_original(t: f64, silence: &[SilenceSegment], duration: f64) -> f64 {
    TimelineMap::new(silence, duration).compressed_to_original(t)
}

/// Map an original position to compressed time.
pub fn original_to_compressed(t: f64, silence: &[SilenceSegment], duration: f64) -> f64 {
    TimelineMap::new(silence, duration).original_to_compressed(t)
}
