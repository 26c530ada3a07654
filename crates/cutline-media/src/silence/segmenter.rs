//! State machine for converting frame levels into silence/speech segments.
//!
//! # State Machine
//!
//! ```text
//!                       level >= threshold
//!     ┌─────────────────────────────────────────────────┐
//!     │                                                 │
//!     ▼                                                 │
//! ┌─────────┐                                     ┌─────────┐
//! │InSpeech │────────────────────────────────────►│InSilence│
//! └─────────┘        level < threshold            └─────────┘
//!                                                       │
//!            silence_duration >= margin                 │
//!     ◄────────── emit speech + silence ────────────────┘
//! ```
//!
//! A quiet run shorter than the margin is absorbed into the surrounding
//! speech, so silence and speech always tile `[0, duration)`.

use cutline_models::{AudioFrame, Clip, ClipId, SilenceSegment, SpeechSegment};

use super::threshold::is_silent;

/// Internal state for the segmenter state machine.
enum State {
    /// Currently in speech.
    InSpeech,
    /// Currently in a quiet run, accumulating its levels for confidence.
    InSilence {
        start: f64,
        level_sum: f64,
        frames: usize,
    },
}

/// Silence and speech segments for one analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub silence_segments: Vec<SilenceSegment>,
    pub speech_segments: Vec<SpeechSegment>,
}

/// Converts a stream of frame levels into silence and speech segments.
pub struct SegmentBuilder {
    threshold_db: f32,
    floor_db: f32,
    margin: f64,
    state: State,
    speech_start: f64,
    output: Segmentation,
}

impl SegmentBuilder {
    /// Create a builder for the given threshold, floor and minimum silence.
    pub fn new(threshold_db: f32, floor_db: f32, margin: f64) -> Self {
        Self {
            threshold_db,
            floor_db,
            margin,
            state: State::InSpeech,
            speech_start: 0.0,
            output: Segmentation::default(),
        }
    }

    /// Process one frame.
    pub fn ingest_frame(&mut self, time: f64, level_db: f32) {
        let silent = is_silent(level_db, self.threshold_db, self.floor_db);

        match (&mut self.state, silent) {
            (State::InSpeech, true) => {
                self.state = State::InSilence {
                    start: time,
                    level_sum: level_db as f64,
                    frames: 1,
                };
            }

            (State::InSilence {
                level_sum, frames, ..
            }, true) => {
                *level_sum += level_db as f64;
                *frames += 1;
            }

            (State::InSilence { .. }, false) => {
                self.close_silence(time);
            }

            (State::InSpeech, false) => {}
        }
    }

    /// Close the stream at `duration` and return the segments.
    pub fn finalize(mut self, duration: f64) -> Segmentation {
        if matches!(self.state, State::InSilence { .. }) {
            self.close_silence(duration);
        }

        if duration > self.speech_start {
            self.output
                .speech_segments
                .push(SpeechSegment::new(self.speech_start, duration));
        }

        self.output
    }

    /// End the current quiet run at `end`, keeping it only when long enough.
    fn close_silence(&mut self, end: f64) {
        let State::InSilence {
            start,
            level_sum,
            frames,
        } = std::mem::replace(&mut self.state, State::InSpeech)
        else {
            return;
        };

        if end <= start || end - start < self.margin {
            // Too short to cut; stays part of the surrounding speech
            return;
        }

        if start > self.speech_start {
            self.output
                .speech_segments
                .push(SpeechSegment::new(self.speech_start, start));
        }

        let mean_level = if frames > 0 {
            (level_sum / frames as f64) as f32
        } else {
            self.floor_db
        };
        let confidence = silence_confidence(mean_level, self.threshold_db, self.floor_db);

        self.output
            .silence_segments
            .push(SilenceSegment::new(start, end, confidence));
        self.speech_start = end;
    }
}

/// How far below the threshold a silent range sits, scaled to `[0, 1]`.
///
/// A range at the floor scores 1.0 and a range just under the threshold
/// scores close to 0.
pub fn silence_confidence(mean_level_db: f32, threshold_db: f32, floor_db: f32) -> f32 {
    let span = threshold_db - floor_db;
    if span <= 0.0 {
        return 1.0;
    }
    ((threshold_db - mean_level_db) / span).clamp(0.0, 1.0)
}

/// Run the state machine over a full frame sequence.
pub fn build_segments(
    frames: &[AudioFrame],
    threshold_db: f32,
    floor_db: f32,
    margin: f64,
    duration: f64,
) -> Segmentation {
    let mut builder = SegmentBuilder::new(threshold_db, floor_db, margin);
    for frame in frames {
        builder.ingest_frame(frame.time, frame.level_db);
    }
    builder.finalize(duration)
}

/// One clip per segment, ordered by start time.
pub fn build_clips(silence: &[SilenceSegment], speech: &[SpeechSegment]) -> Vec<Clip> {
    let mut clips: Vec<Clip> = speech
        .iter()
        .enumerate()
        .map(|(i, s)| Clip::new(ClipId::speech(i), s.start, s.end, false))
        .chain(
            silence
                .iter()
                .enumerate()
                .map(|(i, s)| Clip::new(ClipId::silence(i), s.start, s.end, true)),
        )
        .collect();

    clips.sort_by(|a, b| a.start.total_cmp(&b.start));
    clips
}
