//! Frame energy extraction.
//!
//! Frames are centred on `i * hop` and zero padded outside the signal, so a
//! signal of `n` samples yields `1 + n / hop` frames and frame `i` sits at
//! `i * hop / sample_rate` seconds.

use std::path::PathBuf;

use cutline_models::AudioFrame;

use crate::error::{MediaError, MediaResult};

/// Compute per-frame RMS energy for a mono signal.
///
/// Non-finite samples contribute zero energy.
pub fn extract_frames(
    samples: &[f32],
    sample_rate: u32,
    frame_length: usize,
    hop_length: usize,
) -> MediaResult<Vec<AudioFrame>> {
    if sample_rate == 0 || frame_length == 0 || hop_length == 0 {
        return Err(MediaError::invalid_parameters(format!(
            "sample_rate={sample_rate}, frame_length={frame_length} and hop_length={hop_length} must all be positive"
        )));
    }
    if samples.is_empty() {
        return Err(MediaError::no_audio_track(PathBuf::from("decoded samples")));
    }

    let n = samples.len();
    let half = frame_length / 2;
    let frame_count = 1 + n / hop_length;

    // Window bounds only move forward, so keep one running sum
    let mut sum_sq = 0.0f64;
    let (mut lo, mut hi) = (0usize, 0usize);

    let frames = (0..frame_count)
        .map(|i| {
            let center = i * hop_length;
            // Window is [center - half, center - half + frame_length), clipped to the signal
            let start = center.saturating_sub(half).min(n);
            let end = (center + frame_length).saturating_sub(half).min(n);

            sum_sq += samples[hi.max(start)..end.max(hi)].iter().map(|&s| squared(s)).sum::<f64>();
            sum_sq -= samples[lo..start.min(hi)].iter().map(|&s| squared(s)).sum::<f64>();
            (lo, hi) = (start, end.max(hi));
            if lo >= hi {
                // Empty window, drop accumulated rounding error
                sum_sq = 0.0;
            }

            let energy = (sum_sq / frame_length as f64).max(0.0).sqrt() as f32;
            let time = center as f64 / sample_rate as f64;
            AudioFrame::new(time, energy)
        })
        .collect();

    Ok(frames)
}

fn squared(sample: f32) -> f64 {
    if sample.is_finite() {
        let s = sample as f64;
        s * s
    } else {
        0.0
    }
}

/// Signal duration in seconds.
pub fn signal_duration(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}
