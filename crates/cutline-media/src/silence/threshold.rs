//! Adaptive silence threshold estimation.
//!
//! Levels are measured relative to the loudest frame, so the estimate does
//! not depend on recording gain. A video with pauses produces a bimodal level
//! histogram: one mode for speech near 0 dB and one near the floor. The cut
//! level is placed in the valley between them.
//!
//! ```text
//!  count
//!    │ █                                        █
//!    │ █                                       ██
//!    │ █ ▂                                   ▃███
//!    │ ███▁▁        valley                ▂▅█████
//!    └─────────────────┬──────────────────────────► dB
//!   -60                t                          0
//! ```

use cutline_models::{AudioFrame, DetectionMode, ThresholdMethod};
use serde::{Deserialize, Serialize};

use super::config::SilenceDetectionConfig;

/// Outcome of threshold selection for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEstimate {
    /// Threshold applied to frame levels, in dB.
    pub threshold_db: f32,
    /// Value chosen by the policy before headroom and clamping.
    pub raw_threshold_db: f32,
    /// Policy branch that produced the threshold.
    pub method: ThresholdMethod,
    /// Histogram bins accepted as peaks, ascending.
    pub peaks: Vec<usize>,
}

/// Convert an energy to a level relative to `peak`, clamped to `floor_db`.
pub fn level_db(energy: f32, peak: f32, floor_db: f32) -> f32 {
    if energy.is_nan() || peak.is_nan() || energy <= 0.0 || peak <= 0.0 {
        return floor_db;
    }
    let db = 20.0 * (energy / peak).log10();
    if db.is_finite() {
        db.max(floor_db)
    } else {
        floor_db
    }
}

/// Fill `level_db` on every frame relative to the loudest frame.
///
/// Returns the peak energy. All-zero input leaves every level at the floor.
pub fn assign_levels(frames: &mut [AudioFrame], floor_db: f32) -> f32 {
    let peak = frames
        .iter()
        .map(|f| f.energy)
        .filter(|e| e.is_finite())
        .fold(0.0f32, f32::max);

    for frame in frames.iter_mut() {
        frame.level_db = level_db(frame.energy, peak, floor_db);
    }

    peak
}

/// Histogram of levels over `[floor_db, 0]` with `bins` equal-width bins.
///
/// Levels at exactly 0 dB land in the last bin.
pub fn level_histogram(levels: &[f32], floor_db: f32, bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 {
        return counts;
    }
    let width = -floor_db / bins as f32;

    for &level in levels {
        let offset = ((level - floor_db) / width).floor();
        let index = if offset.is_finite() && offset > 0.0 {
            (offset as usize).min(bins - 1)
        } else {
            0
        };
        counts[index] += 1;
    }

    counts
}

/// Centre of histogram bin `index` in dB.
pub fn bin_center_db(index: usize, floor_db: f32, bins: usize) -> f32 {
    let width = -floor_db / bins as f32;
    floor_db + (index as f32 + 0.5) * width
}

/// Local maxima of a histogram.
///
/// Bins outside the histogram count as zero, so edge bins can be peaks.
/// A flat top reports its middle bin. Peaks lower than
/// `min_height_ratio * max` are dropped, then taller peaks claim
/// `min_distance` bins around them.
pub fn find_peaks(counts: &[usize], min_height_ratio: f32, min_distance: usize) -> Vec<usize> {
    let Some(&max) = counts.iter().max() else {
        return Vec::new();
    };
    if max == 0 {
        return Vec::new();
    }
    let min_height = max as f64 * min_height_ratio as f64;

    let mut candidates = Vec::new();
    let mut i = 0;
    while i < counts.len() {
        // Extend over a plateau of equal counts
        let mut j = i;
        while j + 1 < counts.len() && counts[j + 1] == counts[i] {
            j += 1;
        }

        let left = if i == 0 { 0 } else { counts[i - 1] };
        let right = counts.get(j + 1).copied().unwrap_or(0);
        let height = counts[i];

        if height > left && height > right && height > 0 && height as f64 >= min_height {
            candidates.push((i + j) / 2);
        }

        i = j + 1;
    }

    candidates.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));

    let mut kept: Vec<usize> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|&k| k.abs_diff(candidate) >= min_distance) {
            kept.push(candidate);
        }
    }
    kept.sort_unstable();
    kept
}

/// Estimate an adaptive threshold from frame levels.
pub fn estimate_threshold(levels: &[f32], config: &SilenceDetectionConfig) -> ThresholdEstimate {
    let bins = config.histogram_bins;
    let floor = config.floor_db;
    let counts = level_histogram(levels, floor, bins);
    let peaks = find_peaks(
        &counts,
        config.peak_min_height_ratio,
        config.peak_min_distance_bins,
    );

    let (raw, method) = match peaks.as_slice() {
        [] => (config.fallback_threshold_db, ThresholdMethod::Fallback),
        [only] => (
            bin_center_db(*only, floor, bins) - config.single_peak_offset_db,
            ThresholdMethod::SinglePeak,
        ),
        [quiet, next, ..] => {
            let valley = valley_between(&counts, *quiet, *next);
            (bin_center_db(valley, floor, bins), ThresholdMethod::Valley)
        }
    };

    let threshold_db = (raw + config.threshold_headroom_db)
        .min(config.max_threshold_db)
        .max(floor);

    ThresholdEstimate {
        threshold_db,
        raw_threshold_db: raw,
        method,
        peaks,
    }
}

/// Pick the threshold for the configured detection mode.
pub fn select_threshold(levels: &[f32], config: &SilenceDetectionConfig) -> ThresholdEstimate {
    match config.detection_mode {
        DetectionMode::Smart => estimate_threshold(levels, config),
        DetectionMode::Fixed => ThresholdEstimate {
            threshold_db: config.fixed_threshold_db,
            raw_threshold_db: config.fixed_threshold_db,
            method: ThresholdMethod::Fixed,
            peaks: Vec::new(),
        },
    }
}

/// A frame is silent when it sits at the floor or below the threshold.
#[inline]
pub fn is_silent(level_db: f32, threshold_db: f32, floor_db: f32) -> bool {
    level_db <= floor_db || level_db < threshold_db
}

/// First bin with the minimum count strictly between two peaks.
fn valley_between(counts: &[usize], left: usize, right: usize) -> usize {
    let mut best = left;
    let mut best_count = usize::MAX;
    for (index, &count) in counts.iter().enumerate().take(right).skip(left + 1) {
        if count < best_count {
            best = index;
            best_count = count;
        }
    }
    best
}
