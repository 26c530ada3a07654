//! Configuration for silence detection.
//!
//! Every numeric constant of the analysis lives here so a single value
//! describes one run. The defaults reproduce the production tuning:
//! 22.05 kHz mono, 2048-sample frames with a 512-sample hop, a -60 dB floor
//! and a 50-bin level histogram.

use cutline_models::{
    AnalysisRequest, DetectionMode, DEFAULT_FIXED_THRESHOLD_DB, DEFAULT_SILENCE_MARGIN_SECS,
};
use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Configuration for one silence analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceDetectionConfig {
    /// Decode sample rate in Hz.
    pub sample_rate: u32,

    /// Samples per analysis frame.
    pub frame_length: usize,

    /// Samples between consecutive frame centres.
    pub hop_length: usize,

    /// Lowest representable level in dB. Quieter frames are clamped here.
    pub floor_db: f32,

    /// Number of histogram bins spanning `[floor_db, 0]`.
    pub histogram_bins: usize,

    /// Minimum peak height as a fraction of the tallest bin.
    pub peak_min_height_ratio: f32,

    /// Minimum separation between kept peaks, in bins.
    pub peak_min_distance_bins: usize,

    /// Offset below a lone peak used as the threshold.
    pub single_peak_offset_db: f32,

    /// Threshold when the histogram has no usable peak.
    pub fallback_threshold_db: f32,

    /// Headroom added to the estimated threshold before clamping.
    pub threshold_headroom_db: f32,

    /// Upper bound on the adaptive threshold.
    ///
    /// Keeps a noisy histogram from classifying normal speech as silence.
    pub max_threshold_db: f32,

    /// Minimum silence duration in seconds that becomes a cut.
    pub silence_margin: f64,

    /// Adaptive or caller-supplied threshold.
    pub detection_mode: DetectionMode,

    /// Threshold used in [`DetectionMode::Fixed`].
    pub fixed_threshold_db: f32,

    /// Length of the display waveform.
    pub waveform_points: usize,
}

impl Default for SilenceDetectionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            frame_length: 2048,
            hop_length: 512,
            floor_db: -60.0,
            histogram_bins: 50,
            peak_min_height_ratio: 0.1,
            peak_min_distance_bins: 5,
            single_peak_offset_db: 10.0,
            fallback_threshold_db: -40.0,
            threshold_headroom_db: 5.0,
            max_threshold_db: -25.0,
            silence_margin: DEFAULT_SILENCE_MARGIN_SECS,
            detection_mode: DetectionMode::Smart,
            fixed_threshold_db: DEFAULT_FIXED_THRESHOLD_DB,
            waveform_points: 1000,
        }
    }
}

impl SilenceDetectionConfig {
    /// Build a configuration from a validated request.
    pub fn from_request(request: &AnalysisRequest) -> Self {
        Self {
            silence_margin: request.silence_margin,
            detection_mode: request.detection_mode(),
            fixed_threshold_db: request.fixed_threshold_db(),
            ..Self::default()
        }
    }

    /// Builder-style setter for the silence margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.silence_margin = margin;
        self
    }

    /// Switch to a fixed threshold.
    pub fn with_fixed_threshold(mut self, threshold_db: f32) -> Self {
        self.detection_mode = DetectionMode::Fixed;
        self.fixed_threshold_db = threshold_db;
        self
    }

    /// Builder-style setter for the waveform length.
    pub fn with_waveform_points(mut self, points: usize) -> Self {
        self.waveform_points = points;
        self
    }

    /// Builder-style setter for the decode sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Seconds between consecutive frames.
    pub fn hop_seconds(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// Width of one histogram bin in dB.
    pub fn bin_width_db(&self) -> f32 {
        -self.floor_db / self.histogram_bins as f32
    }

    /// Reject configurations the numeric pass cannot run with.
    pub fn validate(&self) -> MediaResult<()> {
        if self.sample_rate == 0 {
            return Err(MediaError::invalid_parameters("sample_rate must be positive"));
        }
        if self.frame_length == 0 || self.hop_length == 0 {
            return Err(MediaError::invalid_parameters(
                "frame_length and hop_length must be positive",
            ));
        }
        if !self.floor_db.is_finite() || self.floor_db >= 0.0 {
            return Err(MediaError::invalid_parameters("floor_db must be negative"));
        }
        if self.histogram_bins == 0 {
            return Err(MediaError::invalid_parameters("histogram_bins must be positive"));
        }
        if !self.silence_margin.is_finite() || self.silence_margin < 0.0 {
            return Err(MediaError::invalid_parameters(format!(
                "silence_margin must be a non-negative number, got {}",
                self.silence_margin
            )));
        }
        if !self.fixed_threshold_db.is_finite() {
            return Err(MediaError::invalid_parameters("fixed_threshold_db must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SilenceDetectionConfig::default();
        assert_eq!(config.sample_rate, 22_050);
        assert_eq!(config.frame_length, 2048);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.histogram_bins, 50);
        assert_eq!(config.waveform_points, 1000);
        assert_eq!(config.detection_mode, DetectionMode::Smart);
        assert!((config.bin_width_db() - 1.2).abs() < 1e-6);
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_from_request() {
        let request = AnalysisRequest::new("/videos/talk.mp4")
            .with_margin(0.5)
            .with_fixed_threshold(-30.0);

        let config = SilenceDetectionConfig::from_request(&request);
        assert!((config.silence_margin - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.detection_mode, DetectionMode::Fixed);
        assert!((config.fixed_threshold_db + 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SilenceDetectionConfig::default()
            .with_margin(0.15)
            .with_waveform_points(64)
            .with_sample_rate(8000);

        assert!((config.silence_margin - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.waveform_points, 64);
        assert!((config.hop_seconds() - 0.064).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_zero_hop() {
        let config = SilenceDetectionConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MediaError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_margin() {
        let config = SilenceDetectionConfig::default().with_margin(-1.0);
        tokio_test::assert_err!(config.validate());
    }
}
