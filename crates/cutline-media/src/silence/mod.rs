//! Silence detection with an adaptive, per-video threshold.
//!
//! Finds the time ranges of a video's audio track that are quiet enough to
//! cut, without per-video tuning, and maps positions between the original
//! timeline and the timeline with those ranges removed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Audio Input  │───►│ Features     │───►│ Threshold    │
//! │ (22kHz mono) │    │ (frame RMS)  │    │ (histogram)  │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                                                │
//!                                                ▼
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Timeline /   │◄───│ Clips        │◄───│ Segmenter    │
//! │ Waveform /   │    │ (sorted)     │    │ (silence vs  │
//! │ Statistics   │    │              │    │  speech)     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use cutline_media::silence::{
//!     analyze_audio_file,
//!     FfmpegAudioDecoder,
//!     SilenceDetectionConfig,
//!     TimelineMap,
//! };
//!
//! let decoder = FfmpegAudioDecoder::new();
//! let config = SilenceDetectionConfig::default().with_margin(0.3);
//! let result = analyze_audio_file(&input_path, &decoder, &config, None).await?;
//!
//! // Scrub the preview in compressed time
//! let map = TimelineMap::from_result(&result);
//! let source_time = map.compressed_to_original(12.5);
//! ```

mod analyze;
mod config;
mod decode;
mod features;
mod segmenter;
mod stats;
mod threshold;
mod timeline;
mod waveform;

#[cfg(feature = "debug-levels")]
pub use analyze::dump_level_debug;
pub use analyze::{analyze_audio_file, analyze_samples};
pub use config::SilenceDetectionConfig;
pub use decode::{load_audio_samples, samples_from_f32le, AudioDecoder, DecodedAudio, FfmpegAudioDecoder};
pub use features::{extract_frames, signal_duration};
pub use segmenter::{build_clips, build_segments, silence_confidence, SegmentBuilder, Segmentation};
pub use stats::compute_statistics;
pub use threshold::{
    assign_levels, bin_center_db, estimate_threshold, find_peaks, is_silent, level_db,
    level_histogram, select_threshold, ThresholdEstimate,
};
pub use timeline::{compressed_to_original, original_to_compressed, TimelineMap};
pub use waveform::{downsample_waveform, normalize_level};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SilenceDetectionConfig::default();
        assert!((config.silence_margin - 0.2).abs() < f64::EPSILON);
        assert!((config.floor_db + 60.0).abs() < f32::EPSILON);
        assert!((config.max_threshold_db + 25.0).abs() < f32::EPSILON);
    }
}
