#![deny(unreachable_patterns)]
//! Audio decoding and silence segmentation for cutline.
//!
//! This crate provides:
//! - FFmpeg/FFprobe wrappers for decoding a video's audio track
//! - Frame energy extraction and adaptive silence thresholds
//! - Silence/speech segmentation with derived clips
//! - Original/compressed timeline mapping for cut previews
//! - Display waveform and summary statistics

pub mod command;
pub mod error;
pub mod probe;
pub mod silence;

pub use command::{check_ffmpeg, check_ffprobe, is_cancelled, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_audio, AudioInfo};
pub use silence::{
    analyze_audio_file, analyze_samples, AudioDecoder, DecodedAudio, FfmpegAudioDecoder,
    SilenceDetectionConfig, TimelineMap,
};
