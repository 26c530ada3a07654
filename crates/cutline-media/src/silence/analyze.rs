//! Silence analysis pipeline.
//!
//! This module handles:
//! 1. Decoding the audio track to mono f32 at the analysis rate
//! 2. Measuring per-frame energy and peak-relative levels
//! 3. Choosing a threshold and segmenting silence from speech
//! 4. Deriving clips, the display waveform and statistics

use std::path::Path;

use cutline_models::{AnalysisResult, ANALYSIS_RESULT_VERSION};
use tokio::sync::watch;
use tracing::{debug, info};

use super::config::SilenceDetectionConfig;
use super::decode::{AudioDecoder, DecodedAudio};
use super::features::extract_frames;
use super::segmenter::{build_clips, build_segments};
use super::stats::compute_statistics;
use super::threshold::{assign_levels, select_threshold};
use super::waveform::downsample_waveform;
use crate::command::is_cancelled;
use crate::error::{MediaError, MediaResult};

/// Run the numeric pass over decoded audio.
///
/// Pure and deterministic: the same samples and configuration always give
/// the same result.
pub fn analyze_samples(
    audio: &DecodedAudio,
    config: &SilenceDetectionConfig,
) -> MediaResult<AnalysisResult> {
    config.validate()?;
    if audio.samples.is_empty() {
        return Err(MediaError::no_audio_track(&audio.source));
    }

    let mut frames = extract_frames(
        &audio.samples,
        audio.sample_rate,
        config.frame_length,
        config.hop_length,
    )?;
    let peak = assign_levels(&mut frames, config.floor_db);
    let levels: Vec<f32> = frames.iter().map(|f| f.level_db).collect();

    let estimate = select_threshold(&levels, config);
    debug!(
        peak_energy = peak,
        threshold_db = estimate.threshold_db,
        raw_threshold_db = estimate.raw_threshold_db,
        method = %estimate.method,
        peaks = ?estimate.peaks,
        "Selected silence threshold"
    );

    let duration = audio.duration();
    let segmentation = build_segments(
        &frames,
        estimate.threshold_db,
        config.floor_db,
        config.silence_margin,
        duration,
    );
    let clips = build_clips(&segmentation.silence_segments, &segmentation.speech_segments);
    let statistics = compute_statistics(
        duration,
        &segmentation.silence_segments,
        &segmentation.speech_segments,
        clips.len(),
    );
    let waveform_data = downsample_waveform(&levels, config.floor_db, config.waveform_points);

    let average_level_db = if levels.is_empty() {
        config.floor_db
    } else {
        (levels.iter().map(|&l| l as f64).sum::<f64>() / levels.len() as f64) as f32
    };
    let max_level_db = levels.iter().copied().fold(config.floor_db, f32::max);

    Ok(AnalysisResult {
        version: ANALYSIS_RESULT_VERSION,
        duration,
        silence_segments: segmentation.silence_segments,
        speech_segments: segmentation.speech_segments,
        clips,
        waveform_data,
        recommended_threshold: estimate.threshold_db,
        threshold_method: estimate.method,
        statistics,
        sample_rate: audio.sample_rate,
        analysis_frames: frames.len(),
        margin: config.silence_margin,
        detection_mode: config.detection_mode,
        average_level_db,
        max_level_db,
    })
}

/// Decode a media file and analyze its audio track.
///
/// Cancellation is checked before decoding, after decoding and after the
/// numeric pass. The numeric pass runs on the blocking pool.
pub async fn analyze_audio_file(
    input_path: &Path,
    decoder: &dyn AudioDecoder,
    config: &SilenceDetectionConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<AnalysisResult> {
    config.validate()?;

    debug!(
        path = %input_path.display(),
        margin = config.silence_margin,
        mode = %config.detection_mode,
        "Starting silence analysis"
    );

    if is_cancelled(cancel_rx.as_ref()) {
        return Err(MediaError::Cancelled);
    }

    let audio = decoder
        .decode(input_path, config.sample_rate, cancel_rx.clone())
        .await?;

    if is_cancelled(cancel_rx.as_ref()) {
        return Err(MediaError::Cancelled);
    }

    let pass_config = config.clone();
    let result = tokio::task::spawn_blocking(move || analyze_samples(&audio, &pass_config))
        .await
        .map_err(|e| MediaError::internal(format!("analysis task failed: {e}")))??;

    if is_cancelled(cancel_rx.as_ref()) {
        return Err(MediaError::Cancelled);
    }

    info!(
        path = %input_path.display(),
        duration = result.duration,
        silence_segments = result.statistics.silence_segment_count,
        time_saved = format!("{:.1}%", result.statistics.time_saved_percentage),
        threshold_db = result.recommended_threshold,
        "Silence analysis complete"
    );

    Ok(result)
}

/// Debug helper: dump per-frame levels and the threshold to a JSON file.
///
/// Useful when tuning the histogram parameters.
#[cfg(feature = "debug-levels")]
pub async fn dump_level_debug(
    audio: &DecodedAudio,
    config: &SilenceDetectionConfig,
    output_path: &Path,
) -> MediaResult<()> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct LevelDump<'a> {
        threshold: &'a super::threshold::ThresholdEstimate,
        histogram: Vec<usize>,
        frames: &'a [cutline_models::AudioFrame],
    }

    let mut frames = extract_frames(
        &audio.samples,
        audio.sample_rate,
        config.frame_length,
        config.hop_length,
    )?;
    assign_levels(&mut frames, config.floor_db);
    let levels: Vec<f32> = frames.iter().map(|f| f.level_db).collect();
    let threshold = select_threshold(&levels, config);
    let histogram =
        super::threshold::level_histogram(&levels, config.floor_db, config.histogram_bins);

    let json = serde_json::to_string_pretty(&LevelDump {
        threshold: &threshold,
        histogram,
        frames: &frames,
    })?;
    tokio::fs::write(output_path, json).await?;

    info!(
        frames = frames.len(),
        output = %output_path.display(),
        "Level debug output written"
    );

    Ok(())
}
