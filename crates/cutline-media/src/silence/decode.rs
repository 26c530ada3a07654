//! Audio decoding for silence analysis.
//!
//! The analysis only needs a mono `f32` signal at a fixed rate. Production
//! decoding shells out to FFmpeg; tests plug in their own [`AudioDecoder`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tracing::debug;

use crate::command::{is_cancelled, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_audio;

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// File the samples came from.
    pub source: PathBuf,
    /// Mono samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(source: impl Into<PathBuf>, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            source: source.into(),
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        super::features::signal_duration(self.samples.len(), self.sample_rate)
    }
}

/// Source of decoded audio for analysis.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode the audio track of `path` to mono samples at `sample_rate`.
    ///
    /// Returns [`MediaError::NoAudioTrack`] when the file has no audio.
    async fn decode(
        &self,
        path: &Path,
        sample_rate: u32,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<DecodedAudio>;
}

/// Decoder backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegAudioDecoder {
    work_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl FfmpegAudioDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory for intermediate raw audio files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Kill FFmpeg if decoding takes longer than this.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn temp_file(&self) -> MediaResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cutline-audio-").suffix(".f32");
        let file = match &self.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        Ok(file)
    }
}

#[async_trait]
impl AudioDecoder for FfmpegAudioDecoder {
    async fn decode(
        &self,
        path: &Path,
        sample_rate: u32,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<DecodedAudio> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let info = probe_audio(path).await?;
        if !info.has_audio {
            return Err(MediaError::no_audio_track(path));
        }

        if is_cancelled(cancel_rx.as_ref()) {
            return Err(MediaError::Cancelled);
        }

        let raw = self.temp_file()?;
        let cmd = FfmpegCommand::new(path, raw.path())
            .no_video()
            .audio_channels(1)
            .audio_sample_rate(sample_rate)
            .format("f32le");

        FfmpegRunner::new()
            .with_cancel(cancel_rx)
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await?;

        let samples = load_audio_samples(raw.path()).await?;
        if samples.is_empty() {
            return Err(MediaError::no_audio_track(path));
        }

        debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate,
            codec = info.codec.as_deref().unwrap_or("unknown"),
            "Decoded audio track"
        );

        Ok(DecodedAudio::new(path, samples, sample_rate))
    }
}

/// Load raw f32le audio samples from a file.
pub async fn load_audio_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(samples_from_f32le(&bytes))
}

/// Convert little-endian `f32` bytes to samples, ignoring a trailing partial sample.
pub fn samples_from_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_samples_from_f32le() {
        let mut bytes = Vec::new();
        for s in [0.5f32, -1.0, 0.25] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes.push(0xFF);

        assert_eq!(samples_from_f32le(&bytes), vec![0.5, -1.0, 0.25]);
    }

    #[tokio::test]
    async fn test_load_samples_empty_file() {
        let temp = NamedTempFile::new().unwrap();
        let samples = load_audio_samples(temp.path()).await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_load_samples_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&0.75f32.to_le_bytes()).unwrap();
        temp.flush().unwrap();

        let samples = load_audio_samples(temp.path()).await.unwrap();
        assert_eq!(samples, vec![0.75]);
    }

    #[test]
    fn test_decoded_duration() {
        let audio = DecodedAudio::new("a.wav", vec![0.0; 44_100], 22_050);
        assert!((audio.duration() - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_ffmpeg_decoder_missing_file() {
        let decoder = FfmpegAudioDecoder::new();
        let err = decoder
            .decode(Path::new("/no/such/video.mp4"), 22_050, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and a fixture video"]
    async fn test_ffmpeg_decoder_real_file() {
        let path = std::env::var("CUTLINE_TEST_VIDEO").unwrap();
        let decoder = FfmpegAudioDecoder::new();
        let audio = decoder.decode(Path::new(&path), 22_050, None).await.unwrap();
        assert!(!audio.samples.is_empty());
        assert_eq!(audio.sample_rate, 22_050);
    }
}
