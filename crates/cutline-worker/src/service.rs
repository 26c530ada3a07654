//! Silence analysis service.
//!
//! Wraps the analysis pipeline with the persisted cache and in-process
//! single-flight locking: at most one computation runs per cache key, and
//! concurrent requests for the same key wait for it and then read the
//! freshly written entry.
//!
//! # Usage
//!
//! ```ignore
//! let service = AnalysisService::new(WorkerConfig::from_env());
//! let request = AnalysisRequest::new("/videos/talk.mp4").with_margin(0.3);
//! let response = service.handle(&request, None).await;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use cutline_media::{
    analyze_audio_file, AudioDecoder, FfmpegAudioDecoder, MediaError, SilenceDetectionConfig,
};
use cutline_models::{AnalysisRequest, AnalysisResponse, AnalysisResult};
use cutline_storage::{analysis_cache_key, AnalysisCache, CacheKey, ContentSignature};
use tokio::sync::{watch, Mutex};
use tracing::{debug, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::AnalysisLogger;
use crate::metrics::{self, AnalysisOutcome};

/// Per-key locks for computations in progress.
///
/// The map itself is only locked briefly and never across an await, so a
/// std mutex lets [`KeyLease`] release its entry from `Drop`.
type InFlight = Arc<std::sync::Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>>;

/// A computed or cached analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub result: AnalysisResult,
    pub from_cache: bool,
}

/// Service for silence analysis with caching and single-flight locking.
#[derive(Clone)]
pub struct AnalysisService {
    config: WorkerConfig,
    cache: AnalysisCache,
    decoder: Arc<dyn AudioDecoder>,
    in_flight: InFlight,
}

impl AnalysisService {
    /// Create a service that decodes with FFmpeg.
    pub fn new(config: WorkerConfig) -> Self {
        let decoder = FfmpegAudioDecoder::new()
            .with_work_dir(config.work_dir.clone())
            .with_timeout(Some(config.analysis_timeout.as_secs()));
        Self::with_decoder(config, Arc::new(decoder))
    }

    /// Create a service with a custom decoder.
    pub fn with_decoder(config: WorkerConfig, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self {
            cache: AnalysisCache::new(config.cache_dir.clone()),
            config,
            decoder,
            in_flight: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Run an analysis and wrap the outcome in the response contract.
    ///
    /// Never fails: errors become `success = false` with the error message.
    pub async fn handle(
        &self,
        request: &AnalysisRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> AnalysisResponse {
        match self.analyze(request, cancel_rx).await {
            Ok(output) => AnalysisResponse::success(output.result, output.from_cache),
            Err(e) => AnalysisResponse::failure(e.to_string()),
        }
    }

    /// Analyze a video, reading through the cache.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<AnalysisOutput> {
        let logger = AnalysisLogger::new(&request.video_base_name(), "silence_analysis");
        let span = logger.create_span();
        let started = Instant::now();

        let outcome = self
            .analyze_inner(request, cancel_rx, &logger)
            .instrument(span)
            .await;

        let label = match &outcome {
            Ok(output) if output.from_cache => AnalysisOutcome::Cached,
            Ok(_) => AnalysisOutcome::Computed,
            Err(e) if e.is_cancelled() => AnalysisOutcome::Cancelled,
            Err(WorkerError::Timeout(_)) => AnalysisOutcome::TimedOut,
            Err(_) => AnalysisOutcome::Failed,
        };
        metrics::record_analysis(label, started.elapsed());

        match &outcome {
            Ok(output) => logger.log_completion(&format!(
                "{} silence segments, {:.1}% saved (from_cache={})",
                output.result.statistics.silence_segment_count,
                output.result.statistics.time_saved_percentage,
                output.from_cache
            )),
            Err(e) if e.is_cancelled() => logger.log_warning("cancelled"),
            Err(e) => logger.log_error(&e.to_string()),
        }

        outcome
    }

    async fn analyze_inner(
        &self,
        request: &AnalysisRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
        logger: &AnalysisLogger,
    ) -> WorkerResult<AnalysisOutput> {
        request.validate_request()?;

        let video_path = Path::new(&request.video_path);
        if !tokio::fs::try_exists(video_path).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(video_path.to_path_buf()).into());
        }

        logger.log_start(&format!(
            "margin={}s mode={}",
            request.silence_margin,
            request.detection_mode()
        ));

        let detection = SilenceDetectionConfig::from_request(request)
            .with_waveform_points(self.config.waveform_points);
        let signature = ContentSignature::from_path(video_path).await?;
        let key = analysis_cache_key(
            &request.video_base_name(),
            &signature,
            detection.silence_margin,
            detection.detection_mode,
            detection.fixed_threshold_db,
        );

        if let Some(result) = self.cache.load(&key).await {
            metrics::record_cache_hit();
            return Ok(AnalysisOutput {
                result,
                from_cache: true,
            });
        }

        // Released on drop, also when this future is abandoned mid-flight
        let lease = KeyLease::acquire(&self.in_flight, key);
        self.compute_once(&lease.key, &lease.lock, video_path, &detection, cancel_rx, logger)
            .await
    }

    /// Compute under the per-key lock, re-checking the cache after waiting.
    async fn compute_once(
        &self,
        key: &CacheKey,
        lock: &Arc<Mutex<()>>,
        video_path: &Path,
        detection: &SilenceDetectionConfig,
        cancel_rx: Option<watch::Receiver<bool>>,
        logger: &AnalysisLogger,
    ) -> WorkerResult<AnalysisOutput> {
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(key = %key, "Waiting for in-flight analysis");
                metrics::record_single_flight_wait();
                lock.lock().await
            }
        };

        if let Some(result) = self.cache.load(key).await {
            metrics::record_cache_hit();
            return Ok(AnalysisOutput {
                result,
                from_cache: true,
            });
        }
        metrics::record_cache_miss();
        logger.log_progress("cache miss, decoding audio");

        let timeout = self.config.analysis_timeout;
        let result = tokio::time::timeout(
            timeout,
            analyze_audio_file(video_path, self.decoder.as_ref(), detection, cancel_rx),
        )
        .await
        .map_err(|_| WorkerError::Timeout(timeout))??;

        metrics::record_silence_segments(result.silence_segments.len());

        if let Err(e) = self.cache.store(key, &result).await {
            metrics::record_cache_write_failure();
            logger.log_warning(&format!("failed to store analysis in cache: {e}"));
        }

        Ok(AnalysisOutput {
            result,
            from_cache: false,
        })
    }

    /// Number of keys with a computation in progress or waiting.
    pub fn in_flight_count(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }
}

fn lock_in_flight(
    in_flight: &InFlight,
) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<Mutex<()>>>> {
    // The map stays consistent even if a holder panicked
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A request's share of a per-key lock.
///
/// The map entry is removed when the last lease for the key is dropped.
struct KeyLease {
    in_flight: InFlight,
    key: CacheKey,
    lock: Arc<Mutex<()>>,
}

impl KeyLease {
    fn acquire(in_flight: &InFlight, key: CacheKey) -> Self {
        let lock = lock_in_flight(in_flight)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            in_flight: Arc::clone(in_flight),
            key,
            lock,
        }
    }
}

impl Drop for KeyLease {
    fn drop(&mut self) {
        let mut in_flight = lock_in_flight(&self.in_flight);
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}
