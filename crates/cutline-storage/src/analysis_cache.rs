//! Analysis cache helpers.
//!
//! Analysis results are stored on local disk as gzip-compressed JSON so a
//! video is decoded and analyzed at most once per parameter set. Entries are
//! immutable: a parameter change produces a different key, never an update.
//!
//! Layout: `{root}/{video_base_name}/{sha256}.json.gz`

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use cutline_models::{AnalysisResult, DetectionMode, ANALYSIS_RESULT_VERSION};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// File extension for cache entries.
const ENTRY_EXTENSION: &str = "json.gz";

/// Cheap identity of a source file: name, size and modification time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentSignature {
    pub file_name: String,
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch (0 if unknown).
    pub modified_millis: u64,
}

impl ContentSignature {
    /// Read the signature of a file on disk.
    pub async fn from_path(path: &Path) -> StorageResult<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified_millis = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            modified_millis,
        })
    }
}

/// Location of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base_name: String,
    digest: String,
}

impl CacheKey {
    /// Create a key, sanitizing the base name into a single path component.
    pub fn new(base_name: &str, digest: impl Into<String>) -> StorageResult<Self> {
        let digest = digest.into();
        if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::invalid_key(format!(
                "digest must be hex, got '{digest}'"
            )));
        }

        Ok(Self {
            base_name: sanitize_base_name(base_name),
            digest,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Path of the entry relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.base_name).join(format!("{}.{}", self.digest, ENTRY_EXTENSION))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base_name, self.digest)
    }
}

/// Generate the cache key for an analysis.
///
/// The digest covers the content signature and every parameter that changes
/// the result. The fixed threshold only participates in fixed mode.
pub fn analysis_cache_key(
    base_name: &str,
    signature: &ContentSignature,
    margin: f64,
    mode: DetectionMode,
    fixed_threshold_db: f32,
) -> CacheKey {
    let threshold = match mode {
        DetectionMode::Smart => "-".to_string(),
        DetectionMode::Fixed => format!("{:.3}", fixed_threshold_db),
    };
    let material = format!(
        "{}|{}|{}|margin={:.6}|mode={}|threshold={}",
        signature.file_name, signature.size, signature.modified_millis, margin, mode, threshold
    );

    let digest = Sha256::digest(material.as_bytes());
    CacheKey {
        base_name: sanitize_base_name(base_name),
        digest: format!("{:x}", digest),
    }
}

fn sanitize_base_name(base_name: &str) -> String {
    let cleaned: String = base_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "video".to_string()
    } else {
        cleaned
    }
}

/// Compress an `AnalysisResult` to gzip JSON bytes.
pub fn compress_analysis(result: &AnalysisResult) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_string(result).map_err(|e| {
        StorageError::Serialization(format!("Failed to serialize analysis: {}", e))
    })?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).map_err(|e| {
        StorageError::Serialization(format!("Failed to gzip analysis: {}", e))
    })?;

    encoder.finish().map_err(|e| {
        StorageError::Serialization(format!("Failed to finish gzip encoding: {}", e))
    })
}

/// Decompress gzip JSON bytes to an `AnalysisResult`.
///
/// Returns `None` if decompression or deserialization fails, or if the
/// entry was written by an older analysis format.
pub fn decompress_analysis(data: &[u8]) -> Option<AnalysisResult> {
    let mut decoder = GzDecoder::new(data);
    let mut json = String::new();

    if let Err(e) = decoder.read_to_string(&mut json) {
        warn!(error = %e, "Failed to decompress analysis cache");
        return None;
    }

    match serde_json::from_str::<AnalysisResult>(&json) {
        Ok(result) if result.is_current_version() => Some(result),
        Ok(result) => {
            debug!(
                cached_version = result.version,
                current_version = ANALYSIS_RESULT_VERSION,
                "Analysis cache version mismatch, treating as miss"
            );
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to deserialize analysis cache");
            None
        }
    }
}

/// Result of storing an analysis, including actual compressed size.
#[derive(Debug, Clone)]
pub struct StoreResult {
    /// File the analysis was written to
    pub path: PathBuf,
    /// Compressed size in bytes
    pub compressed_size: u64,
}

/// On-disk analysis cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    root: PathBuf,
}

impl AnalysisCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an entry.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Load an analysis.
    ///
    /// Missing, corrupt and outdated entries are all misses. Unreadable
    /// entries are removed so the next store replaces them.
    pub async fn load(&self, key: &CacheKey) -> Option<AnalysisResult> {
        let path = self.entry_path(key);

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %key, "Analysis cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read analysis cache entry");
                return None;
            }
        };

        match decompress_analysis(&data) {
            Some(result) => {
                debug!(
                    key = %key,
                    silence_segments = result.silence_segments.len(),
                    "Analysis cache hit"
                );
                Some(result)
            }
            None => {
                warn!(
                    key = %key,
                    path = %path.display(),
                    "Analysis cache entry corrupt or outdated, removing"
                );
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(key = %key, error = %e, "Failed to remove corrupt cache entry");
                }
                None
            }
        }
    }

    /// Store an analysis atomically.
    ///
    /// The entry is written to a temporary file in the target directory and
    /// renamed into place, so readers never see a partial file.
    pub async fn store(&self, key: &CacheKey, result: &AnalysisResult) -> StorageResult<StoreResult> {
        let path = self.entry_path(key);
        let compressed = compress_analysis(result)?;
        let compressed_size = compressed.len() as u64;

        debug!(
            key = %key,
            silence_segments = result.silence_segments.len(),
            compressed_size = compressed_size,
            "Storing analysis to cache"
        );

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &compressed))
            .await
            .map_err(|e| StorageError::write_failed(format!("write task failed: {e}")))??;

        Ok(StoreResult {
            path,
            compressed_size,
        })
    }

    /// Check if an entry exists.
    ///
    /// Does not verify that the entry is readable or current.
    pub async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.entry_path(key))
            .await
            .unwrap_or(false)
    }

    /// Delete one entry.
    pub async fn remove(&self, key: &CacheKey) -> StorageResult<()> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every entry for a video, returning how many were removed.
    pub async fn clear_video(&self, base_name: &str) -> StorageResult<usize> {
        let dir = self.root.join(sanitize_base_name(base_name));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(ENTRY_EXTENSION) {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        debug!(base_name = base_name, removed = removed, "Cleared analysis cache for video");
        Ok(removed)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::invalid_key(format!("no parent for {}", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| StorageError::write_failed(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_models::{
        AnalysisStatistics, Clip, ClipId, SilenceSegment, SpeechSegment, ThresholdMethod,
    };

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            version: ANALYSIS_RESULT_VERSION,
            duration: 10.0,
            silence_segments: vec![SilenceSegment::new(2.0, 4.0, 0.9)],
            speech_segments: vec![SpeechSegment::new(0.0, 2.0), SpeechSegment::new(4.0, 10.0)],
            clips: vec![
                Clip::new(ClipId::speech(0), 0.0, 2.0, false),
                Clip::new(ClipId::silence(0), 2.0, 4.0, true),
                Clip::new(ClipId::speech(1), 4.0, 10.0, false),
            ],
            waveform_data: vec![0.0, 0.5, 1.0],
            recommended_threshold: -40.0,
            threshold_method: ThresholdMethod::Valley,
            statistics: AnalysisStatistics {
                total_silence_duration: 2.0,
                time_saved_percentage: 20.0,
                new_duration: 8.0,
                silence_segment_count: 1,
                speech_segment_count: 2,
                clip_count: 3,
                speech_ratio: 0.8,
                estimated_cuts: 1,
            },
            sample_rate: 22_050,
            analysis_frames: 431,
            margin: 0.2,
            detection_mode: DetectionMode::Smart,
            average_level_db: -20.0,
            max_level_db: 0.0,
        }
    }

    fn signature() -> ContentSignature {
        ContentSignature {
            file_name: "talk.mp4".to_string(),
            size: 1024,
            modified_millis: 1_700_000_000_000,
        }
    }

    fn key() -> CacheKey {
        analysis_cache_key("talk", &signature(), 0.2, DetectionMode::Smart, -23.0)
    }

    #[test]
    fn test_key_depends_on_parameters() {
        let sig = signature();
        let base = analysis_cache_key("talk", &sig, 0.2, DetectionMode::Smart, -23.0);

        assert_eq!(base, analysis_cache_key("talk", &sig, 0.2, DetectionMode::Smart, -23.0));
        assert_ne!(base, analysis_cache_key("talk", &sig, 0.3, DetectionMode::Smart, -23.0));
        assert_ne!(base, analysis_cache_key("talk", &sig, 0.2, DetectionMode::Fixed, -23.0));
        assert_ne!(
            analysis_cache_key("talk", &sig, 0.2, DetectionMode::Fixed, -23.0),
            analysis_cache_key("talk", &sig, 0.2, DetectionMode::Fixed, -30.0)
        );
        // Threshold is ignored in smart mode
        assert_eq!(base, analysis_cache_key("talk", &sig, 0.2, DetectionMode::Smart, -30.0));

        let touched = ContentSignature {
            modified_millis: sig.modified_millis + 1,
            ..sig.clone()
        };
        assert_ne!(base, analysis_cache_key("talk", &touched, 0.2, DetectionMode::Smart, -23.0));
    }

    #[test]
    fn test_key_layout() {
        let key = key();
        assert_eq!(key.digest().len(), 64);
        let rel = key.relative_path();
        assert!(rel.starts_with("talk"));
        assert!(rel.to_string_lossy().ends_with(".json.gz"));
    }

    #[test]
    fn test_base_name_sanitized() {
        let key = CacheKey::new("../my talk", "abc123").unwrap();
        assert_eq!(key.base_name(), ".._my_talk");
        assert_eq!(CacheKey::new("..", "abc").unwrap().base_name(), "video");
        tokio_test::assert_err!(CacheKey::new("talk", "not-hex"));
    }

    #[test]
    fn test_compress_decompress() {
        let result = sample_result();
        let compressed = compress_analysis(&result).unwrap();
        assert_eq!(decompress_analysis(&compressed), Some(result));
    }

    #[test]
    fn test_compress_preserves_frame_times_exactly() {
        // Frame-aligned times are not dyadic and must survive the cache bit for bit
        let hop = 512.0 / 22_050.0;
        let mut result = sample_result();
        result.duration = 431.0 * hop + 0.000_123;
        result.silence_segments = (1..40)
            .map(|i| SilenceSegment::new(i as f64 * 7.0 * hop, (i as f64 * 7.0 + 3.0) * hop, 0.37))
            .collect();
        result.speech_segments = (0..40)
            .map(|i| SpeechSegment::new((i as f64 * 7.0 + 3.0) * hop, (i as f64 + 1.0) * 7.0 * hop))
            .collect();
        result.margin = 0.15;
        result.statistics.speech_ratio = 1.0 / 3.0;

        let restored = decompress_analysis(&compress_analysis(&result).unwrap()).unwrap();
        for (a, b) in result.silence_segments.iter().zip(&restored.silence_segments) {
            assert_eq!(a.start.to_bits(), b.start.to_bits());
            assert_eq!(a.end.to_bits(), b.end.to_bits());
            assert_eq!(a.duration.to_bits(), b.duration.to_bits());
        }
        assert_eq!(result.duration.to_bits(), restored.duration.to_bits());
        assert_eq!(restored, result);
    }

    #[test]
    fn test_decompress_invalid_data() {
        assert!(decompress_analysis(b"not gzip data").is_none());
    }

    #[test]
    fn test_decompress_outdated_version() {
        let mut result = sample_result();
        result.version = 0;
        let compressed = compress_analysis(&result).unwrap();
        assert!(decompress_analysis(&compressed).is_none());
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnalysisCache::new(dir.path());
        let key = key();

        assert!(cache.load(&key).await.is_none());
        assert!(!cache.exists(&key).await);

        let stored = cache.store(&key, &sample_result()).await.unwrap();
        assert!(stored.compressed_size > 0);
        assert!(stored.path.starts_with(dir.path().join("talk")));
        assert!(cache.exists(&key).await);

        assert_eq!(cache.load(&key).await, Some(sample_result()));
    }

    #[tokio::test]
    async fn test_corrupt_entry_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnalysisCache::new(dir.path());
        let key = key();

        let path = cache.entry_path(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        assert!(cache.load(&key).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnalysisCache::new(dir.path());
        let sig = signature();
        let a = analysis_cache_key("talk", &sig, 0.2, DetectionMode::Smart, -23.0);
        let b = analysis_cache_key("talk", &sig, 0.5, DetectionMode::Smart, -23.0);

        cache.store(&a, &sample_result()).await.unwrap();
        cache.store(&b, &sample_result()).await.unwrap();

        cache.remove(&a).await.unwrap();
        assert!(matches!(cache.remove(&a).await, Err(StorageError::NotFound(_))));

        assert_eq!(cache.clear_video("talk").await.unwrap(), 1);
        assert_eq!(cache.clear_video("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_signature_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"12345").unwrap();

        let sig = ContentSignature::from_path(&path).await.unwrap();
        assert_eq!(sig.file_name, "clip.mp4");
        assert_eq!(sig.size, 5);
    }
}
