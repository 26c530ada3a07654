//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Analysis service configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory of the analysis cache
    pub cache_dir: PathBuf,
    /// Work directory for decoded audio
    pub work_dir: PathBuf,
    /// Upper bound on a single analysis, decode included
    pub analysis_timeout: Duration,
    /// Length of the display waveform
    pub waveform_points: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/tmp/cutline/cache"),
            work_dir: PathBuf::from("/tmp/cutline/work"),
            analysis_timeout: Duration::from_secs(600), // 10 minutes
            waveform_points: 1000,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: std::env::var("CUTLINE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            work_dir: std::env::var("CUTLINE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            analysis_timeout: std::env::var("ANALYSIS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            waveform_points: std::env::var("WAVEFORM_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.waveform_points),
        }
    }

    /// Builder-style setter for the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Builder-style setter for the analysis timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }
}
