//! Application state.

use cutline_worker::{AnalysisService, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub analysis: AnalysisService,
}

impl AppState {
    /// Create state with the FFmpeg-backed analysis service.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> Self {
        Self::with_service(config, AnalysisService::new(worker_config))
    }

    pub fn with_service(config: ApiConfig, analysis: AnalysisService) -> Self {
        Self { config, analysis }
    }
}
