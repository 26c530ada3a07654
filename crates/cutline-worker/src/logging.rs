//! Structured analysis logging utilities.
//!
//! Provides consistent, structured logging for analysis requests with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Analysis logger for structured logging with consistent formatting.
///
/// Every event carries the analysis id, the video and the operation so a
/// single request can be followed through the logs.
#[derive(Debug, Clone)]
pub struct AnalysisLogger {
    analysis_id: String,
    video: String,
    operation: String,
}

impl AnalysisLogger {
    /// Create a logger with a fresh analysis id.
    pub fn new(video: &str, operation: &str) -> Self {
        Self::with_id(&Uuid::new_v4().to_string(), video, operation)
    }

    /// Create a logger with a caller-supplied id (e.g. an HTTP request id).
    pub fn with_id(analysis_id: &str, video: &str, operation: &str) -> Self {
        Self {
            analysis_id: analysis_id.to_string(),
            video: video.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation,
            "Analysis started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation,
            "Analysis progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation,
            "Analysis warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation,
            "Analysis error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation,
            "Analysis completed: {}", message
        );
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this analysis.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis",
            analysis_id = %self.analysis_id,
            video = %self.video,
            operation = %self.operation
        )
    }
}
