//! Worker error types.

use std::time::Duration;

use cutline_models::RequestError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Media(#[from] cutline_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] cutline_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Check if the analysis was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(e) if e.is_cancelled())
    }

    /// Check if the caller sent a bad request (as opposed to a failed analysis).
    pub fn is_client_error(&self) -> bool {
        matches!(self, WorkerError::InvalidRequest(_))
    }
}

impl From<RequestError> for WorkerError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Invalid(msg) => Self::InvalidRequest(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_media::MediaError;

    #[test]
    fn test_media_error_message_passthrough() {
        let err = WorkerError::from(MediaError::no_audio_track("/v/a.mp4"));
        assert_eq!(err.to_string(), "No audio track found in /v/a.mp4");
    }

    #[test]
    fn test_classification() {
        assert!(WorkerError::from(MediaError::Cancelled).is_cancelled());
        assert!(!WorkerError::Timeout(Duration::from_secs(3)).is_cancelled());
        assert!(WorkerError::from(RequestError::Invalid("bad".into())).is_client_error());
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let err = WorkerError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Analysis timed out after 50ms");
        let err = WorkerError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Analysis timed out after 300s");
    }
}
