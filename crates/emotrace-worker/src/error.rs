//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Aggregation over zero events or sessions. Surfaced to the caller
    /// rather than silently returning a zero-filled summary.
    #[error("Nothing to aggregate: {0}")]
    EmptyInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),

    #[error("Background task failed: {0}")]
    Join(String),

    #[error("Media error: {0}")]
    Media(#[from] emotrace_media::MediaError),
}

impl WorkerError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the underlying run was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Media(emotrace_media::MediaError::Cancelled))
    }
}
