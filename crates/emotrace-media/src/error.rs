//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during video emotion analysis.
///
/// A face detector finding zero faces is not an error; it yields an empty
/// result. Everything here aborts the current video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Model load failed: {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Model declares no input tensor binding: {0}")]
    NoInputBinding(PathBuf),

    #[error("Inference execution failed: {0}")]
    InferenceExecution(String),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MediaError {
    /// Create a source unavailable error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create a model load error.
    pub fn model_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an inference execution error.
    pub fn inference_execution(message: impl Into<String>) -> Self {
        Self::InferenceExecution(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
