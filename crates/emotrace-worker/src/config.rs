//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
///
/// Read once at startup and handed to the engine and pipeline
/// constructors explicitly; nothing below reads the environment again.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path to the serialized ONNX emotion model
    pub model_path: PathBuf,
    /// Path to the Haar frontal-face cascade
    pub cascade_path: PathBuf,
    /// Seconds between sampled frames
    pub sample_interval: f64,
    /// Directory uploaded videos are staged in
    pub upload_dir: PathBuf,
    /// Per-video analysis timeout
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/emotion_model.onnx"),
            cascade_path: PathBuf::from("models/haarcascade_frontalface_default.xml"),
            sample_interval: 1.0,
            upload_dir: PathBuf::from("uploads"),
            job_timeout: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables, with `.env` support.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            model_path: std::env::var("EMOTRACE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            cascade_path: std::env::var("EMOTRACE_CASCADE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cascade_path),
            sample_interval: std::env::var("EMOTRACE_SAMPLE_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_interval),
            upload_dir: std::env::var("EMOTRACE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            job_timeout: Duration::from_secs(
                std::env::var("EMOTRACE_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}
