//! Structured logging setup and per-video job logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use emotrace_models::VideoId;

/// Initialize tracing for the worker process.
///
/// Colored output for dev, JSON when `LOG_FORMAT=json`. The ONNX
/// runtime's own logging is quieted to warnings. Call once from the
/// hosting service's startup path.
pub fn init_logging() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("emotrace=info".parse().unwrap())
        .add_directive("ort=warn".parse().unwrap())
        .add_directive("onnxruntime=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Per-video logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video_id: String,
    operation: String,
}

impl VideoLogger {
    /// Create a logger for one video and operation (e.g. "video_analysis").
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Analysis started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Analysis progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Analysis warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Analysis error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Analysis completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span carrying the video context.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video_job",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
