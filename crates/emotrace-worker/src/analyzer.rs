//! Background video analysis jobs.
//!
//! The pipeline is blocking (video decode and inference); jobs run on
//! the tokio blocking pool so the upload-accepting boundary never waits
//! for a whole video. One engine is shared across jobs; a localizer is
//! built per job since the cascade detector is stateful.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use emotrace_media::pipeline::{CancelFlag, EmotionPipeline, VideoAnalysis};
use emotrace_media::{
    EmotionClassifier, EmotionEngine, EngineConfig, FaceLocalizer, StagingAllocator,
};
use emotrace_models::{EmotionEvent, VideoAnalysisSummary, VideoId, VideoMetadata};

use crate::aggregate::summarize_events;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;

/// Everything a completed analysis hands to the persistence layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub metadata: VideoMetadata,
    pub events: Vec<EmotionEvent>,
    pub summary: VideoAnalysisSummary,
}

/// Runs video analysis jobs against a shared engine.
pub struct Analyzer {
    engine: Arc<EmotionEngine>,
    config: WorkerConfig,
}

impl Analyzer {
    /// Validate the config and load the model once. Model and config
    /// problems are fatal at startup, not per job.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        if config.sample_interval <= 0.0 || !config.sample_interval.is_finite() {
            return Err(WorkerError::config(format!(
                "sample interval must be positive, got {}",
                config.sample_interval
            )));
        }
        let allocator = Arc::new(StagingAllocator::new());
        let engine = EmotionEngine::load(&EngineConfig::new(&config.model_path), allocator)?;
        Ok(Self {
            engine: Arc::new(engine),
            config,
        })
    }

    /// Build an analyzer around an existing engine (test seam).
    pub fn with_engine(engine: Arc<EmotionEngine>, config: WorkerConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Analyze one uploaded video end to end.
    ///
    /// Fail-fast: any stage error aborts the job and nothing is
    /// returned; rolling back already-durable state is the caller's
    /// responsibility. On timeout the in-flight run is cancelled via
    /// `cancel` so the blocking task unwinds between frames.
    pub async fn analyze_video(
        &self,
        video_id: VideoId,
        user_id: &str,
        video_path: &Path,
        cancel: CancelFlag,
    ) -> WorkerResult<AnalysisOutcome> {
        let logger = VideoLogger::new(&video_id, "video_analysis");
        logger.log_start(&format!("analyzing {}", video_path.display()));

        let engine = self.engine.clone();
        let cascade_path = self.config.cascade_path.clone();
        let interval = self.config.sample_interval;
        let path = video_path.to_path_buf();
        let job_cancel = cancel.clone();

        let analysis: WorkerResult<VideoAnalysis> = async {
            let handle = tokio::task::spawn_blocking(move || {
                let localizer = FaceLocalizer::new(&cascade_path)?;
                let classifier = EmotionClassifier::new(engine)?;
                let mut pipeline = EmotionPipeline::new(localizer, classifier);
                pipeline.process(&path, interval, &job_cancel)
            });

            match tokio::time::timeout(self.config.job_timeout, handle).await {
                Ok(joined) => {
                    let run = joined.map_err(|e| WorkerError::Join(e.to_string()))?;
                    run.map_err(|e| {
                        logger.log_error(&e.to_string());
                        WorkerError::from(e)
                    })
                }
                Err(_) => {
                    cancel.cancel();
                    let secs = self.config.job_timeout.as_secs();
                    logger.log_error(&format!("timed out after {secs} seconds"));
                    Err(WorkerError::Timeout(secs))
                }
            }
        }
        .instrument(logger.create_span())
        .await;
        let analysis = analysis?;

        logger.log_progress(&format!(
            "{} events over {:.1}s, aggregating",
            analysis.events.len(),
            analysis.duration
        ));
        if analysis.events.is_empty() {
            logger.log_warning("no faces detected in any sampled frame");
        }

        let summary = summarize_events(video_id.clone(), &analysis.events)?;
        let filename = video_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = VideoMetadata::new(video_id, user_id, filename, analysis.duration);

        logger.log_completion(&format!(
            "{} events over {:.1}s, dominant {}",
            summary.total_events, analysis.duration, summary.dominant_emotion
        ));

        Ok(AnalysisOutcome {
            metadata,
            events: analysis.events,
            summary,
        })
    }
}
