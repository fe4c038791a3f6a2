//! Video processing orchestrator.
//!
//! Drives sampler -> localizer -> classifier across a whole video and
//! collects the flat ordered event sequence. Fail-fast: the first
//! unrecoverable stage error aborts the video and partial results are
//! discarded; the capture handle is released on every exit path.
//!
//! The decode-and-detect stages sit behind the `CropSource` seam so the
//! classify loop itself runs against scripted crops in tests, without a
//! decoder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use emotrace_models::EmotionEvent;

use crate::classifier::EmotionClassifier;
use crate::error::{MediaError, MediaResult};
use crate::localizer::FaceCrop;

/// Progress log cadence, in sampled frames.
const LOG_EVERY_FRAMES: u64 = 40;

/// Cooperative cancellation handle, checked between frames.
///
/// Cancelling mid-video aborts the run with `MediaError::Cancelled`;
/// the capture handle and any staged device buffers are released as
/// usual.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Face crops of one sampled frame.
pub struct FrameCrops {
    /// Timestamp of the frame the crops came from, in seconds
    pub timestamp: f64,
    /// One crop per detected face; empty when the frame shows no face
    pub crops: Vec<FaceCrop>,
}

/// Per-frame crop supply for the classify loop.
///
/// The production implementation decodes frames and runs face
/// detection; tests substitute scripted crops.
pub trait CropSource {
    /// Crops of the next sampled frame, or `None` at end of video.
    fn next_frame(&mut self) -> Option<MediaResult<FrameCrops>>;
}

/// Result of a full pipeline run over one video.
#[derive(Debug, Clone)]
pub struct VideoAnalysis {
    /// Ordered emotion events, one per face per sampled frame
    pub events: Vec<EmotionEvent>,
    /// Total video duration in seconds
    pub duration: f64,
}

/// Classify every crop the source yields, in frame order.
///
/// Cancellation is checked once per frame. The first stage error aborts
/// the run; partial events are discarded by the caller along with the
/// error.
pub fn classify_crops(
    classifier: &EmotionClassifier,
    source: &mut dyn CropSource,
    cancel: &CancelFlag,
) -> MediaResult<Vec<EmotionEvent>> {
    let mut events: Vec<EmotionEvent> = Vec::new();
    let mut frames_sampled = 0u64;

    while let Some(frame) = source.next_frame() {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        let frame = frame?;

        for crop in &frame.crops {
            events.push(classifier.classify_crop(crop, frame.timestamp)?);
        }

        frames_sampled += 1;
        if frames_sampled % LOG_EVERY_FRAMES == 0 {
            debug!(
                frames_sampled,
                events = events.len(),
                timestamp = frame.timestamp,
                "Analysis progress"
            );
        }
    }

    Ok(events)
}

#[cfg(feature = "opencv")]
pub use imp::EmotionPipeline;

#[cfg(feature = "opencv")]
mod imp {
    use std::path::Path;

    use tracing::info;

    use super::{classify_crops, CancelFlag, CropSource, FrameCrops, VideoAnalysis};
    use crate::classifier::EmotionClassifier;
    use crate::engine::InputShape;
    use crate::error::MediaResult;
    use crate::localizer::FaceLocalizer;
    use crate::sampler::{FrameSource, SampleIter};

    /// End-to-end emotion pipeline for one worker.
    ///
    /// Single-threaded and synchronous per video; run it from a blocking
    /// task rather than a latency-sensitive request thread.
    pub struct EmotionPipeline {
        localizer: FaceLocalizer,
        classifier: EmotionClassifier,
    }

    impl EmotionPipeline {
        pub fn new(localizer: FaceLocalizer, classifier: EmotionClassifier) -> Self {
            Self {
                localizer,
                classifier,
            }
        }

        /// Process one video end to end.
        ///
        /// For each sampled frame: detect faces, then per face normalize,
        /// infer and classify into one event stamped with the frame's
        /// timestamp. A frame with zero faces contributes no events and
        /// no error.
        pub fn process(
            &mut self,
            path: &Path,
            interval_seconds: f64,
            cancel: &CancelFlag,
        ) -> MediaResult<VideoAnalysis> {
            let source = FrameSource::open(path)?;
            let duration = source.duration();
            let samples = source.samples(interval_seconds)?;
            let plan = samples.plan();

            info!(
                path = %path.display(),
                fps = plan.fps(),
                frames = plan.frame_count(),
                step = plan.step(),
                expected_samples = plan.sample_count(),
                "Starting video emotion analysis"
            );

            let shape = self.classifier.input_shape();
            let mut crops = VideoCropSource {
                samples,
                localizer: &mut self.localizer,
                shape,
            };
            let events = classify_crops(&self.classifier, &mut crops, cancel)?;

            info!(
                path = %path.display(),
                events = events.len(),
                duration,
                "Video emotion analysis complete"
            );

            Ok(VideoAnalysis { events, duration })
        }
    }

    /// Decode-and-detect crop source over an opened video.
    struct VideoCropSource<'a> {
        samples: SampleIter,
        localizer: &'a mut FaceLocalizer,
        shape: InputShape,
    }

    impl CropSource for VideoCropSource<'_> {
        fn next_frame(&mut self) -> Option<MediaResult<FrameCrops>> {
            let sample = match self.samples.next()? {
                Ok(sample) => sample,
                Err(e) => return Some(Err(e)),
            };
            let faces = match self.localizer.detect(&sample.frame) {
                Ok(faces) => faces,
                Err(e) => return Some(Err(e)),
            };
            let mut crops = Vec::with_capacity(faces.len());
            for face in faces {
                match self
                    .localizer
                    .crop_and_normalize(&sample.frame, face, self.shape)
                {
                    Ok(crop) => crops.push(crop),
                    Err(e) => return Some(Err(e)),
                }
            }
            Some(Ok(FrameCrops {
                timestamp: sample.timestamp,
                crops,
            }))
        }
    }

}
