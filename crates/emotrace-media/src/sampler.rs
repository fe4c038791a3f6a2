//! Fixed-interval frame sampling.
//!
//! `SamplePlan` holds the pure schedule math so the sampling policy is
//! testable without a decoder; `FrameSource` binds it to an OpenCV
//! `VideoCapture`.

use crate::error::{MediaError, MediaResult};

/// Sampling schedule for one video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePlan {
    fps: f64,
    frame_count: u64,
    step: u64,
}

impl SamplePlan {
    /// Compute the schedule: `step = max(1, round(fps * interval))`.
    pub fn new(fps: f64, frame_count: u64, interval_seconds: f64) -> MediaResult<Self> {
        if fps <= 0.0 || !fps.is_finite() {
            return Err(MediaError::source_unavailable(format!(
                "source reports invalid frame rate {fps}"
            )));
        }
        if interval_seconds <= 0.0 || !interval_seconds.is_finite() {
            return Err(MediaError::invalid_input(format!(
                "sample interval must be positive, got {interval_seconds}"
            )));
        }
        let step = ((fps * interval_seconds).round() as u64).max(1);
        Ok(Self {
            fps,
            frame_count,
            step,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames skipped between samples.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Total video duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    /// Whether the frame at `index` is on the schedule.
    pub fn is_sampled(&self, index: u64) -> bool {
        index % self.step == 0
    }

    /// Timestamp of the frame at `index`, in seconds.
    pub fn timestamp(&self, index: u64) -> f64 {
        index as f64 / self.fps
    }

    /// Number of frames the schedule will yield.
    pub fn sample_count(&self) -> u64 {
        self.frame_count.div_ceil(self.step)
    }

    /// Timestamps of all scheduled frames, in order.
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.frame_count)
            .step_by(self.step as usize)
            .map(|index| self.timestamp(index))
    }
}

#[cfg(feature = "opencv")]
pub use imp::{FrameSample, FrameSource, SampleIter};

#[cfg(feature = "opencv")]
mod imp {
    use std::path::Path;

    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT};
    use tracing::debug;

    use super::SamplePlan;
    use crate::error::{MediaError, MediaResult};

    /// One sampled frame with its position in the video.
    pub struct FrameSample {
        /// Zero-based index in the source
        pub index: u64,
        /// `index / fps`, in seconds
        pub timestamp: f64,
        /// Decoded BGR frame
        pub frame: Mat,
    }

    /// An opened video source.
    ///
    /// The underlying capture handle is released when the source (or the
    /// iterator it turns into) is dropped, on every exit path.
    #[derive(Debug)]
    pub struct FrameSource {
        capture: VideoCapture,
        fps: f64,
        frame_count: u64,
    }

    impl FrameSource {
        /// Open a video file.
        ///
        /// Fails with `SourceUnavailable` when the file cannot be opened
        /// or the container reports a non-positive frame rate.
        pub fn open(path: &Path) -> MediaResult<Self> {
            let path_str = path.to_str().ok_or_else(|| {
                MediaError::source_unavailable("video path is not valid UTF-8")
            })?;

            let capture = VideoCapture::from_file(path_str, CAP_ANY).map_err(|e| {
                MediaError::source_unavailable(format!("open {path_str}: {e}"))
            })?;
            if !capture.is_opened().unwrap_or(false) {
                return Err(MediaError::source_unavailable(format!(
                    "cannot open video file {path_str}"
                )));
            }

            let fps = capture.get(CAP_PROP_FPS).unwrap_or(0.0);
            if fps <= 0.0 {
                return Err(MediaError::source_unavailable(format!(
                    "{path_str} reports frame rate {fps}"
                )));
            }
            let frame_count = capture.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0).max(0.0) as u64;

            debug!(path = %path.display(), fps, frame_count, "Video source opened");
            Ok(Self {
                capture,
                fps,
                frame_count,
            })
        }

        pub fn fps(&self) -> f64 {
            self.fps
        }

        pub fn frame_count(&self) -> u64 {
            self.frame_count
        }

        /// Total duration in seconds.
        pub fn duration(&self) -> f64 {
            self.frame_count as f64 / self.fps
        }

        /// Turn the source into a lazy one-pass sample iterator.
        ///
        /// The sequence is finite and not restartable; reopening the
        /// source is the only way to sample again.
        pub fn samples(self, interval_seconds: f64) -> MediaResult<SampleIter> {
            let plan = SamplePlan::new(self.fps, self.frame_count, interval_seconds)?;
            Ok(SampleIter {
                capture: self.capture,
                plan,
                index: 0,
                done: false,
            })
        }
    }

    /// Lazy iterator over scheduled frames.
    pub struct SampleIter {
        capture: VideoCapture,
        plan: SamplePlan,
        index: u64,
        done: bool,
    }

    impl SampleIter {
        pub fn plan(&self) -> SamplePlan {
            self.plan
        }
    }

    impl Iterator for SampleIter {
        type Item = MediaResult<FrameSample>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.done {
                return None;
            }
            loop {
                let mut frame = Mat::default();
                let read = match self.capture.read(&mut frame) {
                    Ok(read) => read,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(MediaError::source_unavailable(format!(
                            "read frame {}: {e}",
                            self.index
                        ))));
                    }
                };
                if !read || frame.empty() {
                    self.done = true;
                    return None;
                }

                let index = self.index;
                self.index += 1;
                if self.plan.is_sampled(index) {
                    return Some(Ok(FrameSample {
                        index,
                        timestamp: self.plan.timestamp(index),
                        frame,
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_30fps_1s_interval() {
        let plan = SamplePlan::new(30.0, 300, 1.0).unwrap();
        assert_eq!(plan.step(), 30);
        assert_eq!(plan.sample_count(), 10);
        assert!((plan.duration() - 10.0).abs() < 1e-9);

        let timestamps: Vec<f64> = plan.timestamps().collect();
        assert_eq!(timestamps.len(), 10);
        for (i, ts) in timestamps.iter().enumerate() {
            assert!((ts - i as f64).abs() < 1.0 / 30.0);
        }
    }

    #[test]
    fn test_schedule_10fps_synthetic_video() {
        // 10 s at 10 fps sampled every second: frames 0, 10, ..., 90.
        let plan = SamplePlan::new(10.0, 100, 1.0).unwrap();
        assert_eq!(plan.step(), 10);
        assert_eq!(plan.sample_count(), 10);
        assert!(plan.is_sampled(0));
        assert!(plan.is_sampled(90));
        assert!(!plan.is_sampled(95));
    }

    #[test]
    fn test_step_never_below_one() {
        let plan = SamplePlan::new(10.0, 100, 0.01).unwrap();
        assert_eq!(plan.step(), 1);
        assert_eq!(plan.sample_count(), 100);
    }

    #[test]
    fn test_zero_fps_is_source_unavailable() {
        let err = SamplePlan::new(0.0, 100, 1.0).unwrap_err();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }

    #[test]
    fn test_non_positive_interval_is_invalid() {
        assert!(SamplePlan::new(30.0, 100, 0.0).is_err());
        assert!(SamplePlan::new(30.0, 100, -1.0).is_err());
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_open_missing_file_is_source_unavailable() {
        let err = FrameSource::open(std::path::Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }
}
