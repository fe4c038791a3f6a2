#![deny(unreachable_patterns)]
//! Video emotion-inference pipeline.
//!
//! This crate provides:
//! - Fixed-interval frame sampling over OpenCV video capture
//! - Haar-cascade face localization and crop preprocessing
//! - An ONNX Runtime inference wrapper with call-scoped device buffers
//! - Argmax emotion classification into labeled events
//! - The orchestrator driving a whole video through those stages
//!
//! OpenCV-backed pieces sit behind the `opencv` feature (on by default);
//! the schedule math, device-memory layer, engine and classifier build
//! without it.

pub mod classifier;
pub mod device;
pub mod engine;
pub mod error;
pub mod localizer;
pub mod pipeline;
pub mod sampler;

pub use classifier::EmotionClassifier;
pub use device::{BufferId, DeviceAllocator, DeviceBuffer, StagingAllocator};
pub use engine::{Bindings, EmotionEngine, EngineConfig, ExecutionContext, InputShape};
pub use error::{MediaError, MediaResult};
pub use localizer::FaceCrop;
#[cfg(feature = "opencv")]
pub use localizer::FaceLocalizer;
pub use pipeline::{classify_crops, CancelFlag, CropSource, FrameCrops, VideoAnalysis};
#[cfg(feature = "opencv")]
pub use pipeline::EmotionPipeline;
pub use sampler::SamplePlan;
#[cfg(feature = "opencv")]
pub use sampler::{FrameSample, FrameSource, SampleIter};
