//! Per-face emotion classification events.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::label::EmotionLabel;
use crate::rect::FaceBox;

/// One timestamped, per-face emotion classification result.
///
/// Produced by the classifier for every detected face in a sampled frame
/// and immutable once created. The ordered event sequence for a video is
/// handed to the persistence collaborator as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionEvent {
    /// Position of the sampled frame in the video, in seconds
    pub timestamp: f64,

    /// Classified emotion
    pub label: EmotionLabel,

    /// Raw model confidence at the selected output channel, in [0, 1]
    pub confidence: f32,

    /// Bounding box of the face in source-frame pixel coordinates
    pub face_box: FaceBox,
}

impl EmotionEvent {
    /// Create a new emotion event.
    pub fn new(timestamp: f64, label: EmotionLabel, confidence: f32, face_box: FaceBox) -> Self {
        Self {
            timestamp,
            label,
            confidence,
            face_box,
        }
    }
}
