//! Emotion classification over raw model scores.

use std::sync::Arc;

use emotrace_models::{EmotionEvent, EmotionLabel};
use tracing::trace;

use crate::engine::{EmotionEngine, InputShape};
use crate::error::{MediaError, MediaResult};
use crate::localizer::FaceCrop;

/// Turns per-class confidence scores into labeled emotion events.
///
/// The label-set order is a deployment contract: `EmotionLabel::ALL`
/// must match the model's output channel order exactly, which is why
/// construction rejects engines whose output width differs from the
/// label count. The deployed model ends in a softmax, so the raw score
/// at the selected index is reported as confidence with no
/// renormalization.
pub struct EmotionClassifier {
    engine: Arc<EmotionEngine>,
}

impl EmotionClassifier {
    /// Wrap an engine, checking the output binding against the label set.
    pub fn new(engine: Arc<EmotionEngine>) -> MediaResult<Self> {
        if engine.output_len() != EmotionLabel::COUNT {
            return Err(MediaError::invalid_input(format!(
                "model emits {} classes, label set has {}",
                engine.output_len(),
                EmotionLabel::COUNT
            )));
        }
        Ok(Self { engine })
    }

    /// Input shape the wrapped engine expects, for crop preprocessing.
    pub fn input_shape(&self) -> InputShape {
        self.engine.input_shape()
    }

    /// Select the argmax label from a score vector.
    ///
    /// Ties break toward the lowest output index.
    pub fn classify(scores: &[f32]) -> MediaResult<(EmotionLabel, f32)> {
        if scores.len() != EmotionLabel::COUNT {
            return Err(MediaError::invalid_input(format!(
                "expected {} scores, got {}",
                EmotionLabel::COUNT,
                scores.len()
            )));
        }
        let mut best_index = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best_index] {
                best_index = i;
            }
        }
        let label = EmotionLabel::from_index(best_index).ok_or_else(|| {
            MediaError::invalid_input(format!("no label at output index {best_index}"))
        })?;
        Ok((label, scores[best_index]))
    }

    /// Run one crop through the engine and emit its emotion event.
    pub fn classify_crop(&self, crop: &FaceCrop, timestamp: f64) -> MediaResult<EmotionEvent> {
        let scores = self.engine.infer(&crop.tensor)?;
        let (label, confidence) = Self::classify(&scores)?;
        trace!(%label, confidence, timestamp, "Face classified");
        Ok(EmotionEvent::new(
            timestamp,
            label,
            confidence,
            crop.bounding_box,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::fixed_engine;
    use crate::localizer::tensor_from_gray_pixels;
    use emotrace_models::FaceBox;

    #[test]
    fn test_classify_picks_argmax() {
        let scores = [0.01, 0.02, 0.03, 0.85, 0.04, 0.02, 0.03];
        let (label, confidence) = EmotionClassifier::classify(&scores).unwrap();
        assert_eq!(label, EmotionLabel::Happy);
        assert!((confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_classify_ties_break_to_lowest_index() {
        let scores = [0.5, 0.1, 0.5, 0.1, 0.1, 0.1, 0.1];
        let (label, _) = EmotionClassifier::classify(&scores).unwrap();
        assert_eq!(label, EmotionLabel::Angry);
    }

    #[test]
    fn test_classify_rejects_wrong_width() {
        assert!(EmotionClassifier::classify(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_new_rejects_mismatched_engine() {
        let (engine, _) = fixed_engine(vec![0.5; 3]);
        assert!(EmotionClassifier::new(Arc::new(engine)).is_err());
    }

    #[test]
    fn test_classify_crop_emits_event() {
        let mut scores = vec![0.0; EmotionLabel::COUNT];
        scores[EmotionLabel::Happy.index()] = 0.9;
        let (engine, allocator) = fixed_engine(scores);
        let classifier = EmotionClassifier::new(Arc::new(engine)).unwrap();

        let shape = classifier.input_shape();
        let pixels = vec![128u8; shape.height * shape.width];
        let crop =
            tensor_from_gray_pixels(&pixels, shape, FaceBox::new(10, 20, 64, 64)).unwrap();

        let event = classifier.classify_crop(&crop, 3.0).unwrap();
        assert_eq!(event.label, EmotionLabel::Happy);
        assert!((event.confidence - 0.9).abs() < 1e-6);
        assert_eq!(event.timestamp, 3.0);
        assert_eq!(event.face_box, FaceBox::new(10, 20, 64, 64));
        assert_eq!(allocator.outstanding(), 0);
    }
}
