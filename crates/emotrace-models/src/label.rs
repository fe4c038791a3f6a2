//! The closed emotion label set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One of the seven emotion classes the deployed model can emit.
///
/// Variant order is a deployment contract: it must match the model's
/// output channel order exactly. `EmotionLabel::ALL` is the canonical
/// order used both for output-index mapping and deterministic
/// tie-breaking in aggregation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// Canonical label order, matching the model's output channels.
    pub const ALL: [EmotionLabel; 7] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Sad,
        Self::Surprise,
        Self::Neutral,
    ];

    /// Number of emotion classes.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the label as a lowercase string for display and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    /// Map a model output channel index to a label.
    ///
    /// Returns `None` for indices outside the output binding.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The model output channel index of this label.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Labels counted toward the focus score.
    pub fn is_focus(&self) -> bool {
        matches!(self, Self::Happy | Self::Neutral | Self::Surprise)
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_matches_indices() {
        for (i, label) in EmotionLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(EmotionLabel::from_index(i), Some(*label));
        }
        assert_eq!(EmotionLabel::from_index(EmotionLabel::COUNT), None);
    }

    #[test]
    fn test_serde_uses_snake_case_strings() {
        let json = serde_json::to_string(&EmotionLabel::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
        let back: EmotionLabel = serde_json::from_str("\"angry\"").unwrap();
        assert_eq!(back, EmotionLabel::Angry);
    }

    #[test]
    fn test_focus_set() {
        let focus: Vec<_> = EmotionLabel::ALL.iter().filter(|l| l.is_focus()).collect();
        assert_eq!(
            focus,
            vec![
                &EmotionLabel::Happy,
                &EmotionLabel::Surprise,
                &EmotionLabel::Neutral
            ]
        );
    }
}
