//! Video-level analysis summary.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::label::EmotionLabel;
use crate::video::VideoId;

/// Distributional statistics over a video's emotion events.
///
/// Derived wholesale from the stored event collection and never mutated
/// in place; regenerating from the same events yields the same summary.
/// Labels that never occurred are omitted from `emotion_counts` and
/// `emotion_percentages` — consumers must treat missing labels as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAnalysisSummary {
    /// Video this summary was computed from
    pub video_id: VideoId,

    /// Total number of emotion events observed
    pub total_events: u64,

    /// Events per label, observed labels only
    pub emotion_counts: BTreeMap<EmotionLabel, u64>,

    /// Share of events per label in percent; values sum to 100
    pub emotion_percentages: BTreeMap<EmotionLabel, f64>,

    /// Most frequent label, ties broken by canonical label order
    pub dominant_emotion: EmotionLabel,

    /// Share of attentive-affect events on a 0-10 scale
    pub focus_score: f64,

    /// Inverse share of neutral events on a 0-10 scale
    pub engagement_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_labels_as_keys() {
        let mut counts = BTreeMap::new();
        counts.insert(EmotionLabel::Happy, 3u64);
        let mut percentages = BTreeMap::new();
        percentages.insert(EmotionLabel::Happy, 100.0);

        let summary = VideoAnalysisSummary {
            video_id: VideoId::from("vid-1"),
            total_events: 3,
            emotion_counts: counts,
            emotion_percentages: percentages,
            dominant_emotion: EmotionLabel::Happy,
            focus_score: 10.0,
            engagement_score: 10.0,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["emotion_counts"]["happy"], 3);
        assert_eq!(json["dominant_emotion"], "happy");
    }
}
