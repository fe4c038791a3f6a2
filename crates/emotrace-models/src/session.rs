//! Session records and daily report rollups.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::label::EmotionLabel;

/// One ended analysis session, as handed to the daily rollup.
///
/// The session lifecycle itself (start/stop, ownership checks) belongs to
/// the service layer; aggregation only consumes ended sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionRecord {
    /// Unique identifier for the session
    pub id: String,

    /// User who owns the session
    pub user_id: String,

    /// Dominant emotion over the session
    pub dominant_emotion: EmotionLabel,

    /// Session focus score, 0-10
    pub focus_score: f64,

    /// Session engagement score, 0-10
    pub engagement_score: f64,

    /// Session duration in seconds
    pub duration_seconds: f64,

    /// When the session ended
    pub ended_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Calendar day this session counts toward.
    pub fn report_date(&self) -> NaiveDate {
        self.ended_at.date_naive()
    }
}

/// Daily rollup over a user's ended sessions.
///
/// Recomputable at any time from the unchanged session set; percentage
/// and score fields are bit-identical across recomputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyReport {
    /// User the report belongs to
    pub user_id: String,

    /// Calendar day covered by the report
    pub date: NaiveDate,

    /// Number of ended sessions on this day
    pub total_sessions: u64,

    /// Summed session duration in seconds
    pub total_duration_seconds: f64,

    /// Sessions per dominant emotion, observed labels only
    pub emotion_counts: BTreeMap<EmotionLabel, u64>,

    /// Share of sessions per dominant emotion in percent
    pub emotion_percentages: BTreeMap<EmotionLabel, f64>,

    /// Most frequent dominant emotion, ties broken by canonical order
    pub dominant_emotion: EmotionLabel,

    /// Mean session focus score, 0-10
    pub focus_score: f64,

    /// Mean session engagement score, 0-10
    pub engagement_score: f64,

    /// When this rollup was generated
    pub generated_at: DateTime<Utc>,
}

impl DailyReport {
    /// Natural key deciding update-vs-insert at the persistence layer.
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.user_id.as_str(), self.date)
    }
}
