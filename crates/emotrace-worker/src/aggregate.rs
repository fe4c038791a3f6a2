//! Emotion aggregation: video summaries and daily rollups.
//!
//! Pure reductions over event and session collections. Labels that
//! never occurred are omitted from count and percentage maps; dominant
//! ties resolve by canonical `EmotionLabel::ALL` order so repeated
//! aggregation of the same input is deterministic.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};

use emotrace_models::{
    DailyReport, EmotionEvent, EmotionLabel, SessionRecord, VideoAnalysisSummary, VideoId,
};

use crate::error::{WorkerError, WorkerResult};

/// Summarize a video's emotion events.
///
/// Fails with `EmptyInput` for an empty collection; percentages always
/// sum to 100 across observed labels otherwise.
pub fn summarize_events(
    video_id: VideoId,
    events: &[EmotionEvent],
) -> WorkerResult<VideoAnalysisSummary> {
    if events.is_empty() {
        return Err(WorkerError::empty_input(format!(
            "no emotion events for video {video_id}"
        )));
    }

    let mut counts: BTreeMap<EmotionLabel, u64> = BTreeMap::new();
    let mut focus_count = 0u64;
    for event in events {
        *counts.entry(event.label).or_insert(0) += 1;
        if event.label.is_focus() {
            focus_count += 1;
        }
    }

    let total = events.len() as u64;
    let percentages = percentages_of(&counts, total);
    let dominant_emotion = dominant_of(&counts);
    let neutral = counts.get(&EmotionLabel::Neutral).copied().unwrap_or(0);

    Ok(VideoAnalysisSummary {
        video_id,
        total_events: total,
        emotion_counts: counts,
        emotion_percentages: percentages,
        dominant_emotion,
        focus_score: focus_count as f64 / total as f64 * 10.0,
        engagement_score: 10.0 - neutral as f64 / total as f64 * 10.0,
    })
}

/// Roll up one calendar day of a user's ended sessions.
///
/// Only sessions that ended on `date` count. Idempotent over an
/// unchanged session set: percentage and score fields come out
/// bit-identical on recomputation.
pub fn build_daily_report(
    user_id: &str,
    date: NaiveDate,
    sessions: &[SessionRecord],
) -> WorkerResult<DailyReport> {
    let day_sessions: Vec<&SessionRecord> = sessions
        .iter()
        .filter(|s| s.user_id == user_id && s.report_date() == date)
        .collect();

    if day_sessions.is_empty() {
        return Err(WorkerError::empty_input(format!(
            "no ended sessions for {user_id} on {date}"
        )));
    }

    let total = day_sessions.len() as u64;
    let mut counts: BTreeMap<EmotionLabel, u64> = BTreeMap::new();
    let mut total_duration = 0.0;
    let mut focus_sum = 0.0;
    let mut engagement_sum = 0.0;
    for session in &day_sessions {
        *counts.entry(session.dominant_emotion).or_insert(0) += 1;
        total_duration += session.duration_seconds;
        focus_sum += session.focus_score;
        engagement_sum += session.engagement_score;
    }

    let percentages = percentages_of(&counts, total);
    let dominant_emotion = dominant_of(&counts);

    Ok(DailyReport {
        user_id: user_id.to_string(),
        date,
        total_sessions: total,
        total_duration_seconds: total_duration,
        emotion_counts: counts,
        emotion_percentages: percentages,
        dominant_emotion,
        focus_score: focus_sum / total as f64,
        engagement_score: engagement_sum / total as f64,
        generated_at: Utc::now(),
    })
}

/// Write decision for a freshly computed report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportWrite {
    /// No report exists for this (user, date) yet
    Insert(DailyReport),
    /// An existing report for the same (user, date) is replaced
    Update(DailyReport),
}

impl ReportWrite {
    pub fn report(&self) -> &DailyReport {
        match self {
            Self::Insert(report) | Self::Update(report) => report,
        }
    }
}

/// Decide insert vs update on the (user, date) natural key.
pub fn plan_report_write(existing: Option<&DailyReport>, fresh: DailyReport) -> ReportWrite {
    match existing {
        Some(report) if report.key() == fresh.key() => ReportWrite::Update(fresh),
        _ => ReportWrite::Insert(fresh),
    }
}

fn percentages_of(
    counts: &BTreeMap<EmotionLabel, u64>,
    total: u64,
) -> BTreeMap<EmotionLabel, f64> {
    counts
        .iter()
        .map(|(&label, &count)| (label, count as f64 / total as f64 * 100.0))
        .collect()
}

/// Most frequent label. Ties break by canonical label order, not by
/// insertion or map order.
fn dominant_of(counts: &BTreeMap<EmotionLabel, u64>) -> EmotionLabel {
    let mut best = EmotionLabel::ALL[0];
    let mut best_count = 0u64;
    for label in EmotionLabel::ALL {
        let count = counts.get(&label).copied().unwrap_or(0);
        if count > best_count {
            best = label;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use emotrace_models::FaceBox;

    fn event(timestamp: f64, label: EmotionLabel) -> EmotionEvent {
        EmotionEvent::new(timestamp, label, 0.9, FaceBox::new(0, 0, 48, 48))
    }

    fn ended_at(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(17, 30, 0).unwrap())
    }

    fn session(
        id: &str,
        user: &str,
        date: NaiveDate,
        dominant: EmotionLabel,
        focus: f64,
        engagement: f64,
    ) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            dominant_emotion: dominant,
            focus_score: focus,
            engagement_score: engagement,
            duration_seconds: 600.0,
            ended_at: ended_at(date),
        }
    }

    #[test]
    fn test_empty_events_fail_explicitly() {
        let err = summarize_events(VideoId::from("v1"), &[]).unwrap_err();
        assert!(matches!(err, WorkerError::EmptyInput(_)));
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let events = vec![
            event(0.0, EmotionLabel::Happy),
            event(1.0, EmotionLabel::Sad),
            event(2.0, EmotionLabel::Sad),
            event(3.0, EmotionLabel::Angry),
            event(4.0, EmotionLabel::Neutral),
            event(5.0, EmotionLabel::Fear),
            event(6.0, EmotionLabel::Happy),
        ];
        let summary = summarize_events(VideoId::from("v1"), &events).unwrap();
        let sum: f64 = summary.emotion_percentages.values().sum();
        assert!((sum - 100.0).abs() < 1e-9);
        // Absent labels are omitted, not zero-filled.
        assert!(!summary
            .emotion_counts
            .contains_key(&EmotionLabel::Disgust));
    }

    #[test]
    fn test_dominant_count_is_maximal() {
        let events = vec![
            event(0.0, EmotionLabel::Sad),
            event(1.0, EmotionLabel::Sad),
            event(2.0, EmotionLabel::Happy),
        ];
        let summary = summarize_events(VideoId::from("v1"), &events).unwrap();
        let dominant_count = summary.emotion_counts[&summary.dominant_emotion];
        for count in summary.emotion_counts.values() {
            assert!(dominant_count >= *count);
        }
        assert_eq!(summary.dominant_emotion, EmotionLabel::Sad);
    }

    #[test]
    fn test_dominant_ties_break_by_canonical_order() {
        // Neutral and Angry tie; Angry comes first in the label order.
        let events = vec![
            event(0.0, EmotionLabel::Neutral),
            event(1.0, EmotionLabel::Angry),
        ];
        let summary = summarize_events(VideoId::from("v1"), &events).unwrap();
        assert_eq!(summary.dominant_emotion, EmotionLabel::Angry);
    }

    #[test]
    fn test_all_happy_video_scores() {
        // The synthetic 10 s / 10 fps video: 10 sampled frames, one face
        // each, every crop classified happy.
        let events: Vec<EmotionEvent> = (0..10)
            .map(|i| event(i as f64, EmotionLabel::Happy))
            .collect();
        let summary = summarize_events(VideoId::from("v1"), &events).unwrap();

        assert_eq!(summary.total_events, 10);
        assert_eq!(summary.emotion_percentages.len(), 1);
        assert_eq!(summary.emotion_percentages[&EmotionLabel::Happy], 100.0);
        assert_eq!(summary.dominant_emotion, EmotionLabel::Happy);
        assert_eq!(summary.focus_score, 10.0);
        assert_eq!(summary.engagement_score, 10.0);
    }

    #[test]
    fn test_neutral_counts_for_focus_against_engagement() {
        let events = vec![
            event(0.0, EmotionLabel::Neutral),
            event(1.0, EmotionLabel::Neutral),
            event(2.0, EmotionLabel::Angry),
            event(3.0, EmotionLabel::Angry),
        ];
        let summary = summarize_events(VideoId::from("v1"), &events).unwrap();
        assert!((summary.focus_score - 5.0).abs() < 1e-9);
        assert!((summary.engagement_score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_report_empty_day_fails() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let sessions = vec![session("s1", "u1", other_day, EmotionLabel::Happy, 8.0, 7.0)];
        let err = build_daily_report("u1", date, &sessions).unwrap_err();
        assert!(matches!(err, WorkerError::EmptyInput(_)));
    }

    #[test]
    fn test_daily_report_means_and_counts() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let sessions = vec![
            session("s1", "u1", date, EmotionLabel::Happy, 8.0, 6.0),
            session("s2", "u1", date, EmotionLabel::Happy, 6.0, 8.0),
            session("s3", "u1", date, EmotionLabel::Sad, 4.0, 4.0),
            // Another user's session on the same day is excluded.
            session("s4", "u2", date, EmotionLabel::Angry, 1.0, 1.0),
        ];
        let report = build_daily_report("u1", date, &sessions).unwrap();

        assert_eq!(report.total_sessions, 3);
        assert_eq!(report.total_duration_seconds, 1800.0);
        assert_eq!(report.emotion_counts[&EmotionLabel::Happy], 2);
        assert_eq!(report.dominant_emotion, EmotionLabel::Happy);
        assert!((report.focus_score - 6.0).abs() < 1e-9);
        assert!((report.engagement_score - 6.0).abs() < 1e-9);
        let sum: f64 = report.emotion_percentages.values().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_report_is_idempotent() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let sessions = vec![
            session("s1", "u1", date, EmotionLabel::Happy, 7.3, 6.1),
            session("s2", "u1", date, EmotionLabel::Neutral, 5.9, 2.2),
        ];
        let first = build_daily_report("u1", date, &sessions).unwrap();
        let second = build_daily_report("u1", date, &sessions).unwrap();

        assert_eq!(first.emotion_counts, second.emotion_counts);
        assert_eq!(first.emotion_percentages, second.emotion_percentages);
        assert_eq!(first.dominant_emotion, second.dominant_emotion);
        assert_eq!(first.focus_score.to_bits(), second.focus_score.to_bits());
        assert_eq!(
            first.engagement_score.to_bits(),
            second.engagement_score.to_bits()
        );
    }

    #[test]
    fn test_plan_report_write_keys() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let sessions = vec![session("s1", "u1", date, EmotionLabel::Happy, 8.0, 7.0)];
        let fresh = build_daily_report("u1", date, &sessions).unwrap();

        let write = plan_report_write(None, fresh.clone());
        assert!(matches!(write, ReportWrite::Insert(_)));
        assert_eq!(write.report().user_id, "u1");

        assert!(matches!(
            plan_report_write(Some(&fresh.clone()), fresh.clone()),
            ReportWrite::Update(_)
        ));

        let other_day = build_daily_report(
            "u1",
            date.succ_opt().unwrap(),
            &[session(
                "s2",
                "u1",
                date.succ_opt().unwrap(),
                EmotionLabel::Sad,
                3.0,
                3.0,
            )],
        )
        .unwrap();
        assert!(matches!(
            plan_report_write(Some(&other_day), fresh),
            ReportWrite::Insert(_)
        ));
    }
}
