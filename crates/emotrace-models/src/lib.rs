//! Shared data models for the EmoTrace backend.
//!
//! This crate provides Serde-serializable types for:
//! - The closed emotion label set (model output channel order)
//! - Per-face emotion events and face bounding boxes
//! - Video analysis summaries (counts, percentages, scores)
//! - Session records and daily report rollups

pub mod event;
pub mod label;
pub mod rect;
pub mod session;
pub mod summary;
pub mod video;

// Re-export common types
pub use event::EmotionEvent;
pub use label::EmotionLabel;
pub use rect::FaceBox;
pub use session::{DailyReport, SessionRecord};
pub use summary::VideoAnalysisSummary;
pub use video::{VideoId, VideoMetadata};
