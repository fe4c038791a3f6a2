//! Video identity and metadata.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an uploaded video.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata recorded for a processed video.
///
/// This is the shape the persistence collaborator stores alongside the
/// event sequence once analysis completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Unique identifier for this video
    pub id: VideoId,

    /// User who uploaded the video
    pub user_id: String,

    /// Stored filename of the upload
    pub filename: String,

    /// Total video duration in seconds
    pub duration_seconds: f64,

    /// When the video was uploaded
    pub uploaded_at: DateTime<Utc>,
}

impl VideoMetadata {
    /// Create metadata for a freshly analyzed upload.
    pub fn new(
        id: VideoId,
        user_id: impl Into<String>,
        filename: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            filename: filename.into(),
            duration_seconds,
            uploaded_at: Utc::now(),
        }
    }
}
