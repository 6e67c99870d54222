use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mapping of normalized tag name to detection count, as produced by one
/// analysis attempt for one media item.
pub type TagMap = HashMap<String, u32>;

/// Media kind, set once when an uploaded object is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

/// Processing status of a media record.
///
/// Transitions are monotonic within one processing attempt:
/// `Pending → Processing → {Done, Error}`. Re-entering `Processing` is only
/// allowed through an explicit reprocessing action (a new dispatch for the
/// same record id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl MediaStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Entering `Processing` is valid from every state because each
    /// dispatch of the record is an explicit new attempt (at-least-once
    /// triggers may redeliver records that already finished). Leaving
    /// `Processing` is only valid into `Done` or `Error`, plus the
    /// idempotent `Done → Done` re-completion.
    pub fn can_transition(self, next: MediaStatus) -> bool {
        matches!(
            (self, next),
            (_, MediaStatus::Processing)
                | (MediaStatus::Processing, MediaStatus::Done)
                | (MediaStatus::Processing, MediaStatus::Error)
                | (MediaStatus::Done, MediaStatus::Done)
        )
    }

    /// Whether tags must be empty in this state.
    pub fn tags_must_be_empty(self) -> bool {
        matches!(self, MediaStatus::Pending | MediaStatus::Processing)
    }
}

impl Display for MediaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaStatus::Pending => write!(f, "pending"),
            MediaStatus::Processing => write!(f, "processing"),
            MediaStatus::Done => write!(f, "done"),
            MediaStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for MediaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MediaStatus::Pending),
            "processing" => Ok(MediaStatus::Processing),
            "done" => Ok(MediaStatus::Done),
            "error" => Ok(MediaStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid media status: {}", s)),
        }
    }
}

/// Persistent per-file state: status, kind, tags and object references.
///
/// Created by the upload step with `status = Pending` and empty tags,
/// mutated exactly once per processing attempt, never deleted by the
/// pipeline. `tags` stays empty until the atomic transition to `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub file_id: Uuid,
    pub status: MediaStatus,
    /// Set once at classification; `None` until the record is dispatched.
    pub file_type: Option<MediaKind>,
    pub tags: TagMap,
    /// Object store key of the uploaded file.
    pub object_key: String,
    /// Opaque public reference to the uploaded file.
    pub object_url: String,
    pub thumbnail_url: Option<String>,
    pub original_filename: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// A freshly ingested record: pending, unclassified, no tags.
    pub fn pending(
        file_id: Uuid,
        object_key: String,
        object_url: String,
        original_filename: String,
        content_type: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            file_id,
            status: MediaStatus::Pending,
            file_type: None,
            tags: TagMap::new(),
            object_key,
            object_url,
            thumbnail_url: None,
            original_filename,
            content_type,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_is_reachable_from_every_state() {
        for from in [
            MediaStatus::Pending,
            MediaStatus::Processing,
            MediaStatus::Done,
            MediaStatus::Error,
        ] {
            assert!(from.can_transition(MediaStatus::Processing));
        }
    }

    #[test]
    fn terminal_states_require_processing_first() {
        assert!(!MediaStatus::Pending.can_transition(MediaStatus::Done));
        assert!(!MediaStatus::Pending.can_transition(MediaStatus::Error));
        assert!(!MediaStatus::Error.can_transition(MediaStatus::Done));
        assert!(MediaStatus::Processing.can_transition(MediaStatus::Done));
        assert!(MediaStatus::Processing.can_transition(MediaStatus::Error));
    }

    #[test]
    fn re_completion_is_idempotent() {
        assert!(MediaStatus::Done.can_transition(MediaStatus::Done));
        assert!(!MediaStatus::Done.can_transition(MediaStatus::Error));
    }

    #[test]
    fn tags_are_empty_before_done() {
        assert!(MediaStatus::Pending.tags_must_be_empty());
        assert!(MediaStatus::Processing.tags_must_be_empty());
        assert!(!MediaStatus::Done.tags_must_be_empty());
    }

    #[test]
    fn pending_record_starts_unclassified() {
        let record = MediaRecord::pending(
            Uuid::new_v4(),
            "uploads/images/2026-08-07/abc_birds.jpg".to_string(),
            "https://bucket.s3.us-east-1.amazonaws.com/abc_birds.jpg".to_string(),
            "birds.jpg".to_string(),
            "image/jpeg".to_string(),
        );
        assert_eq!(record.status, MediaStatus::Pending);
        assert!(record.file_type.is_none());
        assert!(record.tags.is_empty());
    }
}
