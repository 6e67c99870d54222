//! Store traits consumed by the pipeline and notification crates.
//!
//! The PostgreSQL repositories implement these; tests use in-memory
//! implementations. Every transition method is keyed by record id —
//! callers never scan for "the next pending record".

use async_trait::async_trait;
use uuid::Uuid;

use birdtag_core::models::SubscriptionRecord;
use birdtag_core::{MediaKind, MediaRecord, PipelineError, TagMap};

/// Keyed access to media records and their status machine.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist a freshly ingested record (status pending, empty tags).
    async fn create_pending(&self, record: &MediaRecord) -> Result<(), PipelineError>;

    async fn get(&self, file_id: Uuid) -> Result<Option<MediaRecord>, PipelineError>;

    /// Enter `Processing` for a new attempt. Sets `file_type` on first
    /// classification and resets tags, so the empty-while-processing
    /// invariant holds even for an explicit reprocess of a finished record.
    async fn mark_processing(
        &self,
        file_id: Uuid,
        kind: MediaKind,
    ) -> Result<MediaRecord, PipelineError>;

    /// Atomically overwrite tags (replacement, not accumulation) and set
    /// status `Done`. A reader can never observe `Done` with stale tags.
    async fn complete(&self, file_id: Uuid, tags: &TagMap) -> Result<MediaRecord, PipelineError>;

    /// Set status `Error`, leaving tags untouched from before the attempt.
    async fn fail(&self, file_id: Uuid) -> Result<MediaRecord, PipelineError>;

    async fn set_thumbnail_url(&self, file_id: Uuid, url: &str) -> Result<(), PipelineError>;

    /// Completed records whose tag map satisfies every `(tag, min_count)`
    /// requirement.
    async fn search_by_tags(
        &self,
        requirements: &[(String, u32)],
    ) -> Result<Vec<MediaRecord>, PipelineError>;
}

/// CRUD over tag subscriptions with the two secondary lookups.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or update the record for its (subscriber, tag) pair.
    /// Re-subscribing never duplicates.
    async fn upsert(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<SubscriptionRecord, PipelineError>;

    async fn get(
        &self,
        subscriber: &str,
        tag_normalized: &str,
    ) -> Result<Option<SubscriptionRecord>, PipelineError>;

    /// Returns whether a record was actually deleted.
    async fn delete(&self, subscription_id: &str) -> Result<bool, PipelineError>;

    /// Backing lookup for notification fan-out.
    async fn find_by_tag(
        &self,
        tag_normalized: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError>;

    /// Backing lookup for the settings view.
    async fn find_by_subscriber(
        &self,
        subscriber: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError>;
}
