//! In-memory media store and object store for testing the pipeline
//! without a database or object storage.
//!
//! `MemoryMediaStore` is faithful to the repository's guarded-transition
//! semantics, so status-machine tests exercise the same rules the SQL
//! implementation enforces.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use birdtag_core::{MediaKind, MediaRecord, MediaStatus, PipelineError, TagMap};
use birdtag_db::MediaStore;
use birdtag_storage::{ObjectStore, StorageError, StorageResult};

#[derive(Default)]
pub struct MemoryMediaStore {
    records: Mutex<HashMap<Uuid, MediaRecord>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one record, for assertions.
    pub fn snapshot(&self, file_id: Uuid) -> Option<MediaRecord> {
        self.records.lock().unwrap().get(&file_id).cloned()
    }

    fn not_found(file_id: Uuid) -> PipelineError {
        PipelineError::Lookup(format!("media record not found: {}", file_id))
    }

    fn invalid_transition(file_id: Uuid, from: MediaStatus, to: MediaStatus) -> PipelineError {
        PipelineError::Internal(anyhow::anyhow!(
            "invalid status transition for {}: {} -> {}",
            file_id,
            from,
            to
        ))
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn create_pending(&self, record: &MediaRecord) -> Result<(), PipelineError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.file_id, record.clone());
        Ok(())
    }

    async fn get(&self, file_id: Uuid) -> Result<Option<MediaRecord>, PipelineError> {
        Ok(self.records.lock().unwrap().get(&file_id).cloned())
    }

    async fn mark_processing(
        &self,
        file_id: Uuid,
        kind: MediaKind,
    ) -> Result<MediaRecord, PipelineError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&file_id).ok_or(Self::not_found(file_id))?;
        record.status = MediaStatus::Processing;
        record.file_type.get_or_insert(kind);
        record.tags.clear();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn complete(&self, file_id: Uuid, tags: &TagMap) -> Result<MediaRecord, PipelineError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&file_id).ok_or(Self::not_found(file_id))?;
        if !record.status.can_transition(MediaStatus::Done) {
            return Err(Self::invalid_transition(
                file_id,
                record.status,
                MediaStatus::Done,
            ));
        }
        record.tags = tags.clone();
        record.status = MediaStatus::Done;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn fail(&self, file_id: Uuid) -> Result<MediaRecord, PipelineError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&file_id).ok_or(Self::not_found(file_id))?;
        if !record.status.can_transition(MediaStatus::Error) {
            return Err(Self::invalid_transition(
                file_id,
                record.status,
                MediaStatus::Error,
            ));
        }
        record.status = MediaStatus::Error;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_thumbnail_url(&self, file_id: Uuid, url: &str) -> Result<(), PipelineError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&file_id).ok_or(Self::not_found(file_id))?;
        record.thumbnail_url = Some(url.to_string());
        Ok(())
    }

    async fn search_by_tags(
        &self,
        requirements: &[(String, u32)],
    ) -> Result<Vec<MediaRecord>, PipelineError> {
        if requirements.is_empty() {
            return Err(PipelineError::Validation(
                "at least one tag must be provided".to_string(),
            ));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == MediaStatus::Done)
            .filter(|r| {
                requirements
                    .iter()
                    .all(|(tag, min)| r.tags.get(tag).is_some_and(|count| count >= min))
            })
            .cloned()
            .collect())
    }
}

/// Object store backed by a HashMap. URLs are `memory://{key}`.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, data: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        self
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, _content_type: &str, data: Vec<u8>) -> StorageResult<String> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(self.url_for(key))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
