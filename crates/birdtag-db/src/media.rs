use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use birdtag_core::{MediaKind, MediaRecord, MediaStatus, PipelineError, TagMap};

use crate::traits::MediaStore;

const MEDIA_COLUMNS: &str = r#"
    file_id,
    status,
    file_type,
    tags,
    object_key,
    object_url,
    thumbnail_url,
    original_filename,
    content_type,
    created_at,
    updated_at
"#;

#[derive(sqlx::FromRow)]
struct MediaRow {
    file_id: Uuid,
    status: MediaStatus,
    file_type: Option<MediaKind>,
    tags: JsonValue,
    object_key: String,
    object_url: String,
    thumbnail_url: Option<String>,
    original_filename: String,
    content_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MediaRow {
    fn into_record(self) -> Result<MediaRecord, PipelineError> {
        let tags: TagMap = serde_json::from_value(self.tags)?;
        Ok(MediaRecord {
            file_id: self.file_id,
            status: self.status,
            file_type: self.file_type,
            tags,
            object_key: self.object_key,
            object_url: self.object_url,
            thumbnail_url: self.thumbnail_url,
            original_filename: self.original_filename,
            content_type: self.content_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// PostgreSQL repository for media records.
///
/// Status transitions are encoded as guarded UPDATE statements, so the
/// state machine is enforced in the same atomic write that changes the
/// row. All access is keyed by `file_id`.
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, file_id: Uuid) -> Result<Option<MediaStatus>, PipelineError> {
        let status: Option<(MediaStatus,)> =
            sqlx::query_as("SELECT status FROM media_records WHERE file_id = $1")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(status.map(|(s,)| s))
    }

    /// Map a guarded-update miss to the right error: the record is either
    /// absent or in a state the transition does not permit.
    async fn transition_miss(
        &self,
        file_id: Uuid,
        target: MediaStatus,
    ) -> Result<MediaRecord, PipelineError> {
        match self.current_status(file_id).await? {
            None => Err(PipelineError::Lookup(format!(
                "media record not found: {}",
                file_id
            ))),
            Some(current) => Err(PipelineError::Internal(anyhow::anyhow!(
                "invalid status transition for {}: {} -> {}",
                file_id,
                current,
                target
            ))),
        }
    }
}

#[async_trait]
impl MediaStore for MediaRepository {
    #[tracing::instrument(skip(self, record), fields(file_id = %record.file_id))]
    async fn create_pending(&self, record: &MediaRecord) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO media_records (
                file_id, status, file_type, tags, object_key, object_url,
                thumbnail_url, original_filename, content_type, created_at, updated_at
            )
            VALUES ($1, 'pending', NULL, '{}'::jsonb, $2, $3, NULL, $4, $5, $6, $6)
            "#,
        )
        .bind(record.file_id)
        .bind(&record.object_key)
        .bind(&record.object_url)
        .bind(&record.original_filename)
        .bind(&record.content_type)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(file_id = %record.file_id, "Media record created");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, file_id: Uuid) -> Result<Option<MediaRecord>, PipelineError> {
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media_records WHERE file_id = $1",
            MEDIA_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRow::into_record).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn mark_processing(
        &self,
        file_id: Uuid,
        kind: MediaKind,
    ) -> Result<MediaRecord, PipelineError> {
        // Entering `processing` is valid from every state: each dispatch is
        // an explicit new attempt. file_type is set once; tags are reset so
        // they stay empty for the whole attempt.
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(&format!(
            r#"
            UPDATE media_records
            SET status = 'processing',
                file_type = COALESCE(file_type, $2),
                tags = '{{}}'::jsonb,
                updated_at = now()
            WHERE file_id = $1
            RETURNING {}
            "#,
            MEDIA_COLUMNS
        ))
        .bind(file_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_record(),
            None => Err(PipelineError::Lookup(format!(
                "media record not found: {}",
                file_id
            ))),
        }
    }

    #[tracing::instrument(skip(self, tags))]
    async fn complete(&self, file_id: Uuid, tags: &TagMap) -> Result<MediaRecord, PipelineError> {
        let tags_json = serde_json::to_value(tags)?;

        // Tags and status change in one statement; the guard permits the
        // idempotent done -> done re-completion of a retried trigger.
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(&format!(
            r#"
            UPDATE media_records
            SET tags = $2,
                status = 'done',
                updated_at = now()
            WHERE file_id = $1 AND status IN ('processing', 'done')
            RETURNING {}
            "#,
            MEDIA_COLUMNS
        ))
        .bind(file_id)
        .bind(tags_json)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = row.into_record()?;
                tracing::info!(
                    file_id = %file_id,
                    tag_count = record.tags.len(),
                    "Media record completed"
                );
                Ok(record)
            }
            None => self.transition_miss(file_id, MediaStatus::Done).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn fail(&self, file_id: Uuid) -> Result<MediaRecord, PipelineError> {
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(&format!(
            r#"
            UPDATE media_records
            SET status = 'error',
                updated_at = now()
            WHERE file_id = $1 AND status = 'processing'
            RETURNING {}
            "#,
            MEDIA_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                tracing::warn!(file_id = %file_id, "Media record marked as error");
                row.into_record()
            }
            None => self.transition_miss(file_id, MediaStatus::Error).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn set_thumbnail_url(&self, file_id: Uuid, url: &str) -> Result<(), PipelineError> {
        let result = sqlx::query(
            "UPDATE media_records SET thumbnail_url = $2, updated_at = now() WHERE file_id = $1",
        )
        .bind(file_id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::Lookup(format!(
                "media record not found: {}",
                file_id
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn search_by_tags(
        &self,
        requirements: &[(String, u32)],
    ) -> Result<Vec<MediaRecord>, PipelineError> {
        if requirements.is_empty() {
            return Err(PipelineError::Validation(
                "at least one tag must be provided".to_string(),
            ));
        }

        let mut sql = format!(
            "SELECT {} FROM media_records WHERE status = 'done'",
            MEDIA_COLUMNS
        );
        for i in 0..requirements.len() {
            let tag_param = i * 2 + 1;
            let count_param = i * 2 + 2;
            sql.push_str(&format!(
                " AND jsonb_exists(tags, ${}) AND (tags ->> ${})::bigint >= ${}",
                tag_param, tag_param, count_param
            ));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<Postgres, MediaRow>(&sql);
        for (tag, count) in requirements {
            query = query.bind(tag).bind(i64::from(*count));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(MediaRow::into_record).collect()
    }
}
