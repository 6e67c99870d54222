use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use birdtag_core::models::SubscriptionRecord;
use birdtag_core::PipelineError;

use crate::traits::SubscriptionStore;

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    subscription_id: String,
    subscriber: String,
    tag_normalized: String,
    channel_reference: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SubscriptionRow> for SubscriptionRecord {
    fn from(row: SubscriptionRow) -> Self {
        SubscriptionRecord {
            subscription_id: row.subscription_id,
            subscriber: row.subscriber,
            tag_normalized: row.tag_normalized,
            channel_reference: row.channel_reference,
            created_at: row.created_at,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str =
    "subscription_id, subscriber, tag_normalized, channel_reference, created_at";

/// PostgreSQL repository for tag subscriptions.
///
/// The primary key is the deterministic `{subscriber}#{tag}` composite, so
/// a re-subscribe upserts instead of duplicating. Two indexed lookups back
/// fan-out (by tag) and the settings view (by subscriber).
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    #[tracing::instrument(skip(self, record), fields(subscription_id = %record.subscription_id))]
    async fn upsert(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<SubscriptionRecord, PipelineError> {
        let row: SubscriptionRow = sqlx::query_as::<Postgres, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions (
                subscription_id, subscriber, tag_normalized, channel_reference, created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subscription_id)
            DO UPDATE SET channel_reference = EXCLUDED.channel_reference
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(&record.subscription_id)
        .bind(&record.subscriber)
        .bind(&record.tag_normalized)
        .bind(&record.channel_reference)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn get(
        &self,
        subscriber: &str,
        tag_normalized: &str,
    ) -> Result<Option<SubscriptionRecord>, PipelineError> {
        let row: Option<SubscriptionRow> = sqlx::query_as::<Postgres, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE subscriber = $1 AND tag_normalized = $2",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscriber)
        .bind(tag_normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, subscription_id: &str) -> Result<bool, PipelineError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_tag(
        &self,
        tag_normalized: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as::<Postgres, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE tag_normalized = $1 ORDER BY created_at",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(tag_normalized)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_subscriber(
        &self,
        subscriber: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as::<Postgres, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE subscriber = $1 ORDER BY created_at",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscriber)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
