//! Notification fan-out for completed media records.
//!
//! One message per detected tag that has subscribers. Publishing is
//! isolated per tag: a channel failure for one tag is logged and the
//! remaining tags still go out, and nothing here ever reverts the
//! aggregation step. There is no dedup across repeated fan-out
//! invocations for the same record; at-least-once delivery is the
//! accepted semantic.

use std::sync::Arc;

use birdtag_core::models::{channel_name, TagNotification};
use birdtag_core::{MediaRecord, MediaStatus};

use crate::channel::ChannelService;
use crate::registry::SubscriptionRegistry;

/// Per-invocation summary, by tag.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub published: Vec<String>,
    /// Tags with no subscribers; no channel traffic is generated for them.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct NotificationFanout {
    registry: SubscriptionRegistry,
    channels: Arc<dyn ChannelService>,
}

impl NotificationFanout {
    pub fn new(registry: SubscriptionRegistry, channels: Arc<dyn ChannelService>) -> Self {
        Self { registry, channels }
    }

    /// Fan a completed record's tags out to their subscribers.
    ///
    /// Reads the tag map only after aggregation's atomic write, so it
    /// never observes a partially written record.
    #[tracing::instrument(skip(self, record), fields(file_id = %record.file_id))]
    pub async fn dispatch(&self, record: &MediaRecord) -> FanoutReport {
        let mut report = FanoutReport::default();

        if record.status != MediaStatus::Done || record.tags.is_empty() {
            tracing::debug!(
                status = %record.status,
                tag_count = record.tags.len(),
                "Record not eligible for fan-out"
            );
            return report;
        }

        let file_type = match record.file_type {
            Some(kind) => kind,
            None => {
                tracing::warn!("Completed record has no file type, skipping fan-out");
                return report;
            }
        };

        for (tag, count) in &record.tags {
            match self.dispatch_tag(record, file_type, tag, *count).await {
                Ok(true) => report.published.push(tag.clone()),
                Ok(false) => report.skipped.push(tag.clone()),
                Err(e) => {
                    // Isolated per tag: log and keep going.
                    tracing::error!(tag = %tag, error = %e, "Failed to publish notification");
                    report.failed.push(tag.clone());
                }
            }
        }

        tracing::info!(
            published = report.published.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Fan-out complete"
        );
        report
    }

    /// Returns Ok(true) when a message was published, Ok(false) when the
    /// tag has no subscribers.
    async fn dispatch_tag(
        &self,
        record: &MediaRecord,
        file_type: birdtag_core::MediaKind,
        tag: &str,
        count: u32,
    ) -> Result<bool, birdtag_core::PipelineError> {
        let subscribers = self.registry.subscribers_for_tag(tag).await?;
        if subscribers.is_empty() {
            tracing::debug!(tag = %tag, "No subscribers, skipping tag");
            return Ok(false);
        }

        let notification = TagNotification {
            file_id: record.file_id,
            file_type,
            tag: tag.to_string(),
            count,
            object_url: record.object_url.clone(),
            thumbnail_url: record.thumbnail_url.clone(),
        };

        let handle = self
            .channels
            .create_or_get_channel(&channel_name(tag))
            .await?;
        self.channels
            .publish(&handle, &notification.subject(), &notification.body())
            .await?;

        Ok(true)
    }
}
