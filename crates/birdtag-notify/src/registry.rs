//! Subscription registry: CRUD over tag subscriptions.
//!
//! Subscribing wires three things together: the per-tag channel
//! (create-or-get), the subscriber's attachment to it, and the
//! subscription record in the metadata store. Validation happens before
//! any mutation; a failed record upsert rolls the attachment back
//! best-effort so no half-complete subscription remains.

use std::sync::Arc;

use birdtag_core::models::{channel_name, normalize_tag, SubscriptionRecord};
use birdtag_core::PipelineError;
use birdtag_db::SubscriptionStore;

use crate::channel::ChannelService;

#[derive(Clone)]
pub struct SubscriptionRegistry {
    store: Arc<dyn SubscriptionStore>,
    channels: Arc<dyn ChannelService>,
}

impl SubscriptionRegistry {
    pub fn new(store: Arc<dyn SubscriptionStore>, channels: Arc<dyn ChannelService>) -> Self {
        Self { store, channels }
    }

    fn validate(subscriber: &str, tag: &str) -> Result<String, PipelineError> {
        if subscriber.trim().is_empty() {
            return Err(PipelineError::Validation(
                "subscriber identity is required".to_string(),
            ));
        }
        let normalized = normalize_tag(tag);
        if normalized.is_empty() {
            return Err(PipelineError::Validation("tag is required".to_string()));
        }
        Ok(normalized)
    }

    /// Subscribe `subscriber` to `tag`. Idempotent: repeating the call for
    /// the same pair updates the existing record, never duplicates.
    #[tracing::instrument(skip(self))]
    pub async fn subscribe(
        &self,
        subscriber: &str,
        tag: &str,
    ) -> Result<SubscriptionRecord, PipelineError> {
        let normalized = Self::validate(subscriber, tag)?;

        let name = channel_name(&normalized);
        let handle = self.channels.create_or_get_channel(&name).await?;
        self.channels.attach(&handle, subscriber).await?;

        let record =
            SubscriptionRecord::new(subscriber.to_string(), normalized.clone(), handle.clone());

        match self.store.upsert(&record).await {
            Ok(stored) => {
                tracing::info!(
                    subscriber = %subscriber,
                    tag = %normalized,
                    channel = %name,
                    "Subscription created"
                );
                Ok(stored)
            }
            Err(e) => {
                // Keep the registry and the channel in agreement: without a
                // record the attachment must not survive.
                if let Err(detach_err) = self.channels.detach(&handle, subscriber).await {
                    tracing::warn!(
                        subscriber = %subscriber,
                        tag = %normalized,
                        error = %detach_err,
                        "Failed to detach after record upsert failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Unsubscribe `subscriber` from `tag`. A missing subscription is a
    /// no-op, not an error; returns whether a record was removed. The
    /// channel itself is never destroyed.
    #[tracing::instrument(skip(self))]
    pub async fn unsubscribe(&self, subscriber: &str, tag: &str) -> Result<bool, PipelineError> {
        let normalized = Self::validate(subscriber, tag)?;

        let record = match self.store.get(subscriber, &normalized).await? {
            Some(record) => record,
            None => {
                tracing::debug!(
                    subscriber = %subscriber,
                    tag = %normalized,
                    "Unsubscribe for unknown subscription, nothing to do"
                );
                return Ok(false);
            }
        };

        // Detachment is best-effort: a channel failure must not leave the
        // registry claiming a subscription the user asked to remove.
        if let Err(e) = self
            .channels
            .detach(&record.channel_reference, subscriber)
            .await
        {
            tracing::warn!(
                subscriber = %subscriber,
                tag = %normalized,
                error = %e,
                "Failed to detach subscriber from channel"
            );
        }

        let removed = self.store.delete(&record.subscription_id).await?;
        tracing::info!(subscriber = %subscriber, tag = %normalized, "Subscription removed");
        Ok(removed)
    }

    /// Subscriber identities currently registered for `tag`. Backing
    /// lookup for notification fan-out.
    pub async fn subscribers_for_tag(&self, tag: &str) -> Result<Vec<String>, PipelineError> {
        let normalized = normalize_tag(tag);
        let records = self.store.find_by_tag(&normalized).await?;
        Ok(records.into_iter().map(|r| r.subscriber).collect())
    }

    /// All subscriptions of one subscriber. Backing lookup for the
    /// settings view.
    pub async fn subscriptions_for(
        &self,
        subscriber: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError> {
        if subscriber.trim().is_empty() {
            return Err(PipelineError::Validation(
                "subscriber identity is required".to_string(),
            ));
        }
        self.store.find_by_subscriber(subscriber).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryChannelService, MemorySubscriptionStore};

    fn registry() -> (Arc<MemorySubscriptionStore>, Arc<MemoryChannelService>, SubscriptionRegistry) {
        let store = Arc::new(MemorySubscriptionStore::new());
        let channels = Arc::new(MemoryChannelService::new());
        let registry = SubscriptionRegistry::new(store.clone(), channels.clone());
        (store, channels, registry)
    }

    #[tokio::test]
    async fn subscribe_twice_yields_one_normalized_record() {
        let (store, channels, registry) = registry();

        registry.subscribe("alice@example.com", "Sparrow").await.unwrap();
        let record = registry.subscribe("alice@example.com", "Sparrow").await.unwrap();

        assert_eq!(record.tag_normalized, "sparrow");
        assert_eq!(store.len(), 1);
        // One channel, alice attached exactly once.
        assert_eq!(
            channels.endpoints("notifications-sparrow"),
            vec!["alice@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn unsubscribe_removes_record_and_attachment_only_for_that_subscriber() {
        let (store, channels, registry) = registry();

        registry.subscribe("alice@example.com", "sparrow").await.unwrap();
        registry.subscribe("bob@example.com", "sparrow").await.unwrap();

        let removed = registry.unsubscribe("alice@example.com", "sparrow").await.unwrap();
        assert!(removed);
        assert_eq!(store.len(), 1);
        // Bob's attachment to the shared channel stays intact.
        assert_eq!(
            channels.endpoints("notifications-sparrow"),
            vec!["bob@example.com".to_string()]
        );
        // The channel itself is not destroyed.
        assert!(channels.channel_exists("notifications-sparrow"));
    }

    #[tokio::test]
    async fn unsubscribe_unknown_subscription_is_a_noop() {
        let (_store, _channels, registry) = registry();
        let removed = registry.unsubscribe("alice@example.com", "sparrow").await.unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn missing_fields_fail_validation_before_any_mutation() {
        let (store, channels, registry) = registry();

        let err = registry.subscribe("", "sparrow").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        let err = registry.subscribe("alice@example.com", "   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        assert_eq!(store.len(), 0);
        assert!(!channels.channel_exists("notifications-sparrow"));
    }

    #[tokio::test]
    async fn failed_upsert_detaches_the_subscriber_again() {
        let (store, channels, registry) = registry();
        store.fail_next_upsert();

        let err = registry.subscribe("alice@example.com", "sparrow").await.unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));

        assert_eq!(store.len(), 0);
        assert!(channels.endpoints("notifications-sparrow").is_empty());
    }

    #[tokio::test]
    async fn subscribers_for_tag_normalizes_the_lookup() {
        let (_store, _channels, registry) = registry();
        registry.subscribe("alice@example.com", "Sparrow").await.unwrap();

        let subscribers = registry.subscribers_for_tag("  SPARROW ").await.unwrap();
        assert_eq!(subscribers, vec!["alice@example.com".to_string()]);
    }

    #[tokio::test]
    async fn settings_view_lists_all_tags_of_a_subscriber() {
        let (_store, _channels, registry) = registry();
        registry.subscribe("alice@example.com", "sparrow").await.unwrap();
        registry.subscribe("alice@example.com", "hawk").await.unwrap();
        registry.subscribe("bob@example.com", "owl").await.unwrap();

        let mut tags: Vec<String> = registry
            .subscriptions_for("alice@example.com")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.tag_normalized)
            .collect();
        tags.sort();
        assert_eq!(tags, vec!["hawk".to_string(), "sparrow".to_string()]);
    }
}
