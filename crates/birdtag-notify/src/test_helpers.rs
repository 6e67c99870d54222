//! In-memory channel service and subscription store for testing without
//! AWS or a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use birdtag_core::models::SubscriptionRecord;
use birdtag_core::PipelineError;
use birdtag_db::SubscriptionStore;

use crate::channel::ChannelService;

const HANDLE_PREFIX: &str = "memory:";

#[derive(Default)]
struct ChannelState {
    endpoints: Vec<String>,
    published: Vec<(String, String)>,
}

/// Channel service keeping channels, attachments and published messages
/// in memory. Handles are `memory:{name}`.
#[derive(Default)]
pub struct MemoryChannelService {
    channels: Mutex<HashMap<String, ChannelState>>,
    failing_publishes: Mutex<HashSet<String>>,
}

impl MemoryChannelService {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_to_name(handle: &str) -> Result<String, PipelineError> {
        handle
            .strip_prefix(HANDLE_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Channel(format!("unknown channel handle: {}", handle)))
    }

    /// Make every publish to the named channel fail.
    pub fn fail_publish_for(&self, name: &str) {
        self.failing_publishes
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn channel_exists(&self, name: &str) -> bool {
        self.channels.lock().unwrap().contains_key(name)
    }

    pub fn endpoints(&self, name: &str) -> Vec<String> {
        self.channels
            .lock()
            .unwrap()
            .get(name)
            .map(|c| c.endpoints.clone())
            .unwrap_or_default()
    }

    /// Messages published to the named channel, as (subject, body) pairs.
    pub fn published(&self, name: &str) -> Vec<(String, String)> {
        self.channels
            .lock()
            .unwrap()
            .get(name)
            .map(|c| c.published.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChannelService for MemoryChannelService {
    async fn create_or_get_channel(&self, name: &str) -> Result<String, PipelineError> {
        self.channels
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
        Ok(format!("{}{}", HANDLE_PREFIX, name))
    }

    async fn publish(
        &self,
        handle: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PipelineError> {
        let name = Self::handle_to_name(handle)?;
        if self.failing_publishes.lock().unwrap().contains(&name) {
            return Err(PipelineError::Channel(format!(
                "simulated publish failure for {}",
                name
            )));
        }
        let mut channels = self.channels.lock().unwrap();
        let channel = channels
            .get_mut(&name)
            .ok_or_else(|| PipelineError::Channel(format!("channel does not exist: {}", name)))?;
        channel
            .published
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }

    async fn attach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError> {
        let name = Self::handle_to_name(handle)?;
        let mut channels = self.channels.lock().unwrap();
        let channel = channels
            .get_mut(&name)
            .ok_or_else(|| PipelineError::Channel(format!("channel does not exist: {}", name)))?;
        if !channel.endpoints.iter().any(|e| e == endpoint) {
            channel.endpoints.push(endpoint.to_string());
        }
        Ok(())
    }

    async fn detach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError> {
        let name = Self::handle_to_name(handle)?;
        let mut channels = self.channels.lock().unwrap();
        if let Some(channel) = channels.get_mut(&name) {
            channel.endpoints.retain(|e| e != endpoint);
        }
        Ok(())
    }

    async fn list_endpoints(&self, handle: &str) -> Result<Vec<String>, PipelineError> {
        let name = Self::handle_to_name(handle)?;
        Ok(self.endpoints(&name))
    }
}

/// Subscription store backed by a HashMap, faithful to the repository's
/// upsert-by-composite-key semantics.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    records: Mutex<HashMap<String, SubscriptionRecord>>,
    fail_next_upsert: AtomicBool,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next upsert fail, to exercise rollback paths.
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn upsert(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<SubscriptionRecord, PipelineError> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(PipelineError::Internal(anyhow::anyhow!(
                "simulated upsert failure"
            )));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.subscription_id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn get(
        &self,
        subscriber: &str,
        tag_normalized: &str,
    ) -> Result<Option<SubscriptionRecord>, PipelineError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.subscriber == subscriber && r.tag_normalized == tag_normalized)
            .cloned())
    }

    async fn delete(&self, subscription_id: &str) -> Result<bool, PipelineError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .remove(subscription_id)
            .is_some())
    }

    async fn find_by_tag(
        &self,
        tag_normalized: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.tag_normalized == tag_normalized)
            .cloned()
            .collect())
    }

    async fn find_by_subscriber(
        &self,
        subscriber: &str,
    ) -> Result<Vec<SubscriptionRecord>, PipelineError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.subscriber == subscriber)
            .cloned()
            .collect())
    }
}
