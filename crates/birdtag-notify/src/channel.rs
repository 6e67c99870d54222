//! Notification channel service abstraction.
//!
//! A channel is a named delivery endpoint, one per normalized tag. The
//! handle returned by `create_or_get_channel` is opaque (an ARN for SNS).
//! Channels are never destroyed here, even when their last subscriber
//! detaches; destroying one could break a concurrently in-flight
//! subscribe, so the leak is the accepted trade-off.

use async_trait::async_trait;

use birdtag_core::PipelineError;

#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Idempotent create-or-get: returns the handle of the channel with
    /// this name, creating it if absent. Never duplicates.
    async fn create_or_get_channel(&self, name: &str) -> Result<String, PipelineError>;

    /// Publish one message to every endpoint attached to the channel.
    async fn publish(&self, handle: &str, subject: &str, body: &str)
        -> Result<(), PipelineError>;

    /// Attach a delivery endpoint (e.g. an email address) to the channel.
    async fn attach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError>;

    /// Detach a delivery endpoint from the channel. Detaching an endpoint
    /// that is not attached is a no-op.
    async fn detach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError>;

    /// Endpoints currently attached to the channel.
    async fn list_endpoints(&self, handle: &str) -> Result<Vec<String>, PipelineError>;
}
