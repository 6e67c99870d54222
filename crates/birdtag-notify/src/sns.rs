use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::Client;

use birdtag_core::PipelineError;

use crate::channel::ChannelService;

/// SNS-backed channel service: one topic per tag, email-protocol
/// subscriptions as delivery endpoints.
#[derive(Clone)]
pub struct SnsChannelService {
    client: Client,
}

impl SnsChannelService {
    pub async fn new(region: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelService for SnsChannelService {
    #[tracing::instrument(skip(self))]
    async fn create_or_get_channel(&self, name: &str) -> Result<String, PipelineError> {
        // SNS CreateTopic returns the existing ARN when the topic already
        // exists, which gives us create-or-get in one call.
        let response = self
            .client
            .create_topic()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Channel(format!("failed to create or get topic {}: {}", name, e))
            })?;

        response.topic_arn().map(str::to_string).ok_or_else(|| {
            PipelineError::Channel(format!("no topic ARN returned for {}", name))
        })
    }

    #[tracing::instrument(skip(self, body))]
    async fn publish(
        &self,
        handle: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PipelineError> {
        let response = self
            .client
            .publish()
            .topic_arn(handle)
            .subject(subject)
            .message(body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Channel(format!("failed to publish to {}: {}", handle, e))
            })?;

        tracing::debug!(
            topic_arn = %handle,
            message_id = response.message_id().unwrap_or("unknown"),
            "Published notification"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn attach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError> {
        self.client
            .subscribe()
            .topic_arn(handle)
            .protocol("email")
            .endpoint(endpoint)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Channel(format!(
                    "failed to attach {} to {}: {}",
                    endpoint, handle, e
                ))
            })?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn detach(&self, handle: &str, endpoint: &str) -> Result<(), PipelineError> {
        // SNS has no detach-by-endpoint; find the matching subscription
        // and unsubscribe it.
        let subscriptions = self
            .client
            .list_subscriptions_by_topic()
            .topic_arn(handle)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Channel(format!("failed to list subscriptions of {}: {}", handle, e))
            })?;

        for subscription in subscriptions.subscriptions() {
            if subscription.endpoint() == Some(endpoint)
                && subscription.protocol() == Some("email")
            {
                if let Some(arn) = subscription.subscription_arn() {
                    // Endpoints that never confirmed have no real ARN yet;
                    // there is nothing to unsubscribe in that case.
                    if arn.starts_with("arn:") {
                        self.client
                            .unsubscribe()
                            .subscription_arn(arn)
                            .send()
                            .await
                            .map_err(|e| {
                                PipelineError::Channel(format!(
                                    "failed to detach {} from {}: {}",
                                    endpoint, handle, e
                                ))
                            })?;
                    }
                }
                break;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_endpoints(&self, handle: &str) -> Result<Vec<String>, PipelineError> {
        let subscriptions = self
            .client
            .list_subscriptions_by_topic()
            .topic_arn(handle)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Channel(format!("failed to list subscriptions of {}: {}", handle, e))
            })?;

        Ok(subscriptions
            .subscriptions()
            .iter()
            .filter_map(|s| s.endpoint().map(str::to_string))
            .collect())
    }
}
