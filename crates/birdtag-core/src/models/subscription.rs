use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CHANNEL_NAME_PREFIX;

/// Canonical form of a tag: trimmed and lower-cased.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Deterministic composite key for a (subscriber, tag) pair.
/// At most one subscription record exists per pair.
pub fn subscription_id(subscriber: &str, tag_normalized: &str) -> String {
    format!("{}#{}", subscriber, tag_normalized)
}

/// Channel identity as a pure function of the normalized tag.
///
/// Never cache channel existence locally; existence is established via
/// idempotent create-or-get on every use so concurrent workers cannot
/// disagree on it.
pub fn channel_name(tag_normalized: &str) -> String {
    format!(
        "{}{}",
        CHANNEL_NAME_PREFIX,
        tag_normalized.replace(' ', "-")
    )
}

/// One subscriber's interest in one tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// `{subscriber}#{tag_normalized}`
    pub subscription_id: String,
    /// Opaque subscriber identity (an address-like identifier).
    pub subscriber: String,
    pub tag_normalized: String,
    /// Handle to the delivery channel bound 1:1 with `tag_normalized`.
    pub channel_reference: String,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn new(subscriber: String, tag_normalized: String, channel_reference: String) -> Self {
        Self {
            subscription_id: subscription_id(&subscriber, &tag_normalized),
            subscriber,
            tag_normalized,
            channel_reference,
            created_at: Utc::now(),
        }
    }
}
