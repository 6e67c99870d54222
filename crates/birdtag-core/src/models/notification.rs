use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MediaKind;

/// Payload published to a tag's channel when a completed record contains
/// that tag. One message per (record, tag); delivery is at-least-once and
/// repeated fan-out for the same record may duplicate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagNotification {
    pub file_id: Uuid,
    pub file_type: MediaKind,
    pub tag: String,
    pub count: u32,
    pub object_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl TagNotification {
    /// Subject line for the delivery channel.
    pub fn subject(&self) -> String {
        format!("BirdTag: new {} with {}", self.file_type, self.tag)
    }

    /// Human-readable message body.
    pub fn body(&self) -> String {
        let mut body = format!(
            "A new {} has been uploaded and contains: {}\n\n\
             File ID: {}\n\
             Detected species: {} (count: {})\n\
             File URL: {}\n",
            self.file_type, self.tag, self.file_id, self.tag, self.count, self.object_url
        );
        if let Some(thumb) = &self.thumbnail_url {
            body.push_str(&format!("Thumbnail URL: {}\n", thumb));
        }
        body.push_str(
            "\nThis is an automated notification from BirdTag. \
             To manage your subscriptions, visit your notification settings.\n",
        );
        body
    }
}
