use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author identity attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: String,
    pub name: String,
}

/// One retained chat message, as written to a channel log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub content: String,
    pub author: MessageAuthor,
    pub channel_id: String,
    pub server_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reaction_count: u32,
    #[serde(default)]
    pub reply_count: u32,
}

impl MessageRecord {
    /// Returns true if the message was posted strictly before `cutoff`
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.timestamp < cutoff
    }
}
