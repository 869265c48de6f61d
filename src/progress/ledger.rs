//! Checkpoint types
//!
//! The ledger file is one JSON object keyed by channel id:
//!
//! ```json
//! {
//!   "222222222222222222": {
//!     "oldestMessageId": "1190000000000000000",
//!     "totalMessages": 4210,
//!     "complete": false,
//!     "lastFetchedAt": "2026-10-19T12:00:00Z"
//!   }
//! }
//! ```

use crate::IntegrityError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Checkpoint for a single channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProgress {
    /// Id of the oldest message fetched so far; `None` before the first page
    #[serde(default)]
    pub oldest_message_id: Option<String>,

    /// Cumulative count of retained messages
    #[serde(default)]
    pub total_messages: u64,

    /// History fully retrieved back to the retention cutoff, or channel gone
    #[serde(default)]
    pub complete: bool,

    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl ChannelProgress {
    /// Applies the result of one fetched page
    ///
    /// `oldest` is the oldest retained message id on the page, if any was
    /// retained. The pointer may stay where it is or move to an older message;
    /// moving it to a newer message is rejected and leaves `self` untouched.
    pub fn record_page(
        &mut self,
        channel_id: &str,
        oldest: Option<&str>,
        retained: u64,
        complete: bool,
        now: DateTime<Utc>,
    ) -> Result<(), IntegrityError> {
        if let (Some(proposed), Some(previous)) = (oldest, self.oldest_message_id.as_deref()) {
            if compare_message_ids(proposed, previous) == Ordering::Greater {
                return Err(IntegrityError::CursorRegression {
                    channel_id: channel_id.to_string(),
                    previous: previous.to_string(),
                    proposed: proposed.to_string(),
                });
            }
        }

        if let Some(proposed) = oldest {
            self.oldest_message_id = Some(proposed.to_string());
        }
        self.total_messages += retained;
        self.complete = self.complete || complete;
        self.last_fetched_at = Some(now);
        Ok(())
    }

    /// Marks the channel as finished without touching its cursor or totals
    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.complete = true;
        self.last_fetched_at = Some(now);
    }
}

/// Orders two message ids chronologically
///
/// Ids are snowflakes: decimal strings whose numeric value grows with time.
/// Numeric ids are compared by magnitude without parsing, so ids wider than
/// `u64` still order correctly. Anything else falls back to plain string order.
pub fn compare_message_ids(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());

    if numeric(a) && numeric(b) {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// The entire durable state of the crawl: channel id to checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressLedger {
    channels: BTreeMap<String, ChannelProgress>,
}

impl ProgressLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the checkpoint for a channel, if one exists
    pub fn get(&self, channel_id: &str) -> Option<&ChannelProgress> {
        self.channels.get(channel_id)
    }

    /// Returns the checkpoint for a channel, or the zero value if it has none
    pub fn get_or_default(&self, channel_id: &str) -> ChannelProgress {
        self.channels.get(channel_id).cloned().unwrap_or_default()
    }

    /// Replaces the checkpoint for a channel
    pub fn insert(&mut self, channel_id: &str, progress: ChannelProgress) {
        self.channels.insert(channel_id.to_string(), progress);
    }

    /// Returns true if the channel has been marked complete
    pub fn is_complete(&self, channel_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .map(|p| p.complete)
            .unwrap_or(false)
    }

    /// Iterates over all checkpoints in channel id order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChannelProgress)> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Sum of retained messages across every channel in the ledger
    pub fn total_messages(&self) -> u64 {
        self.channels.values().map(|p| p.total_messages).sum()
    }

    /// Checks structural invariants of a freshly loaded ledger
    pub fn validate(&self) -> Result<(), IntegrityError> {
        for (channel_id, progress) in &self.channels {
            if channel_id.trim().is_empty() {
                return Err(IntegrityError::InvalidEntry {
                    channel_id: channel_id.clone(),
                    reason: "channel id is empty".to_string(),
                });
            }

            if let Some(oldest) = &progress.oldest_message_id {
                if oldest.is_empty() || !oldest.bytes().all(|c| c.is_ascii_digit()) {
                    return Err(IntegrityError::InvalidEntry {
                        channel_id: channel_id.clone(),
                        reason: format!("oldestMessageId {:?} is not a message id", oldest),
                    });
                }
            }

            if progress.oldest_message_id.is_none() && progress.total_messages > 0 {
                return Err(IntegrityError::InvalidEntry {
                    channel_id: channel_id.clone(),
                    reason: "messages were counted but no cursor was recorded".to_string(),
                });
            }
        }
        Ok(())
    }
}
