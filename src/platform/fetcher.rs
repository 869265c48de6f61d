use crate::archive::MessageRecord;
use crate::state::ChannelTarget;
use std::future::Future;
use std::time::Duration;

/// Result of asking the platform for one page of history
///
/// Adapters map every transport-specific failure onto one of these variants,
/// so the scheduler never inspects HTTP status codes or error shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Up to `limit` messages, newest first; empty when history is exhausted
    Page(Vec<MessageRecord>),

    /// The platform rejected the request for rate limiting
    RateLimited {
        /// Wait requested by the platform, if it sent one
        retry_after: Option<Duration>,
    },

    /// The channel is gone or no longer readable
    Inaccessible {
        reason: String,
    },

    /// Anything else (network trouble, server errors, undecodable payloads)
    Failed {
        error: String,
    },
}

/// Capability to fetch a page of message history
pub trait PageFetcher {
    /// Fetches up to `limit` messages older than `before`, or the most recent
    /// messages when `before` is `None`
    fn fetch_page(
        &self,
        channel: &ChannelTarget,
        before: Option<&str>,
        limit: u32,
    ) -> impl Future<Output = FetchOutcome> + Send;
}
