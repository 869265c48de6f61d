/// Channel state definitions for tracking crawl progress
///
/// A channel cycles between `Pending` and `Fetching` until its history is
/// exhausted, after which it is `Complete` for good.
use crate::progress::ChannelProgress;
use std::fmt;

/// Represents where a channel is in the fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Never fetched, or more history remains
    Pending,

    /// One page request is in flight
    Fetching,

    /// Retention cutoff reached, history exhausted, or channel inaccessible
    Complete,
}

impl ChannelState {
    /// Derives the starting state of a channel from its persisted checkpoint
    pub fn from_progress(progress: &ChannelProgress) -> Self {
        if progress.complete {
            Self::Complete
        } else {
            Self::Pending
        }
    }

    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if the transition `self -> next` is allowed
    ///
    /// `Fetching` may return to `Pending` (more data, rate limit, transient
    /// error) or finish as `Complete`. Nothing leaves `Complete`.
    pub fn can_transition_to(&self, next: ChannelState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Pending)
                | (Self::Fetching, Self::Complete)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
