use std::fmt;

/// Identifies one crawlable channel
///
/// Targets come from the static channel list and never change during a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelTarget {
    /// Server (guild) the channel belongs to
    pub server_id: String,

    /// Channel id, also the key into the progress ledger
    pub channel_id: String,

    /// Human-readable channel name, used for logging only
    pub channel_name: String,
}

impl ChannelTarget {
    /// Creates a new channel target
    pub fn new(server_id: &str, channel_id: &str, channel_name: &str) -> Self {
        Self {
            server_id: server_id.to_string(),
            channel_id: channel_id.to_string(),
            channel_name: channel_name.to_string(),
        }
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.channel_name, self.channel_id)
    }
}
