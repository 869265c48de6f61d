//! Statistics generation from the progress ledger
//!
//! This module provides functionality for summarizing archive progress
//! without contacting the platform.

use crate::progress::ProgressLedger;
use crate::state::{ChannelState, ChannelTarget};
use chrono::{DateTime, Utc};

/// Progress of a single configured channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatistics {
    pub target: ChannelTarget,
    pub state: ChannelState,
    pub total_messages: u64,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Archive statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatistics {
    /// One entry per configured channel, in configuration order
    pub channels: Vec<ChannelStatistics>,

    /// Messages across every ledger entry, including channels no longer configured
    pub total_messages: u64,

    /// Ledger entries with no matching configured channel
    pub orphaned_entries: usize,
}

impl ArchiveStatistics {
    pub fn complete_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.state.is_terminal())
            .count()
    }
}

/// Builds statistics for `targets` from a loaded ledger
pub fn load_statistics(ledger: &ProgressLedger, targets: &[ChannelTarget]) -> ArchiveStatistics {
    let channels = targets
        .iter()
        .map(|target| {
            let progress = ledger.get_or_default(&target.channel_id);
            ChannelStatistics {
                target: target.clone(),
                state: ChannelState::from_progress(&progress),
                total_messages: progress.total_messages,
                last_fetched_at: progress.last_fetched_at,
            }
        })
        .collect();

    let orphaned_entries = ledger
        .iter()
        .filter(|(id, _)| !targets.iter().any(|t| &t.channel_id == *id))
        .count();

    ArchiveStatistics {
        channels,
        total_messages: ledger.total_messages(),
        orphaned_entries,
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Channels configured: {}", stats.channels.len());
    println!("  Channels complete: {}", stats.complete_count());
    println!("  Messages archived: {}", stats.total_messages);
    if stats.orphaned_entries > 0 {
        println!(
            "  Ledger entries for unconfigured channels: {}",
            stats.orphaned_entries
        );
    }
    println!();

    println!("Channels:");
    // Busiest channels first
    let mut channels: Vec<_> = stats.channels.iter().collect();
    channels.sort_by(|a, b| b.total_messages.cmp(&a.total_messages));

    for channel in channels {
        let last = channel
            .last_fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<32} {:>9} msgs  {:<8}  last fetched {}",
            channel.target.to_string(),
            channel.total_messages,
            channel.state,
            last
        );
    }
}
