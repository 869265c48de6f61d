//! Output module for session reports
//!
//! This module handles:
//! - Printing the end-of-session summary
//! - Computing and printing archive statistics from the progress ledger

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, ArchiveStatistics, ChannelStatistics};
pub use summary::{format_duration, print_session_summary};
