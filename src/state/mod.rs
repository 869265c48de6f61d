//! State module for tracking crawl progress
//!
//! This module provides the in-memory view of each channel during a session.
//!
//! # Components
//!
//! - `ChannelTarget`: Identifies one crawlable channel from configuration
//! - `ChannelState`: Tracks where a channel is in the fetch cycle (pending, fetching, complete)

mod channel_state;
mod target;

// Re-export main types
pub use channel_state::ChannelState;
pub use target::ChannelTarget;
