//! Progress module for durable crawl checkpoints
//!
//! This module handles:
//! - The per-channel checkpoint (`ChannelProgress`) and its invariants
//! - The full ledger of checkpoints keyed by channel id
//! - Loading and atomically saving the ledger as a single JSON document

mod ledger;
mod store;

pub use ledger::{compare_message_ids, ChannelProgress, ProgressLedger};
pub use store::ProgressStore;
