//! Archive module for retained messages
//!
//! This module handles:
//! - The `MessageRecord` written for every retained message
//! - Per-channel append-only JSON-lines logs laid out as
//!   `{data_dir}/{server_id}/{channel_id}.jsonl`

mod log;
mod record;

pub use log::MessageLog;
pub use record::{MessageAuthor, MessageRecord};
