//! Slow-Scroll: a patient chat history archiver
//!
//! This crate walks the message history of a set of chat channels one page at a
//! time, pacing its requests like a person scrolling back through a channel,
//! and checkpoints its position after every page so an interrupted run resumes
//! exactly where it stopped.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod output;
pub mod pacing;
pub mod platform;
pub mod progress;
pub mod state;

use thiserror::Error;

/// Main error type for Slow-Scroll operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Progress ledger error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Message log error for channel {channel_id}: {source}")]
    Log {
        channel_id: String,
        source: std::io::Error,
    },

    #[error("Missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ArchiveError {
    /// Returns true if this error means the archive itself can no longer be trusted
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while loading or saving the progress ledger
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Failed to access progress ledger at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Progress ledger at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to serialize progress ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Checkpoint invariants that must never be violated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error(
        "oldest message pointer for channel {channel_id} moved forward: {previous} -> {proposed}"
    )]
    CursorRegression {
        channel_id: String,
        previous: String,
        proposed: String,
    },

    #[error("progress ledger entry {channel_id:?} is invalid: {reason}")]
    InvalidEntry { channel_id: String, reason: String },
}

/// Result type alias for progress ledger operations
pub type ProgressResult<T> = std::result::Result<T, ProgressError>;

// Re-export commonly used types
pub use config::Config;
pub use progress::{ChannelProgress, ProgressLedger, ProgressStore};
pub use state::{ChannelState, ChannelTarget};
