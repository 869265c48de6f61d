//! Configuration module for Slow-Scroll
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use slow_scroll::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("slow-scroll.toml")).unwrap();
//! println!("Archiving {} channels", config.channels.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ChannelEntry, Config, CrawlConfig, OutputConfig, PacingConfig, PlatformConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
