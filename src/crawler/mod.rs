//! Crawler module for archiving channel history
//!
//! This module contains the core crawling logic, including:
//! - Round-robin channel scheduling with human-paced delays
//! - Page interpretation against the retention cutoff
//! - Rate-limit backoff and slowdown
//! - Time-boxed, cancellable sessions

mod scheduler;
mod session;
mod shutdown;

pub use scheduler::{
    retention_cutoff, split_page, CrawlStats, PageSplit, Scheduler, SchedulerSettings, StopReason,
};
pub use session::{run_session, SessionSummary};
pub use shutdown::install_signal_handler;

use crate::config::Config;
use crate::pacing::RandomDelaySampler;
use crate::platform::HttpPageFetcher;
use crate::ArchiveError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs a complete archiving session against the live platform
///
/// This is the main entry point. It will:
/// 1. Read the API token from the configured environment variable
/// 2. Load the progress ledger
/// 3. Fetch pages round-robin across incomplete channels until the budget
///    runs out, `cancel` fires, or every channel is complete
///
/// # Arguments
///
/// * `config` - The archiver configuration
/// * `budget` - Wall-clock length of the session
/// * `cancel` - Token that stops the session between pages
///
/// # Returns
///
/// * `Ok(SessionSummary)` - Session ended normally
/// * `Err(ArchiveError)` - Startup failed or an integrity violation stopped the session
pub async fn crawl(
    config: &Config,
    budget: Duration,
    cancel: CancellationToken,
) -> Result<SessionSummary, ArchiveError> {
    let fetcher = HttpPageFetcher::from_config(&config.platform)?;
    let sampler = RandomDelaySampler::from_config(config.pacing.clone());
    run_session(config, fetcher, sampler, budget, cancel).await
}
