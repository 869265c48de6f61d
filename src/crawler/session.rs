//! Session runner: one time-boxed, cancellable archiving session
//!
//! Loads the ledger, builds the scheduler, runs it against a wall-clock budget
//! and reports what the session achieved.

use crate::archive::MessageLog;
use crate::config::Config;
use crate::crawler::scheduler::{CrawlStats, Scheduler, SchedulerSettings, StopReason};
use crate::pacing::{DelaySampler, SessionState};
use crate::platform::PageFetcher;
use crate::progress::ProgressStore;
use crate::ArchiveError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one archiving session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Wall-clock time the session ran for
    pub elapsed: Duration,

    /// Messages retained during this session
    pub session_messages: u64,

    /// Messages retained across every session so far
    pub total_messages: u64,

    pub channels_complete: usize,
    pub channels_total: usize,
    pub stop_reason: StopReason,
    pub stats: CrawlStats,
}

/// Runs one session with the given fetcher and sampler
///
/// Fails before any fetch if the progress ledger cannot be loaded. Once the
/// loop is running, only ledger/log write failures and integrity violations
/// end the session with an error.
pub async fn run_session<F: PageFetcher, S: DelaySampler>(
    config: &Config,
    fetcher: F,
    mut sampler: S,
    budget: Duration,
    cancel: CancellationToken,
) -> Result<SessionSummary, ArchiveError> {
    let store = ProgressStore::new(&config.output.progress_path);
    let ledger = store.load()?;
    let log = MessageLog::new(&config.output.data_dir);

    let mut session = SessionState::new(budget, &mut sampler);
    let mut scheduler = Scheduler::new(
        config.targets(),
        ledger,
        store,
        log,
        fetcher,
        sampler,
        SchedulerSettings::from_config(config),
    );

    let (complete, total) = scheduler.channel_counts();
    tracing::info!(
        "Session started: {} of {} channels already complete, budget {} min",
        complete,
        total,
        budget.as_secs() / 60
    );

    let stop_reason = scheduler.run(&mut session, &cancel).await?;

    let (channels_complete, channels_total) = scheduler.channel_counts();
    Ok(SessionSummary {
        elapsed: session.elapsed(),
        session_messages: session.messages_retained,
        total_messages: scheduler.ledger().total_messages(),
        channels_complete,
        channels_total,
        stop_reason,
        stats: scheduler.stats().clone(),
    })
}
