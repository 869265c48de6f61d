//! Crawl scheduler: channel selection, page interpretation and pacing
//!
//! This module handles:
//! - Round-robin selection over channels that are not yet complete
//! - Issuing exactly one page fetch per iteration
//! - Applying the retention cutoff and detecting exhausted channels
//! - Persisting each page (message log first, then the ledger)
//! - Reading pauses, jittered delays and rate-limit backoff

use crate::archive::{MessageLog, MessageRecord};
use crate::config::Config;
use crate::pacing::{DelaySampler, SessionState};
use crate::platform::{FetchOutcome, PageFetcher};
use crate::progress::{compare_message_ids, ChannelProgress, ProgressLedger, ProgressStore};
use crate::state::{ChannelState, ChannelTarget};
use crate::{ArchiveError, IntegrityError};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tunables the scheduler needs from configuration
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Messages requested per page
    pub page_size: u32,

    /// Messages older than `now - retention` are discarded
    pub retention: chrono::Duration,

    /// Ordinary delays doubled after a rate limit
    pub slowdown_requests: u32,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.crawl.page_size,
            retention: chrono::Duration::days(i64::from(config.crawl.retention_days)),
            slowdown_requests: config.pacing.slowdown_requests,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            retention: chrono::Duration::days(365),
            slowdown_requests: 20,
        }
    }
}

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every channel is complete
    AllComplete,

    /// The session time budget ran out
    BudgetExhausted,

    /// The operator asked the session to stop
    Cancelled,
}

/// Counters collected over one scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub fetches: u64,
    pub rate_limits: u64,
    pub transient_errors: u64,
    pub channels_completed: u64,

    /// Channels completed because a page did not move the cursor back
    pub stalled_completions: u64,
}

/// The messages kept from one page, and what the page says about the channel
#[derive(Debug, Clone, PartialEq)]
pub struct PageSplit {
    /// Messages at or after the cutoff, in page order
    pub retained: Vec<MessageRecord>,

    /// Oldest retained message (id, timestamp)
    pub oldest: Option<(String, DateTime<Utc>)>,

    /// At least one message was older than the cutoff
    pub cutoff_hit: bool,
}

/// Earliest timestamp still inside the retention window
///
/// A window reaching past the start of representable time keeps everything.
pub fn retention_cutoff(now: DateTime<Utc>, retention: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Splits a page into retained messages and those older than `cutoff`
pub fn split_page(messages: Vec<MessageRecord>, cutoff: DateTime<Utc>) -> PageSplit {
    let mut retained = Vec::with_capacity(messages.len());
    let mut oldest: Option<(String, DateTime<Utc>)> = None;
    let mut cutoff_hit = false;

    for message in messages {
        if message.is_older_than(cutoff) {
            cutoff_hit = true;
            continue;
        }

        let is_oldest = match &oldest {
            None => true,
            Some((id, at)) => {
                message.timestamp < *at
                    || (message.timestamp == *at
                        && compare_message_ids(&message.id, id) == Ordering::Less)
            }
        };
        if is_oldest {
            oldest = Some((message.id.clone(), message.timestamp));
        }
        retained.push(message);
    }

    PageSplit {
        retained,
        oldest,
        cutoff_hit,
    }
}

/// What the loop should do after one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Apply ordinary pacing and move on to the next channel
    Paced,

    /// Back off for the given time and retry the same channel
    RateLimited(Duration),
}

/// Drives the crawl, one page per iteration
pub struct Scheduler<F, S> {
    /// Stable channel order; selection walks this list
    targets: Vec<ChannelTarget>,

    /// State of each target, parallel to `targets`
    states: Vec<ChannelState>,

    /// Position in `targets` where the next search for an active channel starts
    cursor: usize,

    ledger: ProgressLedger,
    store: ProgressStore,
    log: MessageLog,
    fetcher: F,
    sampler: S,
    settings: SchedulerSettings,
    stats: CrawlStats,
}

impl<F: PageFetcher, S: DelaySampler> Scheduler<F, S> {
    /// Creates a scheduler over `targets`, resuming from `ledger`
    ///
    /// Channels already marked complete in the ledger start as `Complete` and
    /// are never fetched.
    pub fn new(
        targets: Vec<ChannelTarget>,
        ledger: ProgressLedger,
        store: ProgressStore,
        log: MessageLog,
        fetcher: F,
        sampler: S,
        settings: SchedulerSettings,
    ) -> Self {
        let states = targets
            .iter()
            .map(|t| ChannelState::from_progress(&ledger.get_or_default(&t.channel_id)))
            .collect();

        Self {
            targets,
            states,
            cursor: 0,
            ledger,
            store,
            log,
            fetcher,
            sampler,
            settings,
            stats: CrawlStats::default(),
        }
    }

    /// Current in-memory ledger (identical to what was last persisted)
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn state_of(&self, channel_id: &str) -> Option<ChannelState> {
        self.targets
            .iter()
            .position(|t| t.channel_id == channel_id)
            .map(|i| self.states[i])
    }

    /// Returns (complete, total) channel counts
    pub fn channel_counts(&self) -> (usize, usize) {
        let complete = self.states.iter().filter(|s| s.is_terminal()).count();
        (complete, self.targets.len())
    }

    /// Index of the next channel to fetch, or `None` if all are complete
    ///
    /// Starts at the cursor and walks the stable target list, skipping
    /// complete channels. Membership is recomputed on every call, so channels
    /// that complete mid-pass drop out without shifting anyone else's turn.
    pub fn next_channel(&self) -> Option<usize> {
        let n = self.targets.len();
        (0..n)
            .map(|offset| (self.cursor + offset) % n)
            .find(|&i| !self.states[i].is_terminal())
    }

    /// Runs the crawl loop until the budget is spent, `cancel` fires, or every
    /// channel is complete
    ///
    /// Cancellation is observed between iterations and while pacing; a fetch
    /// that has started always runs to completion and is persisted.
    pub async fn run(
        &mut self,
        session: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<StopReason, ArchiveError> {
        loop {
            if cancel.is_cancelled() {
                tracing::info!("Stop requested, ending session");
                return Ok(StopReason::Cancelled);
            }

            if session.is_expired() {
                tracing::info!("Session time budget exhausted");
                return Ok(StopReason::BudgetExhausted);
            }

            let Some(index) = self.next_channel() else {
                tracing::info!("All channels complete");
                return Ok(StopReason::AllComplete);
            };

            match self.crawl_channel(index, session).await? {
                Step::RateLimited(backoff) => {
                    tracing::warn!(
                        "Rate limited, backing off for {:.0}s and slowing down for the next {} requests",
                        backoff.as_secs_f64(),
                        self.settings.slowdown_requests
                    );
                    session.start_slowdown(self.settings.slowdown_requests);
                    pause_unless_cancelled(backoff, cancel).await;
                }
                Step::Paced => {
                    self.cursor = (index + 1) % self.targets.len();

                    if self.next_channel().is_none() {
                        continue;
                    }

                    let pause = session.next_pause(&mut self.sampler);
                    tracing::debug!("Pausing {:?}", pause);
                    pause_unless_cancelled(pause.duration(), cancel).await;
                }
            }
        }
    }

    /// Fetches and processes one page for the channel at `index`
    async fn crawl_channel(
        &mut self,
        index: usize,
        session: &mut SessionState,
    ) -> Result<Step, ArchiveError> {
        let target = self.targets[index].clone();
        let progress = self.ledger.get_or_default(&target.channel_id);

        self.transition(index, ChannelState::Fetching);
        self.stats.fetches += 1;

        tracing::debug!(
            channel = %target.channel_name,
            channel_id = %target.channel_id,
            before = ?progress.oldest_message_id,
            "Fetching page"
        );

        let outcome = self
            .fetcher
            .fetch_page(
                &target,
                progress.oldest_message_id.as_deref(),
                self.settings.page_size,
            )
            .await;

        match outcome {
            FetchOutcome::Page(messages) if messages.is_empty() => {
                tracing::info!(
                    channel = %target.channel_name,
                    "No more messages, channel complete ({} archived)",
                    progress.total_messages
                );
                self.complete_channel(index, progress)?;
            }

            FetchOutcome::Page(messages) => {
                self.process_page(index, &target, progress, messages, session)?;
            }

            FetchOutcome::Inaccessible { reason } => {
                tracing::warn!(
                    channel = %target.channel_name,
                    channel_id = %target.channel_id,
                    "Channel inaccessible ({}), marking complete",
                    reason
                );
                self.complete_channel(index, progress)?;
            }

            FetchOutcome::RateLimited { retry_after } => {
                self.stats.rate_limits += 1;
                self.transition(index, ChannelState::Pending);

                let backoff = self.sampler.rate_limit_backoff();
                let backoff = retry_after.map_or(backoff, |server| backoff.max(server));
                return Ok(Step::RateLimited(backoff));
            }

            FetchOutcome::Failed { error } => {
                self.stats.transient_errors += 1;
                tracing::warn!(
                    channel = %target.channel_name,
                    channel_id = %target.channel_id,
                    "Fetch failed, will retry next round: {}",
                    error
                );
                self.transition(index, ChannelState::Pending);
            }
        }

        Ok(Step::Paced)
    }

    /// Applies the retention cutoff to a non-empty page and persists the result
    fn process_page(
        &mut self,
        index: usize,
        target: &ChannelTarget,
        mut progress: ChannelProgress,
        messages: Vec<MessageRecord>,
        session: &mut SessionState,
    ) -> Result<(), ArchiveError> {
        let now = Utc::now();
        let cutoff = retention_cutoff(now, self.settings.retention);
        let page_len = messages.len();
        let split = split_page(messages, cutoff);
        let new_oldest = split.oldest.as_ref().map(|(id, _)| id.as_str());

        let advanced = match (new_oldest, progress.oldest_message_id.as_deref()) {
            (Some(new), Some(previous)) => match compare_message_ids(new, previous) {
                Ordering::Less => true,
                Ordering::Equal => false,
                Ordering::Greater => {
                    return Err(IntegrityError::CursorRegression {
                        channel_id: target.channel_id.clone(),
                        previous: previous.to_string(),
                        proposed: new.to_string(),
                    }
                    .into());
                }
            },
            (Some(_), None) => true,
            (None, _) => false,
        };

        let complete = if split.cutoff_hit {
            true
        } else if !advanced {
            self.stats.stalled_completions += 1;
            tracing::error!(
                channel = %target.channel_name,
                channel_id = %target.channel_id,
                occurrences = self.stats.stalled_completions,
                "Page of {} messages did not move the cursor back; marking channel complete. \
                 The platform adapter may be returning pages out of order",
                page_len
            );
            true
        } else {
            false
        };

        let retained = split.retained.len() as u64;

        // Log before ledger: a crash in between re-fetches the page, never skips it
        self.log.append(target, &split.retained)?;

        progress.record_page(&target.channel_id, new_oldest, retained, complete, now)?;
        self.ledger.insert(&target.channel_id, progress);
        self.store.save(&self.ledger)?;

        session.messages_retained += retained;

        if complete {
            self.transition(index, ChannelState::Complete);
            self.stats.channels_completed += 1;
            tracing::info!(
                channel = %target.channel_name,
                "Channel complete: retained {} of {} messages on final page",
                retained,
                page_len
            );
        } else {
            self.transition(index, ChannelState::Pending);
            tracing::info!(
                channel = %target.channel_name,
                "Archived {} messages (oldest {})",
                retained,
                split
                    .oldest
                    .as_ref()
                    .map(|(_, at)| at.to_rfc3339())
                    .unwrap_or_default()
            );
        }

        Ok(())
    }

    /// Marks a channel complete without new messages and persists the ledger
    fn complete_channel(
        &mut self,
        index: usize,
        mut progress: ChannelProgress,
    ) -> Result<(), ArchiveError> {
        let channel_id = self.targets[index].channel_id.clone();
        progress.mark_complete(Utc::now());
        self.ledger.insert(&channel_id, progress);
        self.store.save(&self.ledger)?;

        self.transition(index, ChannelState::Complete);
        self.stats.channels_completed += 1;
        Ok(())
    }

    fn transition(&mut self, index: usize, next: ChannelState) {
        let current = self.states[index];
        debug_assert!(
            current.can_transition_to(next),
            "invalid channel transition {} -> {}",
            current,
            next
        );
        tracing::trace!(
            channel_id = %self.targets[index].channel_id,
            "{} -> {}",
            current,
            next
        );
        self.states[index] = next;
    }
}

/// Sleeps for `duration`, returning early if `cancel` fires
async fn pause_unless_cancelled(duration: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {
            tracing::debug!("Pause interrupted by stop request");
        }
    }
}
