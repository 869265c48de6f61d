use crate::pacing::DelaySampler;
use std::time::Duration;
use tokio::time::Instant;

/// A wait chosen by the pacing logic after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Short jittered gap between requests
    Ordinary(Duration),

    /// Longer break taken every few requests
    Reading(Duration),
}

impl Pause {
    pub fn duration(&self) -> Duration {
        match self {
            Self::Ordinary(d) | Self::Reading(d) => *d,
        }
    }
}

/// In-memory state of one archiving session
///
/// Nothing here is persisted. The pacing counters live on this value rather
/// than in globals so the scheduler can be driven deterministically.
#[derive(Debug, Clone)]
pub struct SessionState {
    started: Instant,
    budget: Duration,

    /// Messages retained during this session
    pub messages_retained: u64,

    /// Requests made since the last reading pause
    pub requests_since_pause: u32,

    /// Request count at which the next reading pause is taken
    pub next_pause_at: u32,

    /// Ordinary delays still to be doubled after a rate limit
    pub slowdown_remaining: u32,
}

impl SessionState {
    /// Starts a session with the given time budget
    pub fn new<S: DelaySampler + ?Sized>(budget: Duration, sampler: &mut S) -> Self {
        Self {
            started: Instant::now(),
            budget,
            messages_retained: 0,
            requests_since_pause: 0,
            next_pause_at: sampler.reading_pause_interval(),
            slowdown_remaining: 0,
        }
    }

    /// Time since the session started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns true once the time budget has been used up
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Doubles the next `requests` ordinary delays
    pub fn start_slowdown(&mut self, requests: u32) {
        self.slowdown_remaining = requests;
    }

    /// Counts one request and decides how long to wait before the next
    ///
    /// When the request count reaches the pause threshold a reading pause is
    /// returned, the count resets and a new threshold is drawn. Otherwise an
    /// ordinary jittered delay is returned, doubled while a slowdown is active.
    pub fn next_pause<S: DelaySampler + ?Sized>(&mut self, sampler: &mut S) -> Pause {
        self.requests_since_pause += 1;

        if self.requests_since_pause >= self.next_pause_at {
            self.requests_since_pause = 0;
            self.next_pause_at = sampler.reading_pause_interval();
            return Pause::Reading(sampler.reading_pause_duration());
        }

        let mut delay = sampler.jittered_delay();
        if self.slowdown_remaining > 0 {
            delay *= 2;
            self.slowdown_remaining -= 1;
        }
        Pause::Ordinary(delay)
    }
}
