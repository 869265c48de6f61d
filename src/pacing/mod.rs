//! Pacing module for human-looking request timing
//!
//! This module handles:
//! - Sampling jittered inter-request delays, reading pauses and backoffs
//! - Per-session pacing counters (pause countdown, post-rate-limit slowdown)
//!
//! Timing is never uniform: ordinary delays are a clamped gaussian, and every
//! few requests a longer reading pause is taken.

mod sampler;
mod session;

pub use sampler::{jittered_delay, DelaySampler, RandomDelaySampler};
pub use session::{Pause, SessionState};
