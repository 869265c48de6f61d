//! Platform module: the boundary to the chat service
//!
//! This module handles:
//! - The `PageFetcher` capability the scheduler depends on
//! - Normalizing every platform response into a `FetchOutcome`
//! - The HTTP implementation against a Discord-style REST API

mod fetcher;
mod http;

pub use fetcher::{FetchOutcome, PageFetcher};
pub use http::{build_http_client, HttpPageFetcher};
