use crate::state::ChannelTarget;
use serde::Deserialize;

/// Main configuration structure for Slow-Scroll
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// Chat platform connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    /// Base URL of the REST API (e.g., "https://discord.com/api/v10")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the environment variable holding the authorization token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Messages requested per page (1..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Messages older than this many days are not retained
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Session length in minutes when none is given on the command line
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u64,
}

/// Request pacing bounds, all in seconds unless noted
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PacingConfig {
    #[serde(default = "default_delay_mean")]
    pub delay_mean: f64,

    #[serde(default = "default_delay_stddev")]
    pub delay_stddev: f64,

    #[serde(default = "default_delay_min")]
    pub delay_min: f64,

    #[serde(default = "default_delay_max")]
    pub delay_max: f64,

    /// Fewest requests between reading pauses
    #[serde(default = "default_pause_every_min")]
    pub pause_every_min: u32,

    /// Most requests between reading pauses
    #[serde(default = "default_pause_every_max")]
    pub pause_every_max: u32,

    #[serde(default = "default_pause_min")]
    pub pause_min: u64,

    #[serde(default = "default_pause_max")]
    pub pause_max: u64,

    #[serde(default = "default_backoff_min")]
    pub backoff_min: u64,

    #[serde(default = "default_backoff_max")]
    pub backoff_max: u64,

    /// Number of ordinary delays that are doubled after a rate limit
    #[serde(default = "default_slowdown_requests")]
    pub slowdown_requests: u32,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the JSON progress ledger
    #[serde(default = "default_progress_path")]
    pub progress_path: String,

    /// Root directory for per-channel message logs
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Config {
    /// Returns the configured channels as crawl targets, in file order
    pub fn targets(&self) -> Vec<ChannelTarget> {
        self.channels
            .iter()
            .map(|entry| ChannelTarget::new(&entry.server_id, &entry.channel_id, &entry.name))
            .collect()
    }
}

/// One channel to archive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelEntry {
    pub server_id: String,
    pub channel_id: String,
    pub name: String,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_token_env() -> String {
    "DISCORD_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_retention_days() -> u32 {
    365
}

fn default_session_minutes() -> u64 {
    45
}

fn default_delay_mean() -> f64 {
    5.0
}

fn default_delay_stddev() -> f64 {
    1.2
}

fn default_delay_min() -> f64 {
    3.0
}

fn default_delay_max() -> f64 {
    8.0
}

fn default_pause_every_min() -> u32 {
    8
}

fn default_pause_every_max() -> u32 {
    15
}

fn default_pause_min() -> u64 {
    15
}

fn default_pause_max() -> u64 {
    45
}

fn default_backoff_min() -> u64 {
    60
}

fn default_backoff_max() -> u64 {
    120
}

fn default_slowdown_requests() -> u32 {
    20
}

fn default_progress_path() -> String {
    "./data/progress.json".to_string()
}

fn default_data_dir() -> String {
    "./data/messages".to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            retention_days: default_retention_days(),
            session_minutes: default_session_minutes(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            delay_mean: default_delay_mean(),
            delay_stddev: default_delay_stddev(),
            delay_min: default_delay_min(),
            delay_max: default_delay_max(),
            pause_every_min: default_pause_every_min(),
            pause_every_max: default_pause_every_max(),
            pause_min: default_pause_min(),
            pause_max: default_pause_max(),
            backoff_min: default_backoff_min(),
            backoff_max: default_backoff_max(),
            slowdown_requests: default_slowdown_requests(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress_path: default_progress_path(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}
