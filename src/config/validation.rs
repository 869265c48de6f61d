use crate::config::types::{
    ChannelEntry, Config, CrawlConfig, OutputConfig, PacingConfig, PlatformConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Longest supported retention window (about a century)
const MAX_RETENTION_DAYS: u32 = 36_500;

/// Longest supported ordinary delay between two requests, in seconds
const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_platform_config(&config.platform)?;
    validate_crawl_config(&config.crawl)?;
    validate_pacing_config(&config.pacing)?;
    validate_output_config(&config.output)?;
    validate_channels(&config.channels)?;
    Ok(())
}

/// Validates platform connection settings
fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "api-base must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.retention_days < 1 || config.retention_days > MAX_RETENTION_DAYS {
        return Err(ConfigError::Validation(format!(
            "retention-days must be between 1 and {}, got {}",
            MAX_RETENTION_DAYS, config.retention_days
        )));
    }

    if config.session_minutes < 1 {
        return Err(ConfigError::Validation(
            "session-minutes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates pacing bounds
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if !config.delay_stddev.is_finite() || config.delay_stddev < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-stddev must be a non-negative number, got {}",
            config.delay_stddev
        )));
    }

    if !config.delay_mean.is_finite() {
        return Err(ConfigError::Validation(
            "delay-mean must be a finite number".to_string(),
        ));
    }

    if !(config.delay_min >= 0.0 && config.delay_min <= config.delay_max) {
        return Err(ConfigError::Validation(format!(
            "delay-min ({}) must be >= 0 and <= delay-max ({})",
            config.delay_min, config.delay_max
        )));
    }

    if !config.delay_max.is_finite() || config.delay_max > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "delay-max must be at most {} seconds, got {}",
            MAX_DELAY_SECS, config.delay_max
        )));
    }

    if config.pause_every_min < 1 || config.pause_every_min > config.pause_every_max {
        return Err(ConfigError::Validation(format!(
            "pause-every-min ({}) must be >= 1 and <= pause-every-max ({})",
            config.pause_every_min, config.pause_every_max
        )));
    }

    check_range("pause", config.pause_min, config.pause_max)?;
    check_range("backoff", config.backoff_min, config.backoff_max)?;

    Ok(())
}

fn check_range(name: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{name}-min ({min}) must be <= {name}-max ({max})"
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "progress-path cannot be empty".to_string(),
        ));
    }

    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates channel entries
fn validate_channels(channels: &[ChannelEntry]) -> Result<(), ConfigError> {
    if channels.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[channels]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in channels {
        validate_snowflake("server-id", &entry.server_id)?;
        validate_snowflake("channel-id", &entry.channel_id)?;

        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Channel {} must have a name",
                entry.channel_id
            )));
        }

        if !seen.insert(entry.channel_id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Channel {} is listed more than once",
                entry.channel_id
            )));
        }
    }

    Ok(())
}

/// Validates a platform id: a non-empty string of ASCII digits
fn validate_snowflake(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "{} must be a numeric id, got '{}'",
            field, value
        )));
    }
    Ok(())
}
