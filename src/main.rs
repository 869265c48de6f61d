//! Slow-Scroll main entry point
//!
//! This is the command-line interface for the Slow-Scroll history archiver.

use clap::Parser;
use slow_scroll::config::{load_config_with_hash, Config};
use slow_scroll::crawler::{crawl, install_signal_handler};
use slow_scroll::output::{load_statistics, print_session_summary, print_statistics};
use slow_scroll::progress::ProgressStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Slow-Scroll: a patient chat history archiver
///
/// Slow-Scroll walks back through the history of the configured channels one
/// page at a time, pausing between requests like a person reading, and
/// checkpoints after every page so the next session picks up where this one
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "slow-scroll")]
#[command(version = "1.0.0")]
#[command(about = "A patient chat history archiver", long_about = None)]
struct Cli {
    /// Session length in minutes (defaults to the config value, 45 if unset)
    #[arg(value_name = "MINUTES")]
    minutes: Option<u64>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "slow-scroll.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be archived without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show archive statistics from the progress ledger and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        let minutes = cli.minutes.unwrap_or(config.crawl.session_minutes);
        handle_archive(&config, minutes).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("slow_scroll=info,warn"),
            1 => EnvFilter::new("slow_scroll=debug,info"),
            2 => EnvFilter::new("slow_scroll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be archived
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Slow-Scroll Dry Run ===\n");

    println!("Platform:");
    println!("  API base: {}", config.platform.api_base);
    println!(
        "  Token variable: {} ({})",
        config.platform.token_env,
        if std::env::var(&config.platform.token_env).is_ok() {
            "set"
        } else {
            "NOT SET"
        }
    );

    println!("\nCrawl:");
    println!("  Page size: {}", config.crawl.page_size);
    println!("  Retention: {} days", config.crawl.retention_days);
    println!("  Default session: {} min", config.crawl.session_minutes);

    println!("\nPacing:");
    println!(
        "  Delay: mean {}s, stddev {}s, clamped to {}-{}s",
        config.pacing.delay_mean,
        config.pacing.delay_stddev,
        config.pacing.delay_min,
        config.pacing.delay_max
    );
    println!(
        "  Reading pause: {}-{}s every {}-{} requests",
        config.pacing.pause_min,
        config.pacing.pause_max,
        config.pacing.pause_every_min,
        config.pacing.pause_every_max
    );

    println!("\nOutput:");
    println!("  Progress ledger: {}", config.output.progress_path);
    println!("  Message logs: {}", config.output.data_dir);

    let ledger = ProgressStore::new(&config.output.progress_path).load()?;
    let stats = load_statistics(&ledger, &config.targets());

    println!("\nChannels ({}):", stats.channels.len());
    for channel in &stats.channels {
        println!(
            "  - {} [{}] {} messages so far",
            channel.target, channel.state, channel.total_messages
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would archive {} of {} channels",
        stats.channels.len() - stats.complete_count(),
        stats.channels.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the progress ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = ProgressStore::new(&config.output.progress_path);
    println!("Progress ledger: {}\n", store.path().display());

    let ledger = store.load()?;
    let stats = load_statistics(&ledger, &config.targets());
    print_statistics(&stats);

    Ok(())
}

/// Handles the main archiving session
async fn handle_archive(config: &Config, minutes: u64) -> anyhow::Result<()> {
    tracing::info!(
        "Archiving {} channels for up to {} minutes",
        config.channels.len(),
        minutes
    );

    let cancel = install_signal_handler();
    let budget = Duration::from_secs(minutes.saturating_mul(60));

    match crawl(config, budget, cancel).await {
        Ok(summary) => {
            print_session_summary(&summary);
            Ok(())
        }
        Err(e) => {
            if e.is_integrity_violation() {
                tracing::error!("Archive integrity violation, stopping: {}", e);
            } else {
                tracing::error!("Session failed: {}", e);
            }
            Err(e.into())
        }
    }
}
