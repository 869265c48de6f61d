use crate::crawler::{SessionSummary, StopReason};
use std::time::Duration;

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `3s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Prints the end-of-session summary to stdout
pub fn print_session_summary(summary: &SessionSummary) {
    let reason = match summary.stop_reason {
        StopReason::AllComplete => "all channels complete",
        StopReason::BudgetExhausted => "time budget reached",
        StopReason::Cancelled => "stopped by operator",
    };

    println!("\n=== Session Summary ===\n");
    println!("  Ended: {}", reason);
    println!("  Elapsed: {}", format_duration(summary.elapsed));
    println!("  Messages this session: {}", summary.session_messages);
    println!("  Messages all time: {}", summary.total_messages);
    println!(
        "  Channels complete: {} / {}",
        summary.channels_complete, summary.channels_total
    );
    println!(
        "  Requests: {} ({} rate limited, {} failed)",
        summary.stats.fetches, summary.stats.rate_limits, summary.stats.transient_errors
    );

    if summary.stats.stalled_completions > 0 {
        println!(
            "  WARNING: {} channel(s) were closed because a page did not move back in history",
            summary.stats.stalled_completions
        );
    }
}
