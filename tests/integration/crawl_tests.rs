//! Integration tests for archiving sessions
//!
//! These tests drive `run_session` against an in-memory channel history and
//! check what lands in the progress ledger and the message logs. The last
//! test runs the HTTP adapter against a wiremock server.

use chrono::{Duration as ChronoDuration, Utc};
use slow_scroll::archive::{MessageAuthor, MessageLog, MessageRecord};
use slow_scroll::config::{load_config, Config};
use slow_scroll::crawler::{crawl, run_session, StopReason};
use slow_scroll::pacing::DelaySampler;
use slow_scroll::platform::{FetchOutcome, PageFetcher};
use slow_scroll::progress::ProgressStore;
use slow_scroll::state::ChannelTarget;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct History {
    /// Newest first, per channel id
    messages: HashMap<String, Vec<MessageRecord>>,

    /// Outcomes returned before the history is consulted
    injected: HashMap<String, VecDeque<FetchOutcome>>,

    calls: Vec<(String, Option<String>)>,
}

/// Serves pages out of a fixed history the way the platform does
#[derive(Clone, Default)]
struct HistoryFetcher {
    inner: Arc<Mutex<History>>,
}

impl HistoryFetcher {
    /// Adds `count` messages to a channel, `spacing` apart, the newest posted
    /// one hour ago. Ids grow with recency.
    fn seed(&self, channel: &ChannelTarget, count: usize, spacing: ChronoDuration) {
        let now = Utc::now();
        let base: u64 = 1_000_000;
        let messages = (0..count)
            .map(|k| MessageRecord {
                id: (base + (count - k) as u64).to_string(),
                content: format!("message {} in {}", k, channel.channel_name),
                author: MessageAuthor {
                    id: "42".to_string(),
                    name: "reader".to_string(),
                },
                channel_id: channel.channel_id.clone(),
                server_id: channel.server_id.clone(),
                timestamp: now - ChronoDuration::hours(1) - spacing * k as i32,
                reaction_count: 0,
                reply_count: 0,
            })
            .collect();

        self.inner
            .lock()
            .unwrap()
            .messages
            .insert(channel.channel_id.clone(), messages);
    }

    fn inject(&self, channel_id: &str, outcome: FetchOutcome) {
        self.inner
            .lock()
            .unwrap()
            .injected
            .entry(channel_id.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn called_channels(&self) -> Vec<String> {
        self.calls().into_iter().map(|(id, _)| id).collect()
    }
}

impl PageFetcher for HistoryFetcher {
    async fn fetch_page(
        &self,
        channel: &ChannelTarget,
        before: Option<&str>,
        limit: u32,
    ) -> FetchOutcome {
        let mut history = self.inner.lock().unwrap();
        history
            .calls
            .push((channel.channel_id.clone(), before.map(str::to_string)));

        if let Some(outcome) = history
            .injected
            .get_mut(&channel.channel_id)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }

        let before: Option<u64> = before.map(|id| id.parse().unwrap());
        let page = history
            .messages
            .get(&channel.channel_id)
            .map(|all| {
                all.iter()
                    .filter(|m| before.map_or(true, |b| m.id.parse::<u64>().unwrap() < b))
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        FetchOutcome::Page(page)
    }
}

struct FixedSampler;

impl DelaySampler for FixedSampler {
    fn jittered_delay(&mut self) -> Duration {
        Duration::from_secs(5)
    }

    fn reading_pause_interval(&mut self) -> u32 {
        10
    }

    fn reading_pause_duration(&mut self) -> Duration {
        Duration::from_secs(30)
    }

    fn rate_limit_backoff(&mut self) -> Duration {
        Duration::from_secs(90)
    }
}

/// Writes a config with the given channel ids to `dir` and loads it
fn write_config(dir: &Path, channel_ids: &[&str], extra: &str) -> Config {
    let mut content = format!(
        r#"
[crawl]
page-size = 100
retention-days = 365

[output]
progress-path = '{}'
data-dir = '{}'
{}
"#,
        dir.join("progress.json").display(),
        dir.join("messages").display(),
        extra
    );

    for id in channel_ids {
        content.push_str(&format!(
            "\n[[channels]]\nserver-id = \"1\"\nchannel-id = \"{}\"\nname = \"chan-{}\"\n",
            id, id
        ));
    }

    let path = dir.join("slow-scroll.toml");
    std::fs::write(&path, content).unwrap();
    load_config(&path).unwrap()
}

fn target_for(config: &Config, channel_id: &str) -> ChannelTarget {
    config
        .targets()
        .into_iter()
        .find(|t| t.channel_id == channel_id)
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_retention_cutoff_ends_channel() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10"], "");
    let general = target_for(&config, "10");

    // 150 messages three days apart: the newest 122 are inside a year
    let fetcher = HistoryFetcher::default();
    fetcher.seed(&general, 150, ChronoDuration::days(3));

    let summary = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stop_reason, StopReason::AllComplete);
    assert_eq!(summary.stats.fetches, 2);
    assert_eq!(summary.session_messages, 122);
    assert_eq!(summary.channels_complete, 1);

    let ledger = ProgressStore::new(&config.output.progress_path)
        .load()
        .unwrap();
    let progress = ledger.get("10").unwrap();
    assert!(progress.complete);
    assert_eq!(progress.total_messages, 122);

    let log = MessageLog::new(&config.output.data_dir);
    let written = log.read_all(&general).unwrap();
    assert_eq!(written.len(), 122);

    let cutoff = Utc::now() - ChronoDuration::days(365);
    assert!(written.iter().all(|m| m.timestamp >= cutoff));
    assert_eq!(
        progress.oldest_message_id.as_deref(),
        written.last().map(|m| m.id.as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn test_resume_across_sessions() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10"], "");
    let general = target_for(&config, "10");

    let fetcher = HistoryFetcher::default();
    fetcher.seed(&general, 250, ChronoDuration::minutes(10));

    // One fetch, then the first pause outlasts the budget
    let first = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        Duration::from_secs(3),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(first.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(first.session_messages, 100);
    assert_eq!(first.channels_complete, 0);

    let cursor = ProgressStore::new(&config.output.progress_path)
        .load()
        .unwrap()
        .get("10")
        .and_then(|p| p.oldest_message_id.clone())
        .unwrap();

    let second = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(second.stop_reason, StopReason::AllComplete);
    assert_eq!(second.session_messages, 150);
    assert_eq!(second.total_messages, 250);

    // The second session picks up exactly where the first stopped
    let calls = fetcher.calls();
    assert_eq!(calls[0].1, None);
    assert_eq!(calls[1].1.as_deref(), Some(cursor.as_str()));

    // No message is written twice
    let written = MessageLog::new(&config.output.data_dir)
        .read_all(&general)
        .unwrap();
    let mut ids: Vec<_> = written.iter().map(|m| m.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 250);

    // A finished channel is never fetched again
    let fetches_so_far = fetcher.calls().len();
    let third = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(third.stop_reason, StopReason::AllComplete);
    assert_eq!(third.stats.fetches, 0);
    assert_eq!(fetcher.calls().len(), fetches_so_far);
}

#[tokio::test(start_paused = true)]
async fn test_round_robin_across_channels() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10", "11", "12"], "");

    let fetcher = HistoryFetcher::default();
    for id in ["10", "11", "12"] {
        fetcher.seed(&target_for(&config, id), 150, ChronoDuration::hours(1));
    }

    let summary = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stop_reason, StopReason::AllComplete);
    assert_eq!(summary.total_messages, 450);
    assert_eq!(
        fetcher.called_channels(),
        vec!["10", "11", "12", "10", "11", "12", "10", "11", "12"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_same_channel() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10", "11"], "");

    let fetcher = HistoryFetcher::default();
    fetcher.seed(&target_for(&config, "10"), 20, ChronoDuration::hours(1));
    fetcher.seed(&target_for(&config, "11"), 20, ChronoDuration::hours(1));
    fetcher.inject(
        "10",
        FetchOutcome::RateLimited {
            retry_after: Some(Duration::from_secs(120)),
        },
    );

    let summary = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stop_reason, StopReason::AllComplete);
    assert_eq!(summary.stats.rate_limits, 1);
    assert_eq!(summary.total_messages, 40);

    // The rejected request is repeated with the same cursor
    let calls = fetcher.calls();
    assert_eq!(calls[0], ("10".to_string(), None));
    assert_eq!(calls[1], ("10".to_string(), None));
    assert_eq!(calls[2].0, "11");

    // The server's retry-after is longer than the sampled backoff
    assert!(summary.elapsed >= Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_session_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10"], "");

    let fetcher = HistoryFetcher::default();
    fetcher.seed(&target_for(&config, "10"), 20, ChronoDuration::hours(1));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_session(&config, fetcher.clone(), FixedSampler, HOUR, cancel)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_ledger_stops_before_fetching() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &["10"], "");
    std::fs::write(&config.output.progress_path, "{ not json").unwrap();

    let fetcher = HistoryFetcher::default();
    fetcher.seed(&target_for(&config, "10"), 20, ChronoDuration::hours(1));

    let result = run_session(
        &config,
        fetcher.clone(),
        FixedSampler,
        HOUR,
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let now = Utc::now();

    let body = serde_json::json!([
        {
            "id": "1000000002",
            "content": "still here",
            "author": { "id": "42", "username": "reader", "global_name": "Reader" },
            "timestamp": (now - ChronoDuration::days(2)).to_rfc3339(),
            "reactions": [{ "count": 2 }, { "count": 1 }]
        },
        {
            "id": "1000000001",
            "content": "long gone",
            "author": { "id": "42", "username": "reader" },
            "timestamp": (now - ChronoDuration::days(400)).to_rfc3339()
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/channels/10/messages"))
        .and(query_param("limit", "100"))
        .and(header("authorization", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let token_env = "SLOW_SCROLL_INTEGRATION_TOKEN";
    std::env::set_var(token_env, "test-token");

    let platform = format!(
        "\n[platform]\napi-base = '{}'\ntoken-env = '{}'\n",
        mock_server.uri(),
        token_env
    );
    let config = write_config(dir.path(), &["10"], &platform);

    // The only page crosses the cutoff, so the session ends without pacing
    let summary = crawl(&config, HOUR, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::AllComplete);
    assert_eq!(summary.session_messages, 1);

    let written = MessageLog::new(&config.output.data_dir)
        .read_all(&target_for(&config, "10"))
        .unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id, "1000000002");
    assert_eq!(written[0].author.name, "Reader");
    assert_eq!(written[0].reaction_count, 3);
}
