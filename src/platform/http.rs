//! HTTP page fetcher
//!
//! Talks to a Discord-style REST API:
//! `GET {api_base}/channels/{channel_id}/messages?limit=N&before=ID`
//!
//! # Response mapping
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 2xx with message array | Page (sorted newest first) |
//! | HTTP 429 | RateLimited (with `retry_after` if present) |
//! | HTTP 403 / 404 | Inaccessible |
//! | Other status, timeout, connection error, bad JSON | Failed |

use crate::archive::{MessageAuthor, MessageRecord};
use crate::config::PlatformConfig;
use crate::platform::{FetchOutcome, PageFetcher};
use crate::progress::compare_message_ids;
use crate::state::ChannelTarget;
use crate::ArchiveError;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Builds an HTTP client with the configured user agent and timeouts
pub fn build_http_client(config: &PlatformConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by the platform's REST API
pub struct HttpPageFetcher {
    client: Client,
    api_base: String,
    token: String,
}

impl HttpPageFetcher {
    /// Creates a fetcher from an existing client
    pub fn new(client: Client, api_base: &str, token: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Creates a fetcher from configuration, reading the token from the
    /// environment variable named by `token-env`
    pub fn from_config(config: &PlatformConfig) -> Result<Self, ArchiveError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ArchiveError::MissingCredentials(config.token_env.clone()))?;

        let client = build_http_client(config)?;
        Ok(Self::new(client, &config.api_base, token.trim()))
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        channel: &ChannelTarget,
        before: Option<&str>,
        limit: u32,
    ) -> FetchOutcome {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }

        let response = match self
            .client
            .get(self.messages_url(&channel.channel_id))
            .header(AUTHORIZATION, self.token.as_str())
            .query(&query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_wait = retry_after_header(response.headers());
            let body_wait = response
                .json::<RateLimitBody>()
                .await
                .ok()
                .and_then(|b| b.retry_after)
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64);
            return FetchOutcome::RateLimited {
                retry_after: body_wait.or(header_wait),
            };
        }

        if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
            return FetchOutcome::Inaccessible {
                reason: format!("HTTP {}", status.as_u16()),
            };
        }

        if !status.is_success() {
            return FetchOutcome::Failed {
                error: format!("HTTP {}", status.as_u16()),
            };
        }

        match response.json::<Vec<WireMessage>>().await {
            Ok(messages) => {
                let mut records: Vec<MessageRecord> = messages
                    .into_iter()
                    .map(|m| m.into_record(channel))
                    .collect();
                records.sort_by(|a, b| compare_message_ids(&b.id, &a.id));
                FetchOutcome::Page(records)
            }
            Err(e) => FetchOutcome::Failed {
                error: format!("Failed to decode messages: {}", e),
            },
        }
    }
}

fn classify_transport_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::Failed {
            error: "Request timeout".to_string(),
        }
    } else if e.is_connect() {
        FetchOutcome::Failed {
            error: format!("Connection failed: {}", e),
        }
    } else {
        FetchOutcome::Failed {
            error: e.to_string(),
        }
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: WireAuthor,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    reactions: Vec<WireReaction>,
    #[serde(default)]
    thread: Option<WireThread>,
}

#[derive(Debug, Deserialize)]
struct WireAuthor {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireReaction {
    #[serde(default)]
    count: u32,
}

#[derive(Debug, Deserialize)]
struct WireThread {
    #[serde(default)]
    message_count: u32,
}

impl WireMessage {
    fn into_record(self, channel: &ChannelTarget) -> MessageRecord {
        MessageRecord {
            id: self.id,
            content: self.content,
            author: MessageAuthor {
                id: self.author.id,
                name: self.author.global_name.unwrap_or(self.author.username),
            },
            channel_id: channel.channel_id.clone(),
            server_id: channel.server_id.clone(),
            timestamp: self.timestamp,
            reaction_count: self.reactions.iter().map(|r| r.count).sum(),
            reply_count: self.thread.map(|t| t.message_count).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel() -> ChannelTarget {
        ChannelTarget::new("10", "20", "general")
    }

    fn fetcher(server: &MockServer) -> HttpPageFetcher {
        let client = build_http_client(&PlatformConfig::default()).unwrap();
        HttpPageFetcher::new(client, &server.uri(), "secret-token")
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&PlatformConfig::default()).is_ok());
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = PlatformConfig {
            token_env: "SLOW_SCROLL_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..PlatformConfig::default()
        };
        assert!(matches!(
            HttpPageFetcher::from_config(&config),
            Err(ArchiveError::MissingCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_page_is_mapped_and_sorted_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/20/messages"))
            .and(query_param("limit", "100"))
            .and(query_param("before", "500"))
            .and(header("authorization", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "300",
                    "content": "older",
                    "author": { "id": "7", "username": "ana" },
                    "timestamp": "2026-09-01T10:00:00.000000+00:00"
                },
                {
                    "id": "400",
                    "content": "newer",
                    "author": { "id": "8", "username": "bo", "global_name": "Bo" },
                    "timestamp": "2026-09-02T10:00:00.000000+00:00",
                    "reactions": [ { "count": 2 }, { "count": 3 } ],
                    "thread": { "message_count": 4 }
                }
            ])))
            .mount(&server)
            .await;

        let outcome = fetcher(&server)
            .fetch_page(&channel(), Some("500"), 100)
            .await;

        let FetchOutcome::Page(records) = outcome else {
            panic!("expected a page, got {:?}", outcome);
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "400");
        assert_eq!(records[0].author.name, "Bo");
        assert_eq!(records[0].reaction_count, 5);
        assert_eq!(records[0].reply_count, 4);
        assert_eq!(records[0].server_id, "10");
        assert_eq!(records[1].id, "300");
        assert_eq!(records[1].author.name, "ana");
    }

    #[tokio::test]
    async fn test_rate_limit_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({ "message": "You are being rate limited.", "retry_after": 2.5, "global": false })),
            )
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_page(&channel(), None, 100).await;
        assert_eq!(
            outcome,
            FetchOutcome::RateLimited {
                retry_after: Some(Duration::from_secs_f64(2.5))
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limit_header_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_page(&channel(), None, 100).await;
        assert_eq!(
            outcome,
            FetchOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[tokio::test]
    async fn test_forbidden_and_missing_are_inaccessible() {
        for status in [403, 404] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let outcome = fetcher(&server).fetch_page(&channel(), None, 100).await;
            assert!(
                matches!(outcome, FetchOutcome::Inaccessible { .. }),
                "status {} gave {:?}",
                status,
                outcome
            );
        }
    }

    #[tokio::test]
    async fn test_server_error_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_page(&channel(), None, 100).await;
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_bad_payload_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let outcome = fetcher(&server).fetch_page(&channel(), None, 100).await;
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    }
}
