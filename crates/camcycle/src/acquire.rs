//! Feed acquisition over HTTP with ordered fallback sources.
//!
//! Candidate URLs are tried in order; the first success wins. Every request
//! carries no-cache headers so the feed is always fetched fresh. No per-URL
//! retries happen here — retry policy lives one layer up, in the caller.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};

use crate::parser;
use crate::types::{CameraList, FeedDefaults, FeedError, FeedResult};

/// Minimum plausible feed body length, in characters. Shorter responses are
/// treated as failures (error pages, empty proxies).
pub const MIN_BODY_CHARS: usize = 100;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP acquirer for the camera feed script.
#[derive(Debug, Clone)]
pub struct FeedAcquirer {
    client: reqwest::Client,
    sources: Vec<String>,
    min_body_chars: usize,
}

impl FeedAcquirer {
    /// Create an acquirer over the given candidate URLs with the default
    /// request timeout.
    pub fn new(sources: Vec<String>) -> Self {
        Self::with_timeout(sources, DEFAULT_TIMEOUT)
    }

    /// Create an acquirer with an explicit per-request timeout.
    pub fn with_timeout(sources: Vec<String>, timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .default_headers(headers)
            .user_agent(concat!("camcycle/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            sources,
            min_body_chars: MIN_BODY_CHARS,
        }
    }

    /// Override the minimum plausible body length (tests use tiny feeds).
    pub fn with_min_body_chars(mut self, min: usize) -> Self {
        self.min_body_chars = min;
        self
    }

    /// The candidate URLs, in attempt order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Fetch the raw feed text from the first source that answers with a
    /// success status and a plausibly long body.
    ///
    /// Per-URL failures are logged and converted into an attempt at the next
    /// candidate; only exhaustion of all candidates surfaces, as
    /// [`FeedError::FeedUnavailable`] carrying the last underlying cause.
    pub async fn fetch_feed_text(&self) -> FeedResult<String> {
        let mut last = FeedError::NoSources;

        for url in &self.sources {
            match self.try_source(url).await {
                Ok(body) => {
                    tracing::debug!("feed source {url} answered with {} characters", body.chars().count());
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!("feed source {url} failed: {e}");
                    last = e;
                }
            }
        }

        Err(FeedError::FeedUnavailable {
            attempts: self.sources.len(),
            last: Box::new(last),
        })
    }

    /// One GET against one candidate URL.
    async fn try_source(&self, url: &str) -> FeedResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FeedError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FeedError::Network {
                url: url.to_string(),
                source,
            })?;

        let len = body.chars().count();
        if len < self.min_body_chars {
            return Err(FeedError::TruncatedBody {
                url: url.to_string(),
                len,
                min: self.min_body_chars,
            });
        }

        Ok(body)
    }

    /// Fetch and parse in one step, producing a fresh camera list.
    pub async fn acquire(&self, defaults: &FeedDefaults) -> FeedResult<CameraList> {
        let text = self.fetch_feed_text().await?;
        parser::parse_feed(&text, defaults)
    }
}
