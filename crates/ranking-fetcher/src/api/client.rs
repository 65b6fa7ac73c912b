//! Ranking endpoint client with retry logic.

use super::retry::RetryPolicy;
use super::types::{RankingEnvelope, RankingPage};
use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use shared::FetcherConfig;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Outcome of fetching one page, produced once the retry loop concludes
#[derive(Debug)]
pub enum PageResult {
    /// HTTP 200 with a well-formed envelope
    Success(RankingPage),
    /// HTTP 404: the page holds no data; never retried
    NotFound,
    /// Retries exhausted; carries the last error observed
    Failed(FetchError),
}

/// A single failed fetch attempt
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx response status
    #[error("HTTP status {0}")]
    Status(StatusCode),

    /// Timeout, connection, or read failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not a well-formed ranking envelope
    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl FetchError {
    /// True when the server explicitly said the page does not exist
    fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(status) if *status == StatusCode::NOT_FOUND)
    }
}

/// Ranking feed client
///
/// Cheap to clone; clones share the underlying connection pool, so the
/// worker pool's width also bounds simultaneous connections.
#[derive(Debug, Clone)]
pub struct RankingClient {
    /// HTTP client
    client: Client,
    /// Ranking endpoint URL
    base_url: String,
    /// Records requested per page
    per_page: u32,
    /// Retry policy applied to each page
    retry: RetryPolicy,
}

impl RankingClient {
    /// Create a new ranking client
    pub fn new(config: &FetcherConfig, retry: RetryPolicy) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            per_page: config.per_page,
            retry,
        })
    }

    /// Fetch one page, retrying transient failures
    ///
    /// Every failure is folded into the returned variant; whether a failed
    /// page is fatal is the caller's decision.
    pub async fn fetch_page(&self, page: u32) -> PageResult {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.try_fetch(page).await {
                Ok(payload) => {
                    debug!(page, attempt, records = payload.data.len(), "Page fetched");
                    return PageResult::Success(payload);
                }
                Err(e) if e.is_not_found() => {
                    info!(page, "Page not found, treating as absent");
                    return PageResult::NotFound;
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff.delay(attempt);
                    warn!(
                        page,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Page fetch failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        page,
                        attempts = attempt,
                        error = %e,
                        "Giving up on page after exhausting retries"
                    );
                    return PageResult::Failed(e);
                }
            }
        }
    }

    /// One GET attempt against the endpoint
    async fn try_fetch(&self, page: u32) -> Result<RankingPage, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let envelope: RankingEnvelope = response.json().await.map_err(FetchError::Decode)?;

        Ok(envelope.rankings)
    }
}
