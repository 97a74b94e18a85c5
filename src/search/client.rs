//! SerpAPI implementation of [`SearchProvider`].
//!
//! This client is designed to be created once and shared across worker
//! tasks, taking advantage of connection pooling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use super::provider::{AccountStatus, SearchProvider};
use super::response::RESULTS_PER_PAGE;
use super::{SearchError, SearchPage};

/// Production SerpAPI endpoint.
pub const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// Per-request timeout. The original tool used 20 seconds; a timed-out
/// request is a normal retryable failure, never a run-level error.
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// SerpAPI search client.
///
/// # Example
///
/// ```no_run
/// use dorkrunner_core::search::{SearchProvider, SerpApiClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SerpApiClient::new("my-api-key");
/// let page = client.search("site:example.com filetype:pdf", 0).await?;
/// println!("found {} urls", page.urls().len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
    /// Creates a client against the production endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, SERPAPI_BASE_URL)
    }

    /// Creates a client against an explicit base URL (used by tests to
    /// point at a local mock server).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Maps a non-success response to a [`SearchError::HttpStatus`],
    /// preserving any Retry-After header for the retry policy.
    fn status_error(url: &str, response: &Response) -> SearchError {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        SearchError::http_status_with_retry_after(url, response.status().as_u16(), retry_after)
    }

    /// Maps a reqwest transport error, distinguishing timeouts.
    fn transport_error(url: &str, source: reqwest::Error) -> SearchError {
        if source.is_timeout() {
            SearchError::timeout(url)
        } else {
            SearchError::network(url, source)
        }
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    #[instrument(skip(self), fields(start))]
    async fn search(&self, query: &str, start: usize) -> Result<SearchPage, SearchError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", &RESULTS_PER_PAGE.to_string()),
                ("start", &start.to_string()),
                ("api_key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(&url, &response));
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| SearchError::invalid_response(&url, e))?;

        debug!(urls = page.urls().len(), "search page fetched");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn account_status(&self) -> Result<AccountStatus, SearchError> {
        let url = format!("{}/account", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", &self.api_key)])
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(&url, &response));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::invalid_response(&url, e))
    }
}
