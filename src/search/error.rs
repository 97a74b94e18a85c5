//! Error types for search requests.
//!
//! Variants carry the query or endpoint that failed so log lines stay
//! actionable without extra context from the caller.

use thiserror::Error;

/// Errors that can occur while talking to the search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error querying {url}: {source}")]
    Network {
        /// The request URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout querying {url}")]
    Timeout {
        /// The request URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} querying {url}")]
    HttpStatus {
        /// The request URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// The provider returned a body that does not match the expected schema.
    #[error("invalid response from {url}: {source}")]
    InvalidResponse {
        /// The request URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

impl SearchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an invalid-response error from a reqwest decode error.
    pub fn invalid_response(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = SearchError::timeout("https://serpapi.com/search");
        let msg = error.to_string();
        assert!(msg.contains("timeout"), "Expected 'timeout' in: {msg}");
        assert!(msg.contains("serpapi.com"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_http_status_display() {
        let error = SearchError::http_status("https://serpapi.com/search", 429);
        let msg = error.to_string();
        assert!(msg.contains("429"), "Expected status in: {msg}");
        assert!(msg.contains("serpapi.com"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_http_status_with_retry_after_carries_header() {
        let error = SearchError::http_status_with_retry_after(
            "https://serpapi.com/search",
            429,
            Some("120".to_string()),
        );
        match error {
            SearchError::HttpStatus { retry_after, .. } => {
                assert_eq!(retry_after.as_deref(), Some("120"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
