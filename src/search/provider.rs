//! The [`SearchProvider`] trait - the seam between the engine and any
//! concrete search backend.

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchError, SearchPage};

/// Authoritative quota counters from the provider's account endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccountStatus {
    /// Monthly search allotment for the account.
    pub searches_per_month: u64,

    /// Searches already consumed this month.
    pub this_month_usage: u64,
}

impl AccountStatus {
    /// Remaining searches this month, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.searches_per_month.saturating_sub(self.this_month_usage)
    }
}

/// A paginated, per-request-billed search backend.
///
/// Implementations must be idempotent per `(query, start)` pair: the engine
/// retries failed pages and assumes a repeated request is billed again but
/// returns equivalent results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs one search request at the given result offset.
    ///
    /// `start` is an absolute result offset, not a page index.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] classifiable by
    /// [`classify_error`](crate::engine::classify_error) on any failure.
    async fn search(&self, query: &str, start: usize) -> Result<SearchPage, SearchError>;

    /// Fetches the account's authoritative quota counters.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] if the account endpoint is unreachable or
    /// returns an unexpected payload.
    async fn account_status(&self) -> Result<AccountStatus, SearchError>;
}
