//! Shared test support: a scriptable in-process search provider.

#![allow(dead_code)] // not every test file uses every helper

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use dorkrunner_core::search::{AccountStatus, SearchError, SearchPage, SearchProvider};

/// One scripted outcome for a `(query, start)` page request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Succeed with these URLs.
    Urls(Vec<String>),
    /// Fail with this HTTP status.
    Status(u16),
    /// Fail with a timeout.
    Timeout,
    /// Panic inside the request (exercises worker isolation).
    Panic,
}

/// A [`SearchProvider`] driven by per-page scripts, with concurrency
/// tracking for pool-bound assertions.
///
/// Scripted outcomes for a `(query, start)` key are consumed in order;
/// once the script runs out (or when no script exists), requests succeed
/// with `default_urls`.
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<(String, usize), VecDeque<Outcome>>>,
    default_urls: Vec<String>,
    account: Option<AccountStatus>,
    /// Simulated per-request work, so requests overlap under the pool.
    work: Duration,
    search_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedProvider {
    /// A provider that answers every request with the given URLs.
    pub fn succeeding(default_urls: &[&str]) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_urls: default_urls.iter().map(ToString::to_string).collect(),
            account: Some(AccountStatus {
                searches_per_month: 250,
                this_month_usage: 0,
            }),
            work: Duration::from_millis(10),
            search_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Removes the account endpoint (every status fetch fails).
    pub fn without_account(mut self) -> Self {
        self.account = None;
        self
    }

    /// Sets the account counters returned by the status endpoint.
    pub fn with_account(mut self, quota: u64, used: u64) -> Self {
        self.account = Some(AccountStatus {
            searches_per_month: quota,
            this_month_usage: used,
        });
        self
    }

    /// Scripts the outcomes for one `(query, start)` page, consumed in order.
    pub fn script(self, query: &str, start: usize, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((query.to_string(), start), outcomes.into());
        self
    }

    /// Total search requests observed.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// High-water mark of concurrently executing search requests.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(&self, query: &str, start: usize) -> Result<SearchPage, SearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        tokio::time::sleep(self.work).await;

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&(query.to_string(), start))
            .and_then(VecDeque::pop_front);

        self.active.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            None => Ok(SearchPage::from_urls(self.default_urls.clone())),
            Some(Outcome::Urls(urls)) => Ok(SearchPage::from_urls(urls)),
            Some(Outcome::Status(status)) => {
                Err(SearchError::http_status("scripted://search", status))
            }
            Some(Outcome::Timeout) => Err(SearchError::timeout("scripted://search")),
            Some(Outcome::Panic) => panic!("scripted worker panic"),
        }
    }

    async fn account_status(&self) -> Result<AccountStatus, SearchError> {
        self.account
            .ok_or_else(|| SearchError::timeout("scripted://account"))
    }
}
