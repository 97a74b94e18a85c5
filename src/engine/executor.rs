//! Per-task query executor: sequential pages, per-page retry loop.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::dispatcher::RunStats;
use super::retry::{RetryDecision, RetryPolicy, classify_error, retry_after_delay};
use super::task::{Task, TaskResult};
use crate::search::{RESULTS_PER_PAGE, SearchProvider};

/// Default pages fetched per task.
pub const DEFAULT_PAGES: usize = 2;

/// Default courtesy delay between pages of the same task (milliseconds).
pub const DEFAULT_DELAY_MS: u64 = 800;

/// Lifecycle of a single page request within a task.
///
/// Transitions on each request outcome:
///
/// ```text
/// Pending --ok--> Succeeded
/// Pending --err--> Retrying(1) --err--> Retrying(2) ... --err--> Exhausted
/// Retrying(n) --ok--> Succeeded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No request issued yet.
    Pending,
    /// The last attempt failed; this many failures so far.
    Retrying(u32),
    /// The page returned results.
    Succeeded,
    /// Retries are exhausted; the page contributes no URLs.
    Exhausted,
}

impl PageState {
    /// Returns true once the page needs no further requests.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

/// Executes one task: fetches `pages` result pages strictly sequentially,
/// retrying each page per `policy`, and unions every discovered URL.
///
/// Runs entirely within one worker; performs no cross-task
/// synchronization. A page that exhausts its retries is logged and
/// skipped, never failing the task. The courtesy `delay` is slept between
/// pages (not after the last one); it is a rate-limit courtesy, not a
/// correctness requirement.
#[instrument(skip(provider, policy, stats), fields(task = %task))]
pub async fn fetch_pages(
    provider: &dyn SearchProvider,
    task: &Task,
    pages: usize,
    delay: Duration,
    policy: &RetryPolicy,
    stats: &RunStats,
) -> TaskResult {
    let query = task.query();
    let mut urls = HashSet::new();

    for page in 0..pages {
        let start = page * RESULTS_PER_PAGE;
        let state = fetch_page(provider, &query, start, policy, stats, &mut urls).await;

        if state == PageState::Exhausted {
            stats.increment_failed_pages();
            warn!(%query, page, "page abandoned after exhausting retries");
        }

        if page + 1 < pages {
            tokio::time::sleep(delay).await;
        }
    }

    debug!(urls = urls.len(), "task finished");
    TaskResult::new(task, urls)
}

/// Drives one page through its state machine until terminal.
async fn fetch_page(
    provider: &dyn SearchProvider,
    query: &str,
    start: usize,
    policy: &RetryPolicy,
    stats: &RunStats,
    urls: &mut HashSet<String>,
) -> PageState {
    let mut state = PageState::Pending;

    while !state.is_terminal() {
        let failures = match state {
            PageState::Pending => 0,
            PageState::Retrying(n) => n,
            PageState::Succeeded | PageState::Exhausted => break,
        };

        match provider.search(query, start).await {
            Ok(page) => {
                urls.extend(page.urls());
                state = PageState::Succeeded;
            }
            Err(error) => {
                let failures = failures + 1;
                let failure_type = classify_error(&error);

                match policy.should_retry(failure_type, failures) {
                    RetryDecision::Retry {
                        delay: backoff_delay,
                        attempt,
                    } => {
                        // A server-mandated Retry-After wins over backoff
                        let delay = retry_after_delay(&error).unwrap_or(backoff_delay);
                        debug!(
                            %query,
                            start,
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "retrying page"
                        );
                        stats.increment_retried();
                        tokio::time::sleep(delay).await;
                        state = PageState::Retrying(failures);
                    }
                    RetryDecision::GiveUp { attempts } => {
                        debug!(%query, start, attempts, error = %error, "giving up on page");
                        state = PageState::Exhausted;
                    }
                }
            }
        }
    }

    state
}
