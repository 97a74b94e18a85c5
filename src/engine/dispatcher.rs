//! The worker pool: semaphore-bounded fan-out over the task list.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::executor::fetch_pages;
use super::retry::RetryPolicy;
use super::task::Task;
use crate::search::SearchProvider;
use crate::sink::ResultSink;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Error type for dispatcher operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Statistics from one dispatch run.
///
/// Uses atomic counters for thread-safe updates from concurrent workers.
#[derive(Debug, Default)]
pub struct RunStats {
    completed: AtomicUsize,
    failed_tasks: AtomicUsize,
    failed_pages: AtomicUsize,
    retried: AtomicUsize,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks whose results reached the sink.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Tasks absorbed as empty results (worker panic or sink write failure).
    #[must_use]
    pub fn failed_tasks(&self) -> usize {
        self.failed_tasks.load(Ordering::SeqCst)
    }

    /// Pages abandoned after exhausting their retries.
    #[must_use]
    pub fn failed_pages(&self) -> usize {
        self.failed_pages.load(Ordering::SeqCst)
    }

    /// Individual page retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed_tasks(&self) {
        self.failed_tasks.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed_pages(&self) {
        self.failed_pages.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    /// Copies counters out of a shared handle.
    fn snapshot(stats: &Arc<Self>) -> Self {
        let new = Self::new();
        new.completed.store(stats.completed(), Ordering::SeqCst);
        new.failed_tasks
            .store(stats.failed_tasks(), Ordering::SeqCst);
        new.failed_pages
            .store(stats.failed_pages(), Ordering::SeqCst);
        new.retried.store(stats.retried(), Ordering::SeqCst);
        new
    }
}

/// Bounded concurrent dispatcher for dork-query tasks.
///
/// Tasks have no ordering dependency on each other; results reach the sink
/// in completion order, which is nondeterministic. A worker that panics is
/// logged and its task contributes an empty result.
#[derive(Debug)]
pub struct DorkEngine {
    /// Requested concurrency limit.
    concurrency: usize,
    /// Retry policy applied to every page request.
    retry_policy: RetryPolicy,
    /// Pages fetched per task.
    pages: usize,
    /// Courtesy delay between pages of one task.
    delay: Duration,
}

impl DorkEngine {
    /// Creates a new engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `concurrency` is
    /// outside 1-100.
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        pages: usize,
        delay: Duration,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            pages,
            delay_ms = delay.as_millis(),
            max_retries = retry_policy.max_retries(),
            "creating engine"
        );

        Ok(Self {
            concurrency,
            retry_policy,
            pages,
            delay,
        })
    }

    /// Returns the requested concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the concurrency the pool will actually use for `task_count`
    /// tasks: never more workers than there is work.
    #[must_use]
    pub fn effective_concurrency(&self, task_count: usize) -> usize {
        self.concurrency.min(task_count).max(1)
    }

    /// Runs every task through the pool, recording each result into the
    /// sink as it completes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    /// Individual task failures do NOT error this method; they are logged
    /// and counted in the returned [`RunStats`].
    #[instrument(skip(self, tasks, provider, sink), fields(task_count = tasks.len()))]
    pub async fn run(
        &self,
        tasks: Vec<Task>,
        provider: Arc<dyn SearchProvider>,
        sink: Arc<ResultSink>,
    ) -> Result<RunStats, EngineError> {
        let stats = Arc::new(RunStats::new());
        let semaphore = Arc::new(Semaphore::new(self.effective_concurrency(tasks.len())));
        let mut handles = Vec::with_capacity(tasks.len());

        info!(
            tasks = tasks.len(),
            workers = self.effective_concurrency(tasks.len()),
            "starting dispatch"
        );

        for task in tasks {
            // Acquire a permit before spawning (blocks at the limit)
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let provider = Arc::clone(&provider);
            let sink = Arc::clone(&sink);
            let stats = Arc::clone(&stats);
            let retry_policy = self.retry_policy.clone();
            let pages = self.pages;
            let delay = self.delay;

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let result =
                    fetch_pages(provider.as_ref(), &task, pages, delay, &retry_policy, &stats)
                        .await;

                info!(task = %task, urls = result.urls.len(), "task complete");

                match sink.record(&result).await {
                    Ok(written) => {
                        debug!(task = %task, new_urls = written, "result recorded");
                        stats.increment_completed();
                    }
                    Err(e) => {
                        warn!(task = %task, error = %e, "failed to record result");
                        stats.increment_failed_tasks();
                    }
                }
            }));
        }

        debug!(task_count = handles.len(), "waiting for workers");

        for handle in handles {
            // A panicking worker must not crash the pool; its task simply
            // contributes an empty result
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task panicked");
                stats.increment_failed_tasks();
            }
        }

        let snapshot = RunStats::snapshot(&stats);
        info!(
            completed = snapshot.completed(),
            failed_tasks = snapshot.failed_tasks(),
            failed_pages = snapshot.failed_pages(),
            retried = snapshot.retried(),
            "dispatch complete"
        );

        Ok(match Arc::try_unwrap(stats) {
            Ok(stats) => stats,
            Err(_) => snapshot,
        })
    }
}
