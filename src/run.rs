//! The run coordinator: plan, gate, dispatch, charge.
//!
//! A run proceeds in two phases. [`prepare`] expands the task list and
//! computes the credit projection - with no search traffic unless remote
//! quota auto-detection is enabled - and applies the fatal pre-dispatch
//! gates (empty task list, hard cap, failed quota detection). [`dispatch`]
//! then runs the pool, persists the updated usage record, and reports
//! final totals. [`execute`] is the two phases back to back for callers
//! that have no interactive confirmation step.
//!
//! Credits are charged for attempted pages, not successful ones: once
//! dispatch starts, the full `credits_needed` is persisted at the end
//! regardless of how many pages succeeded. Nothing is persisted if the
//! run aborts during `prepare`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::dorks::DorkSet;
use crate::engine::{
    DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_PAGES, DorkEngine,
    EngineError, RetryPolicy, RunStats, Task, expand_tasks,
};
use crate::quota::{DEFAULT_MONTHLY_QUOTA, QuotaError, QuotaStore, QuotaWatcher, RunPlan};
use crate::search::{SearchError, SearchProvider};
use crate::sink::{ResultSink, SinkError};

/// Everything a run needs beyond the dork set and the provider.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target domains substituted into each template.
    pub domains: Vec<String>,
    /// Result pages fetched per task.
    pub pages: usize,
    /// Worker concurrency limit.
    pub concurrency: usize,
    /// Courtesy delay between pages of one task.
    pub delay: Duration,
    /// Retries per page after the initial attempt.
    pub max_retries: u32,
    /// Monthly credit allotment.
    pub quota: u64,
    /// Credits already used this month, overriding the persisted value
    /// when set.
    pub used_override: Option<u64>,
    /// Optional per-run ceiling on credits; exceeding it aborts.
    pub hard_cap: Option<u64>,
    /// Fetch quota and usage from the provider's account endpoint before
    /// the run; a failed fetch aborts (fail closed).
    pub auto_quota: bool,
    /// Poll the account endpoint at this interval during dispatch.
    pub live_poll: Option<Duration>,
    /// Also write per-category CSV rows.
    pub csv: bool,
    /// Root directory for output files.
    pub output_dir: PathBuf,
    /// Path of the persisted usage record.
    pub usage_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            pages: DEFAULT_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            quota: DEFAULT_MONTHLY_QUOTA,
            used_override: None,
            hard_cap: None,
            auto_quota: false,
            live_poll: None,
            csv: false,
            output_dir: PathBuf::from("output"),
            usage_file: PathBuf::from("quota_usage.json"),
        }
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The dork set and domains expanded to zero tasks.
    #[error("nothing to do: task list is empty")]
    NoTasks,

    /// The configured hard cap is smaller than this run's cost.
    #[error("run needs {needed} credits but the hard cap is {cap}")]
    HardCapExceeded {
        /// Credits the run would consume.
        needed: u64,
        /// The configured ceiling.
        cap: u64,
    },

    /// Remote quota auto-detection failed; aborting rather than guessing.
    #[error("quota auto-detection failed: {0}")]
    QuotaDetect(#[source] SearchError),

    /// The dispatcher could not be constructed or run.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The result sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The usage record could not be persisted.
    #[error(transparent)]
    Quota(#[from] QuotaError),
}

/// A gated, ready-to-dispatch run.
#[derive(Debug)]
pub struct RunPrep {
    /// The expanded task list.
    pub tasks: Vec<Task>,
    /// The credit projection, computed before any search traffic.
    pub plan: RunPlan,
}

/// Final totals for a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// The projection the run was gated on.
    pub plan: RunPlan,
    /// Dispatch statistics.
    pub stats: RunStats,
    /// Unique URLs across the combined set.
    pub total_urls: usize,
    /// Unique URL count per category, sorted by name.
    pub per_category: Vec<(String, usize)>,
    /// Usage persisted at the end of the run.
    pub used_after: u64,
}

/// Expands tasks, resolves quota state, and applies the pre-dispatch gates.
///
/// # Errors
///
/// - [`RunError::NoTasks`] if the expansion is empty
/// - [`RunError::QuotaDetect`] if `auto_quota` is set and the account
///   endpoint cannot be read (fail closed)
/// - [`RunError::HardCapExceeded`] if a configured cap is smaller than
///   the computed cost
///
/// All of these abort before any task executes and leave the persisted
/// usage record untouched.
#[instrument(skip_all, fields(domains = config.domains.len(), templates = dorks.len()))]
pub async fn prepare(
    provider: &dyn SearchProvider,
    dorks: &DorkSet,
    config: &RunConfig,
) -> Result<RunPrep, RunError> {
    let tasks = expand_tasks(&config.domains, dorks);
    if tasks.is_empty() {
        return Err(RunError::NoTasks);
    }

    let (quota, used_before) = if config.auto_quota {
        let status = provider
            .account_status()
            .await
            .map_err(RunError::QuotaDetect)?;
        info!(
            quota = status.searches_per_month,
            used = status.this_month_usage,
            "quota auto-detected from account endpoint"
        );
        (status.searches_per_month, status.this_month_usage)
    } else {
        let used = match config.used_override {
            Some(used) => used,
            None => QuotaStore::new(&config.usage_file).load().used,
        };
        (config.quota, used)
    };

    let plan = RunPlan::project(
        tasks.len(),
        config.pages,
        used_before,
        quota,
        config.hard_cap,
    );

    if let Some(cap) = plan.hard_cap
        && plan.credits_needed > cap
    {
        return Err(RunError::HardCapExceeded {
            needed: plan.credits_needed,
            cap,
        });
    }

    if plan.exceeds_quota() {
        warn!(
            projected = plan.projected_used(),
            quota = plan.quota,
            "projected usage exceeds monthly quota"
        );
    }

    info!(tasks = tasks.len(), %plan, "run planned");
    Ok(RunPrep { tasks, plan })
}

/// Dispatches a prepared run and persists the updated usage record.
///
/// # Errors
///
/// Returns [`RunError`] if the sink cannot be created, the engine is
/// misconfigured, or the usage record cannot be written. Per-task and
/// per-page failures never surface here; they are absorbed into the
/// returned statistics.
#[instrument(skip_all, fields(tasks = prep.tasks.len()))]
pub async fn dispatch(
    provider: Arc<dyn SearchProvider>,
    prep: RunPrep,
    config: &RunConfig,
) -> Result<RunReport, RunError> {
    let sink = Arc::new(ResultSink::new(&config.output_dir, config.csv).await?);
    let engine = DorkEngine::new(
        config.concurrency,
        RetryPolicy::with_max_retries(config.max_retries),
        config.pages,
        config.delay,
    )?;

    let watcher = config
        .live_poll
        .map(|interval| QuotaWatcher::spawn(Arc::clone(&provider), interval));

    let stats = engine
        .run(prep.tasks, provider, Arc::clone(&sink))
        .await?;

    if let Some(watcher) = watcher {
        watcher.stop();
    }

    // Attempts are billed, not successes: charge the full planned cost
    let used_after = prep.plan.projected_used();
    QuotaStore::new(&config.usage_file).save(used_after)?;

    let total_urls = sink.combined_len().await;
    let per_category = sink.per_category_counts().await;

    info!(
        total_urls,
        used_after,
        completed = stats.completed(),
        failed_tasks = stats.failed_tasks(),
        "run complete"
    );

    Ok(RunReport {
        plan: prep.plan,
        stats,
        total_urls,
        per_category,
        used_after,
    })
}

/// Runs the full pipeline: [`prepare`] then [`dispatch`].
///
/// # Errors
///
/// Returns any [`RunError`] from either phase.
pub async fn execute(
    provider: Arc<dyn SearchProvider>,
    dorks: &DorkSet,
    config: &RunConfig,
) -> Result<RunReport, RunError> {
    let prep = prepare(provider.as_ref(), dorks, config).await?;
    dispatch(provider, prep, config).await
}
