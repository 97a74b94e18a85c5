//! Bounded concurrent dispatch of dork-query tasks.
//!
//! This module owns the "hard part" of the tool: a fixed-size pool of
//! workers executing independent query tasks, each with its own paginated
//! retry/backoff loop, delivering results to the sink in completion order.
//!
//! # Concurrency Model
//!
//! - Each task runs in its own Tokio task
//! - A semaphore permit is acquired before starting each task
//! - Effective concurrency is `min(requested, task_count)`
//! - Permits are released automatically when tasks complete (RAII)
//! - A panicking task is absorbed as an empty result; it never takes down
//!   the pool or other in-flight tasks

mod dispatcher;
mod executor;
mod retry;
mod task;

pub use dispatcher::{DEFAULT_CONCURRENCY, DorkEngine, EngineError, RunStats};
pub use executor::{DEFAULT_DELAY_MS, DEFAULT_PAGES, PageState, fetch_pages};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    parse_retry_after,
};
pub use task::{Task, TaskResult, expand_tasks};
