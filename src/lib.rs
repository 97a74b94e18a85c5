//! Dorkrunner Core Library
//!
//! This library provides the core functionality for the dorkrunner tool,
//! which expands categorized search-query templates ("dorks") against target
//! domains, runs them concurrently through the SerpAPI search endpoint, and
//! persists the deduplicated URLs it discovers while tracking monthly
//! API-credit consumption.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`dorks`] - Parsing of the sectioned dork-file format
//! - [`search`] - Search-provider trait and the SerpAPI client
//! - [`engine`] - Task expansion, retry policy, and the bounded worker pool
//! - [`sink`] - Deduplicating per-category and combined output files
//! - [`quota`] - Monthly credit accounting, persisted across runs
//! - [`run`] - The coordinator that wires everything together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dorks;
pub mod engine;
pub mod quota;
pub mod run;
pub mod search;
pub mod sink;

// Re-export commonly used types
pub use dorks::{DorkError, DorkSet};
pub use engine::{
    DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_PAGES, DorkEngine,
    EngineError, FailureType, RetryDecision, RetryPolicy, RunStats, Task, TaskResult,
    classify_error, expand_tasks,
};
pub use quota::{DEFAULT_MONTHLY_QUOTA, QuotaState, QuotaStore, QuotaWatcher, RunPlan};
pub use run::{RunConfig, RunError, RunPrep, RunReport, dispatch, execute, prepare};
pub use search::{
    AccountStatus, RESULTS_PER_PAGE, SearchError, SearchPage, SearchProvider, SerpApiClient,
};
pub use sink::{ResultSink, SinkError};
