//! Monthly API-credit accounting.
//!
//! The provider bills one credit per search request, attempted or not, so
//! the tool tracks its own consumption across invocations: a small JSON
//! record keyed by calendar month, reloaded at the start of every run and
//! rewritten once at the end. A stale month resets the counter; a corrupt
//! or missing file is treated as "no usage yet" rather than an error.
//!
//! [`RunPlan`] turns the persisted state into the pre-dispatch projection
//! shown to the operator, and [`QuotaWatcher`] optionally polls the
//! provider's account endpoint mid-run for the authoritative counters.

mod plan;
mod store;
mod watcher;

pub use plan::{DEFAULT_MONTHLY_QUOTA, RunPlan};
pub use store::{QuotaError, QuotaState, QuotaStore, current_period};
pub use watcher::{MIN_POLL_INTERVAL, QuotaWatcher};
