//! Search-provider abstraction and the SerpAPI client.
//!
//! The core only assumes a provider with idempotent, paginated,
//! per-request-billed search semantics: one call per result page, a set of
//! URLs on success, a classifiable [`SearchError`] on failure. The
//! [`SearchProvider`] trait is the seam used by the engine and the tests;
//! [`SerpApiClient`] is the production implementation.

mod client;
mod error;
mod provider;
mod response;

pub use client::{SERPAPI_BASE_URL, SerpApiClient};
pub use error::SearchError;
pub use provider::{AccountStatus, SearchProvider};
pub use response::{LinkedResult, OrganicResult, RESULTS_PER_PAGE, SearchPage, Sitelinks};
