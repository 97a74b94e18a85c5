//! Optional mid-run polling of the provider's account endpoint.
//!
//! The watcher runs on its own Tokio task and never blocks or serializes
//! worker progress. Poll failures are logged and otherwise ignored; the
//! observed counters are informational and never feed back into the local
//! usage record (polling itself is assumed to charge nothing).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::search::{AccountStatus, SearchProvider};

/// Lower bound on the poll interval, to keep the watcher from hammering
/// the account endpoint.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Background poller for authoritative quota counters.
#[derive(Debug)]
pub struct QuotaWatcher {
    latest: Arc<Mutex<Option<AccountStatus>>>,
    handle: JoinHandle<()>,
}

impl QuotaWatcher {
    /// Spawns the watcher, polling every `interval` (clamped to
    /// [`MIN_POLL_INTERVAL`]).
    #[must_use]
    pub fn spawn(provider: Arc<dyn SearchProvider>, interval: Duration) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let latest: Arc<Mutex<Option<AccountStatus>>> = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&latest);

        let handle = tokio::spawn(async move {
            debug!(interval_secs = interval.as_secs(), "quota watcher started");
            loop {
                tokio::time::sleep(interval).await;
                match provider.account_status().await {
                    Ok(status) => {
                        info!(
                            used = status.this_month_usage,
                            quota = status.searches_per_month,
                            remaining = status.remaining(),
                            "live quota poll"
                        );
                        *shared.lock().await = Some(status);
                    }
                    Err(e) => {
                        // Non-fatal: dispatch continues regardless
                        warn!(error = %e, "live quota poll failed");
                    }
                }
            }
        });

        Self { latest, handle }
    }

    /// The most recent successfully-polled counters, if any.
    pub async fn latest(&self) -> Option<AccountStatus> {
        *self.latest.lock().await
    }

    /// Stops the watcher.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for QuotaWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
