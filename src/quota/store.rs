//! Persistence of monthly credit usage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur while saving quota state.
///
/// Loading never fails: any unreadable or stale state degrades to
/// "no usage yet".
#[derive(Debug, Error)]
pub enum QuotaError {
    /// File system error writing the state file.
    #[error("IO error writing quota state {path}: {source}")]
    Io {
        /// The state file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Persisted monthly usage record.
///
/// The on-disk key for the period is `month`, matching the format this
/// tool has always written (`{"month": "2026-08", "used": 42}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Calendar-month identifier, `YYYY-MM`.
    #[serde(rename = "month")]
    pub period: String,

    /// Credits consumed within `period`.
    pub used: u64,
}

impl QuotaState {
    /// A fresh record for the current period with zero usage.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            period: current_period(),
            used: 0,
        }
    }
}

/// Returns the current calendar-month period identifier (`YYYY-MM`),
/// derived from local wall-clock time.
#[must_use]
pub fn current_period() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

/// Loads and saves the singleton usage record.
#[derive(Debug, Clone)]
pub struct QuotaStore {
    path: PathBuf,
}

impl QuotaStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted state.
    ///
    /// Returns a fresh zero-usage record if the file is missing,
    /// unreadable, malformed, or recorded under a different month.
    /// Corruption is deliberately treated as "no usage yet" - this
    /// operation never fails.
    #[must_use]
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> QuotaState {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %e, "quota state unreadable, assuming zero usage");
                }
                return QuotaState::fresh();
            }
        };

        let state: QuotaState = match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "quota state malformed, assuming zero usage");
                return QuotaState::fresh();
            }
        };

        if state.period != current_period() {
            debug!(stored = %state.period, "month rolled over, usage reset");
            return QuotaState::fresh();
        }

        state
    }

    /// Writes the state for the current period.
    ///
    /// Uses write-then-rename so a concurrent reader never observes a
    /// partially-written file.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Io`] on any file system failure.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn save(&self, used: u64) -> Result<(), QuotaError> {
        let state = QuotaState {
            period: current_period(),
            used,
        };
        // QuotaState is a flat string/int record; serialization cannot fail
        #[allow(clippy::unwrap_used)]
        let body = serde_json::to_string(&state).unwrap();

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| QuotaError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| QuotaError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(used, "quota state saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> QuotaStore {
        QuotaStore::new(dir.path().join("quota_usage.json"))
    }

    #[test]
    fn test_load_missing_file_is_zero_usage() {
        let dir = tempfile::tempdir().unwrap();
        let state = store_in(&dir).load();
        assert_eq!(state.used, 0);
        assert_eq!(state.period, current_period());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(42).unwrap();
        assert_eq!(store.load().used, 42);
    }

    #[test]
    fn test_load_resets_on_month_rollover() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"month":"1999-01","used":9000}"#).unwrap();

        let state = store.load();
        assert_eq!(state.used, 0, "stale period must reset usage");
        assert_eq!(state.period, current_period());
    }

    #[test]
    fn test_load_same_month_carries_usage_forward() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let body = format!(r#"{{"month":"{}","used":17}}"#, current_period());
        std::fs::write(store.path(), body).unwrap();

        assert_eq!(store.load().used, 17);
    }

    #[test]
    fn test_load_tolerates_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json at all").unwrap();

        let state = store.load();
        assert_eq!(state.used, 0);
    }

    #[test]
    fn test_load_tolerates_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"month": 3, "used": "many"}"#).unwrap();

        assert_eq!(store.load().used, 0);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(5).unwrap();
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_on_disk_key_is_month() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(5).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"month\""), "compat key missing in: {text}");
    }
}
