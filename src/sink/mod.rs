//! Deduplicating, incrementally-written result files.
//!
//! The sink owns all shared mutable output state. Workers hand it one
//! [`TaskResult`] at a time; it appends previously-unseen URLs to the
//! category's `urls.txt` (plus an optional CSV side-output) and rewrites
//! the combined `all_urls.txt` in full, sorted, inside a single critical
//! section.
//!
//! # Concurrency discipline
//!
//! Per-category state lives in a `DashMap` so appends to *different*
//! categories never contend; appends to the *same* category serialize on
//! that category's own mutex. The combined file is a read-merge-rewrite
//! shared resource, so every writer funnels through one global mutex held
//! only for the merge and rewrite.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::engine::TaskResult;

/// Name of the per-category URL list file.
const CATEGORY_URLS_FILE: &str = "urls.txt";

/// Name of the per-category CSV side-output file.
const CATEGORY_CSV_FILE: &str = "results.csv";

/// Name of the combined URL list file.
const COMBINED_FILE: &str = "all_urls.txt";

/// Errors that can occur while persisting results.
#[derive(Debug, Error)]
pub enum SinkError {
    /// File system error on one of the output files.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-category durable state: the append-only file plus the set of URLs
/// already present in it.
#[derive(Debug, Default)]
struct CategoryState {
    /// URLs already written to this category's file (preloaded from disk
    /// on first touch, then tracked in memory).
    seen: HashSet<String>,
    /// Whether `seen` has been primed from the existing file.
    loaded: bool,
}

/// Thread-safe aggregation and incremental persistence of discovered URLs.
///
/// Designed to be wrapped in `Arc` and shared across worker tasks.
#[derive(Debug)]
pub struct ResultSink {
    output_dir: PathBuf,
    csv: bool,
    /// Uses Arc values so the `DashMap` shard lock can be released before
    /// awaiting on the per-category mutex.
    categories: DashMap<String, Arc<Mutex<CategoryState>>>,
    /// The global combined set; guards the combined-file rewrite.
    combined: Mutex<BTreeSet<String>>,
}

impl ResultSink {
    /// Creates a sink rooted at `output_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the output directory cannot be created.
    pub async fn new(output_dir: impl Into<PathBuf>, csv: bool) -> Result<Self, SinkError> {
        let output_dir = output_dir.into();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| SinkError::io(&output_dir, e))?;
        Ok(Self {
            output_dir,
            csv,
            categories: DashMap::new(),
            combined: Mutex::new(BTreeSet::new()),
        })
    }

    /// Path of the combined URL list.
    #[must_use]
    pub fn combined_path(&self) -> PathBuf {
        self.output_dir.join(COMBINED_FILE)
    }

    /// Path of a category's URL list.
    #[must_use]
    pub fn category_path(&self, category: &str) -> PathBuf {
        self.output_dir.join(category).join(CATEGORY_URLS_FILE)
    }

    /// Path of a category's CSV side-output.
    #[must_use]
    pub fn csv_path(&self, category: &str) -> PathBuf {
        self.output_dir.join(category).join(CATEGORY_CSV_FILE)
    }

    /// Records one task's URLs: appends the previously-unseen ones to the
    /// category file (sorted within this batch), emits optional CSV rows,
    /// and merges everything into the combined file.
    ///
    /// Returns the number of URLs newly written to the category file.
    /// Recording the same URL set twice is a no-op the second time.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] on any file system failure.
    #[instrument(skip(self, result), fields(category = %result.category, urls = result.urls.len()))]
    pub async fn record(&self, result: &TaskResult) -> Result<usize, SinkError> {
        let new_urls = self.append_category(result).await?;
        self.merge_combined(&result.urls).await?;
        Ok(new_urls)
    }

    /// Appends this batch's unseen URLs to the category file under the
    /// category's own lock.
    async fn append_category(&self, result: &TaskResult) -> Result<usize, SinkError> {
        let state = Arc::clone(
            self.categories
                .entry(result.category.clone())
                .or_default()
                .value(),
        );
        let mut state = state.lock().await;

        let dir = self.output_dir.join(&result.category);
        let urls_path = self.category_path(&result.category);

        if !state.loaded {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| SinkError::io(&dir, e))?;
            state.seen = read_existing_lines(&urls_path).await?;
            state.loaded = true;
        }

        let mut new: Vec<&String> = result
            .urls
            .iter()
            .filter(|u| !state.seen.contains(*u))
            .collect();
        new.sort();

        if new.is_empty() {
            return Ok(0);
        }

        let mut lines = String::new();
        for url in &new {
            lines.push_str(url);
            lines.push('\n');
        }
        append_to_file(&urls_path, &lines).await?;

        if self.csv {
            let csv_path = self.csv_path(&result.category);
            let mut rows = String::new();
            // Embedded double quotes would break the row format
            let safe_template = result.template.replace('"', "'");
            for url in &new {
                rows.push_str(&format!(
                    "\"{}\",\"{}\",\"{}\"\n",
                    result.category, safe_template, url
                ));
            }
            append_to_file(&csv_path, &rows).await?;
        }

        let written = new.len();
        for url in new {
            state.seen.insert(url.clone());
        }

        debug!(written, "appended category urls");
        Ok(written)
    }

    /// Merges a batch into the combined set and rewrites the combined file
    /// in full, sorted. Single critical section for all writers.
    async fn merge_combined(&self, urls: &HashSet<String>) -> Result<(), SinkError> {
        let mut combined = self.combined.lock().await;
        combined.extend(urls.iter().cloned());

        let path = self.combined_path();
        let tmp = self.output_dir.join(format!(".{COMBINED_FILE}.tmp"));

        let mut body = String::new();
        for url in combined.iter() {
            body.push_str(url);
            body.push('\n');
        }

        // Write-then-rename so a crash mid-rewrite never truncates the file
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| SinkError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        Ok(())
    }

    /// Number of unique URLs in the combined set.
    pub async fn combined_len(&self) -> usize {
        self.combined.lock().await.len()
    }

    /// Per-category unique URL counts (including lines preloaded from a
    /// previous run), sorted by category name.
    pub async fn per_category_counts(&self) -> Vec<(String, usize)> {
        let mut counts = Vec::with_capacity(self.categories.len());
        let entries: Vec<(String, Arc<Mutex<CategoryState>>)> = self
            .categories
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        for (name, state) in entries {
            let len = state.lock().await.seen.len();
            counts.push((name, len));
        }
        counts.sort();
        counts
    }
}

/// Reads the lines of an existing URL file into a set; a missing file is
/// an empty set.
async fn read_existing_lines(path: &Path) -> Result<HashSet<String>, SinkError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(SinkError::io(path, e)),
    }
}

/// Appends text to a file, creating it if absent.
async fn append_to_file(path: &Path, text: &str) -> Result<(), SinkError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| SinkError::io(path, e))?;
    file.write_all(text.as_bytes())
        .await
        .map_err(|e| SinkError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::{Task, TaskResult};

    fn result_with(category: &str, template: &str, urls: &[&str]) -> TaskResult {
        TaskResult::new(
            &Task::new("target.io", category, template),
            urls.iter().map(ToString::to_string).collect(),
        )
    }

    async fn read_lines(path: &Path) -> Vec<String> {
        tokio::fs::read_to_string(path)
            .await
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_record_writes_sorted_category_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        let result = result_with("Docs", "site:example.com", &["https://b", "https://a"]);
        let written = sink.record(&result).await.unwrap();
        assert_eq!(written, 2);

        let lines = read_lines(&sink.category_path("Docs")).await;
        assert_eq!(lines, vec!["https://a", "https://b"]);
    }

    #[tokio::test]
    async fn test_record_same_set_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        let result = result_with("Docs", "site:example.com", &["https://a", "https://b"]);
        assert_eq!(sink.record(&result).await.unwrap(), 2);
        assert_eq!(sink.record(&result).await.unwrap(), 0);

        let lines = read_lines(&sink.category_path("Docs")).await;
        assert_eq!(lines.len(), 2, "no duplicate lines after double record");
    }

    #[tokio::test]
    async fn test_record_dedupes_against_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        tokio::fs::create_dir_all(out.join("Docs")).await.unwrap();
        tokio::fs::write(out.join("Docs").join(CATEGORY_URLS_FILE), "https://a\n")
            .await
            .unwrap();

        let sink = ResultSink::new(&out, false).await.unwrap();
        let result = result_with("Docs", "site:example.com", &["https://a", "https://b"]);
        assert_eq!(sink.record(&result).await.unwrap(), 1);

        let lines = read_lines(&sink.category_path("Docs")).await;
        assert_eq!(lines, vec!["https://a", "https://b"]);
    }

    #[tokio::test]
    async fn test_combined_file_is_sorted_union() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        sink.record(&result_with("A", "one", &["https://c", "https://a"]))
            .await
            .unwrap();
        sink.record(&result_with("B", "two", &["https://b", "https://a"]))
            .await
            .unwrap();

        let lines = read_lines(&sink.combined_path()).await;
        assert_eq!(lines, vec!["https://a", "https://b", "https://c"]);
        assert_eq!(sink.combined_len().await, 3);
    }

    #[tokio::test]
    async fn test_csv_rows_escape_embedded_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), true).await.unwrap();

        let result = result_with("Docs", "intitle:\"index of\"", &["https://a"]);
        sink.record(&result).await.unwrap();

        let rows = read_lines(&sink.csv_path("Docs")).await;
        assert_eq!(rows, vec!["\"Docs\",\"intitle:'index of'\",\"https://a\""]);
    }

    #[tokio::test]
    async fn test_csv_disabled_writes_no_side_output() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        sink.record(&result_with("Docs", "one", &["https://a"]))
            .await
            .unwrap();
        assert!(!sink.csv_path("Docs").exists());
    }

    #[tokio::test]
    async fn test_empty_result_creates_no_category_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        let written = sink.record(&result_with("Docs", "one", &[])).await.unwrap();
        assert_eq!(written, 0);
        assert!(!sink.category_path("Docs").exists());
    }

    #[tokio::test]
    async fn test_per_category_counts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("output"), false).await.unwrap();

        sink.record(&result_with("B", "one", &["https://a", "https://b"]))
            .await
            .unwrap();
        sink.record(&result_with("A", "two", &["https://a"]))
            .await
            .unwrap();

        assert_eq!(
            sink.per_category_counts().await,
            vec![("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_records_keep_combined_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(
            ResultSink::new(dir.path().join("output"), false)
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..10 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                let urls = [format!("https://site/{i}"), "https://shared".to_string()];
                let result = TaskResult::new(
                    &Task::new("t.io", format!("cat{}", i % 3), "q"),
                    urls.iter().cloned().collect(),
                );
                sink.record(&result).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 10 distinct + 1 shared
        assert_eq!(sink.combined_len().await, 11);
        let lines = read_lines(&sink.combined_path()).await;
        assert_eq!(lines.len(), 11);
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted, "combined file is sorted");
    }
}
