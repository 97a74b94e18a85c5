//! Error types for dork-file loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a dork file.
///
/// Both variants are fatal: the run must abort before any network
/// activity or quota mutation when the dork source is unusable.
#[derive(Debug, Error)]
pub enum DorkError {
    /// The dork file could not be read.
    #[error("cannot read dork file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The dork file parsed to zero templates.
    #[error("dork file {path} contains no query templates")]
    Empty {
        /// Path of the empty dork file.
        path: PathBuf,
    },
}

impl DorkError {
    /// Creates an IO error with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an empty-file error.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::Empty { path: path.into() }
    }
}
