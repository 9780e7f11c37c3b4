//! Error taxonomy for the ingestion and query pipeline.
//!
//! Each variant corresponds to a containment boundary: per-file errors
//! (`Io`, `Extraction`) are logged and skipped by the scan loop, provider
//! and index errors abort the current file or request, and `Validation`
//! errors are surfaced at the HTTP boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A source file could not be read (permissions, concurrent deletion).
    /// The scan skips the file and continues.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The partitioner failed on a document. Extraction is all-or-nothing
    /// per file: no partial chunks are emitted for `path`.
    #[error("extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// The embedding provider was unreachable or returned a malformed
    /// response, in a context where degraded placeholders are unacceptable.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// The vector index backing store could not be reached.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// A malformed request or inconsistent configuration value.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::IndexUnavailable(e.to_string())
    }
}
