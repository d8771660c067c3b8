//! Error types for artifact retrieval.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a remote artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code received.
        status: u16,
        /// URL that was requested.
        url: String,
    },
    /// The destination file could not be written.
    #[error("cannot write {path}: {source}")]
    Io {
        /// Destination being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
