//! Per-call verification requests.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths::{signature_path, signature_url};

/// A local file paired with the detached signature that should cover it.
///
/// Lives only for the duration of a single verify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// File whose content is checked.
    pub data_path: PathBuf,
    /// Raw signature blob over the full content of `data_path`.
    pub signature_path: PathBuf,
}

impl VerificationRequest {
    /// Pair `data_path` with an explicit `signature_path`.
    pub fn new(data_path: impl Into<PathBuf>, signature_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            signature_path: signature_path.into(),
        }
    }

    /// Pair `data_path` with its conventional `<name>.signed` sibling.
    pub fn detached(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        let signature_path = signature_path(&data_path);
        Self {
            data_path,
            signature_path,
        }
    }
}

impl fmt::Display for VerificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (signature {})",
            self.data_path.display(),
            self.signature_path.display()
        )
    }
}

/// A remote artifact whose signature must be fetched before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// URL the data file was downloaded from.
    pub data_url: String,
    /// Where the data file already lives locally.
    pub data_path: PathBuf,
    /// URL of the detached signature, derived from `data_url`.
    pub signature_url: String,
    /// Where the fetched signature is written, derived from `data_path`.
    pub signature_path: PathBuf,
}

impl RemoteRequest {
    /// Derive signature URL and local signature path from the data locations.
    pub fn new(data_url: &str, data_path: &Path) -> Self {
        Self {
            data_url: data_url.to_owned(),
            data_path: data_path.to_path_buf(),
            signature_url: signature_url(data_url),
            signature_path: signature_path(data_path),
        }
    }

    /// The local request to run once the signature has been fetched.
    #[must_use]
    pub fn local(&self) -> VerificationRequest {
        VerificationRequest::new(&self.data_path, &self.signature_path)
    }
}
