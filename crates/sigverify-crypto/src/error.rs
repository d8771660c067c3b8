//! Error types for certificate validation and signature verification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while establishing trust in the signing certificate.
#[derive(Debug, Error)]
pub enum CertError {
    /// A required path is not configured or does not exist.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A certificate could not be decoded from PEM/DER.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),
    /// The certificate chain could not be validated up to a trusted root.
    #[error("certificate chain validation failed: {0}")]
    ChainOfTrust(String),
    /// The configured revocation list is unusable, or marks a certificate revoked.
    #[error("revocation check failed: {0}")]
    Revocation(String),
    /// The certificate's public key cannot be used for signature checks.
    #[error("unsupported signing key: {0}")]
    UnsupportedKey(String),
}

/// Errors that can occur while checking a detached signature.
///
/// Everything except [`VerifyError::Mismatch`] means the check could not be
/// carried out; `Mismatch` is the expected outcome for tampered content.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The data or signature file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Reading the data or signature failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The data stream ended before its declared length.
    #[error("data ended after {consumed} of {expected} bytes")]
    Truncated {
        /// Length determined before streaming started.
        expected: u64,
        /// Bytes successfully hashed before the short read.
        consumed: u64,
    },
    /// The signature blob exceeds the accepted size.
    #[error("signature exceeds {max} bytes")]
    SignatureTooLarge {
        /// Maximum accepted signature length.
        max: usize,
    },
    /// The signature blob cannot be decoded for the key's algorithm.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// The signature does not match the data.
    #[error("signature mismatch")]
    Mismatch,
}
