//! Per-step reporting of certificate chain failures.
//!
//! Observers only receive reports. They return nothing and so have no way of
//! turning a failed chain into a trusted one; the chain verifier's verdict is
//! final.

use std::fmt;

use log::{debug, warn};
use rustls_pki_types::CertificateDer;
use x509_parser::certificate::X509Certificate;

use crate::revocation::RevocationStore;

/// Longest issuer chain the diagnostic walk will follow.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Why one certificate in the chain failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepReason {
    /// The validity window has not started.
    NotYetValid {
        /// Start of the validity window.
        not_before: String,
    },
    /// The validity window has ended.
    Expired {
        /// End of the validity window.
        not_after: String,
    },
    /// No certificate in the local store matches the issuer name.
    IssuerNotFound {
        /// Issuer distinguished name.
        issuer: String,
    },
    /// A loaded CRL lists the certificate's serial.
    Revoked {
        /// Hex-encoded serial number.
        serial: String,
    },
    /// The certificate could not be decoded.
    Unparsable(String),
    /// The chain verifier rejected the path.
    Rejected(String),
}

impl fmt::Display for StepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetValid { not_before } => write!(f, "certificate is not valid before {not_before}"),
            Self::Expired { not_after } => write!(f, "certificate expired at {not_after}"),
            Self::IssuerNotFound { issuer } => write!(f, "unable to find issuer '{issuer}'"),
            Self::Revoked { serial } => write!(f, "certificate serial {serial} is revoked"),
            Self::Unparsable(e) => write!(f, "certificate cannot be parsed: {e}"),
            Self::Rejected(e) => write!(f, "chain rejected: {e}"),
        }
    }
}

/// A failed check at one position in the chain (depth 0 is the leaf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Position in the chain, counting up from the leaf. `None` when the
    /// chain verifier rejected the path as a whole; `subject` is then the leaf.
    pub depth: Option<usize>,
    /// Subject of the certificate that failed.
    pub subject: String,
    /// What went wrong.
    pub reason: StepReason,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.depth {
            Some(depth) => write!(f, "depth {depth} ({}): {}", self.subject, self.reason),
            None => write!(f, "path from {}: {}", self.subject, self.reason),
        }
    }
}

/// Receives chain failures as they are found.
pub trait ChainObserver {
    /// Called once for every failed check.
    fn step_failed(&mut self, failure: &StepFailure);
}

/// Logs every failure at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ChainObserver for LogObserver {
    fn step_failed(&mut self, failure: &StepFailure) {
        warn!("certificate verification error, {failure}");
    }
}

/// Keeps every failure for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    failures: Vec<StepFailure>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures in the order they were reported.
    #[must_use]
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// The first failure reported, if any.
    #[must_use]
    pub fn first(&self) -> Option<&StepFailure> {
        self.failures.first()
    }
}

impl ChainObserver for RecordingObserver {
    fn step_failed(&mut self, failure: &StepFailure) {
        self.failures.push(failure.clone());
    }
}

/// Walks a leaf towards its root through a local certificate pool.
pub(crate) struct ChainWalk<'a> {
    pub(crate) pool: &'a [CertificateDer<'static>],
    pub(crate) revocation: Option<&'a dyn RevocationStore>,
    pub(crate) now: i64,
    pub(crate) system_roots: bool,
}

impl ChainWalk<'_> {
    /// Return every failed check found between `leaf` and a self-signed root.
    pub(crate) fn inspect(&self, leaf: &[u8]) -> Vec<StepFailure> {
        let mut failures = Vec::new();
        let mut current = leaf;

        for depth in 0..MAX_CHAIN_DEPTH {
            let cert = match x509_parser::parse_x509_certificate(current) {
                Ok((_, cert)) => cert,
                Err(e) => {
                    failures.push(StepFailure {
                        depth: Some(depth),
                        subject: String::from("<unknown>"),
                        reason: StepReason::Unparsable(e.to_string()),
                    });
                    break;
                }
            };
            self.check_one(depth, &cert, &mut failures);

            if cert.subject().as_raw() == cert.issuer().as_raw() {
                break;
            }
            match self.find_issuer(&cert) {
                Some(issuer) => current = issuer,
                None if self.system_roots => {
                    debug!("issuer of depth {depth} not in local store, may be a system root");
                    break;
                }
                None => {
                    failures.push(StepFailure {
                        depth: Some(depth),
                        subject: cert.subject().to_string(),
                        reason: StepReason::IssuerNotFound {
                            issuer: cert.issuer().to_string(),
                        },
                    });
                    break;
                }
            }
        }
        failures
    }

    fn check_one(&self, depth: usize, cert: &X509Certificate<'_>, failures: &mut Vec<StepFailure>) {
        let subject = cert.subject().to_string();
        let validity = cert.validity();
        if self.now < validity.not_before.timestamp() {
            failures.push(StepFailure {
                depth: Some(depth),
                subject: subject.clone(),
                reason: StepReason::NotYetValid {
                    not_before: validity.not_before.to_string(),
                },
            });
        }
        if self.now > validity.not_after.timestamp() {
            failures.push(StepFailure {
                depth: Some(depth),
                subject: subject.clone(),
                reason: StepReason::Expired {
                    not_after: validity.not_after.to_string(),
                },
            });
        }
        if let Some(store) = self.revocation {
            if store.is_revoked(cert.issuer().as_raw(), cert.raw_serial()) {
                failures.push(StepFailure {
                    depth: Some(depth),
                    subject,
                    reason: StepReason::Revoked {
                        serial: hex::encode(cert.raw_serial()),
                    },
                });
            }
        }
    }

    fn find_issuer(&self, cert: &X509Certificate<'_>) -> Option<&[u8]> {
        let wanted = cert.issuer().as_raw();
        self.pool
            .iter()
            .map(|der| der.as_ref())
            .find(|der| {
                x509_parser::parse_x509_certificate(der)
                    .is_ok_and(|(_, candidate)| candidate.subject().as_raw() == wanted)
            })
    }
}
