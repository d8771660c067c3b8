//! Validation of the leaf signing certificate against the trust store.

use std::path::Path;

use log::{debug, info};
use rustls_pki_types::{CertificateDer, TrustAnchor};
use webpki::{
    CertRevocationList, EndEntityCert, ExpirationPolicy, KeyUsage, RevocationCheckDepth,
    RevocationOptions, RevocationOptionsBuilder, UnknownStatusPolicy,
};

use crate::diagnostics::{ChainObserver, ChainWalk, StepFailure, StepReason};
use crate::error::CertError;
use crate::pem_file::{read_der_blocks, PemFileError, CERTIFICATE_TAG};
use crate::revocation::{CrlSet, RevocationStore};
use crate::runtime::CryptoRuntime;
use crate::trust_store::TrustStore;

/// DER contents of id-kp-codeSigning (1.3.6.1.5.5.7.3.3).
const CODE_SIGNING_OID: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x03];

/// A leaf certificate whose chain has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCertificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: String,
    not_after: String,
}

impl TrustedCertificate {
    fn from_der(der: Vec<u8>) -> Result<Self, CertError> {
        let (subject, issuer, serial, not_after) = {
            let (_, cert) = x509_parser::parse_x509_certificate(&der)
                .map_err(|e| CertError::MalformedCertificate(e.to_string()))?;
            (
                cert.subject().to_string(),
                cert.issuer().to_string(),
                hex::encode(cert.raw_serial()),
                cert.validity().not_after.to_string(),
            )
        };
        Ok(Self {
            der,
            subject,
            issuer,
            serial,
            not_after,
        })
    }

    /// Raw DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Hex-encoded serial number.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// End of the validity window.
    #[must_use]
    pub fn not_after(&self) -> &str {
        &self.not_after
    }
}

/// Checks a leaf certificate against a [`TrustStore`].
#[derive(Debug)]
pub struct CertificateValidator<'r> {
    runtime: &'r CryptoRuntime,
}

impl<'r> CertificateValidator<'r> {
    /// Create a validator using the algorithms and system roots of `runtime`.
    #[must_use]
    pub fn new(runtime: &'r CryptoRuntime) -> Self {
        Self { runtime }
    }

    /// Verify the certificate at `leaf_path` up to a trust anchor in `store`.
    ///
    /// Every failed step found along the chain is passed to `observer`. The
    /// observer only receives reports; the verdict comes from the chain
    /// verifier alone.
    ///
    /// # Errors
    ///
    /// - [`CertError::Configuration`] if the leaf file is missing.
    /// - [`CertError::MalformedCertificate`] if it holds no valid certificate.
    /// - [`CertError::Revocation`] if the leaf or an intermediate is revoked,
    ///   or its revocation status cannot be established.
    /// - [`CertError::ChainOfTrust`] for every other verification failure.
    pub fn validate(
        &self,
        store: &TrustStore,
        leaf_path: &Path,
        observer: &mut dyn ChainObserver,
    ) -> Result<TrustedCertificate, CertError> {
        let leaf = read_leaf(leaf_path)?;
        let leaf_der = CertificateDer::from(leaf.as_slice());

        let mut anchors: Vec<TrustAnchor<'_>> = Vec::new();
        let mut intermediates: Vec<CertificateDer<'_>> = Vec::new();
        for cert in store.certificates() {
            if is_self_signed(cert) {
                let anchor = webpki::anchor_from_trusted_cert(cert).map_err(|e| {
                    CertError::MalformedCertificate(format!("unusable trust anchor: {e:?}"))
                })?;
                anchors.push(anchor);
            } else {
                intermediates.push(CertificateDer::from(cert.as_ref()));
            }
        }
        anchors.extend(self.runtime.system_anchors().iter().cloned());
        debug!(
            "verifying {} against {} anchor(s) and {} intermediate(s)",
            leaf_path.display(),
            anchors.len(),
            intermediates.len()
        );

        let crls = store.revocation().map(CrlSet::parsed).transpose()?;
        let crl_refs: Vec<&CertRevocationList<'_>> = crls.iter().flatten().collect();
        let revocation = revocation_options(&crl_refs)?;

        let now = self.runtime.now()?;
        let outcome = {
            let end_entity = EndEntityCert::try_from(&leaf_der)
                .map_err(|e| CertError::MalformedCertificate(format!("{e:?}")))?;
            end_entity
                .verify_for_usage(
                    self.runtime.algorithms(),
                    &anchors,
                    &intermediates,
                    now,
                    KeyUsage::required_if_present(CODE_SIGNING_OID),
                    revocation,
                    None,
                )
                .map(|_| ())
        };

        match outcome {
            Ok(()) => {
                let trusted = TrustedCertificate::from_der(leaf)?;
                info!(
                    "signing certificate '{}' trusted (issuer '{}', serial {})",
                    trusted.subject(),
                    trusted.issuer(),
                    trusted.serial()
                );
                Ok(trusted)
            }
            Err(err) => {
                let walk = ChainWalk {
                    pool: store.certificates(),
                    revocation: store.revocation().map(|set| set as &dyn RevocationStore),
                    now: i64::try_from(now.as_secs()).unwrap_or(i64::MAX),
                    system_roots: self.runtime.uses_system_roots(),
                };
                let mut failures = walk.inspect(&leaf);
                failures.push(StepFailure {
                    depth: None,
                    subject: leaf_subject(&leaf),
                    reason: StepReason::Rejected(format!("{err:?}")),
                });
                for failure in &failures {
                    observer.step_failed(failure);
                }

                let message = failures
                    .first()
                    .map_or_else(|| format!("{err:?}"), ToString::to_string);
                if is_revocation_error(&err) {
                    Err(CertError::Revocation(message))
                } else {
                    Err(CertError::ChainOfTrust(message))
                }
            }
        }
    }
}

fn read_leaf(path: &Path) -> Result<Vec<u8>, CertError> {
    if !path.is_file() {
        return Err(CertError::Configuration(format!(
            "signing certificate {} not found",
            path.display()
        )));
    }
    let mut blocks = read_der_blocks(path, CERTIFICATE_TAG).map_err(|e| match e {
        PemFileError::Unreadable(e) => {
            CertError::Configuration(format!("cannot open {}: {e}", path.display()))
        }
        other => CertError::MalformedCertificate(format!("{}: {other}", path.display())),
    })?;
    let leaf = blocks.swap_remove(0);
    x509_parser::parse_x509_certificate(&leaf)
        .map_err(|e| CertError::MalformedCertificate(format!("{}: {e}", path.display())))?;
    Ok(leaf)
}

fn revocation_options<'a>(
    crls: &'a [&'a CertRevocationList<'a>],
) -> Result<Option<RevocationOptions<'a>>, CertError> {
    if crls.is_empty() {
        return Ok(None);
    }
    let options = RevocationOptionsBuilder::new(crls)
        .map_err(|e| CertError::Revocation(format!("{e:?}")))?
        .with_depth(RevocationCheckDepth::Chain)
        .with_status_policy(UnknownStatusPolicy::Deny)
        .with_expiration_policy(ExpirationPolicy::Enforce)
        .build();
    Ok(Some(options))
}

fn is_self_signed(der: &[u8]) -> bool {
    x509_parser::parse_x509_certificate(der)
        .is_ok_and(|(_, cert)| cert.subject().as_raw() == cert.issuer().as_raw())
}

fn leaf_subject(der: &[u8]) -> String {
    x509_parser::parse_x509_certificate(der)
        .map_or_else(|_| String::from("<unknown>"), |(_, cert)| cert.subject().to_string())
}

fn is_revocation_error(err: &webpki::Error) -> bool {
    use webpki::Error;
    matches!(
        err,
        Error::CertRevoked
            | Error::UnknownRevocationStatus
            | Error::CrlExpired
            | Error::InvalidCrlNumber
            | Error::InvalidCrlSignatureForPublicKey
            | Error::IssuerNotCrlSigner
            | Error::UnsupportedCrlIssuingDistributionPoint
            | Error::UnsupportedCrlVersion
            | Error::UnsupportedDeltaCrl
            | Error::UnsupportedIndirectCrl
            | Error::UnsupportedRevocationReason
            | Error::UnsupportedRevocationReasonsPartitioning
            | Error::UnsupportedCrlSignatureAlgorithm
            | Error::UnsupportedCrlSignatureAlgorithmForPublicKey
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crl_failures_are_revocation_errors() {
        for err in [
            webpki::Error::CertRevoked,
            webpki::Error::UnknownRevocationStatus,
            webpki::Error::CrlExpired,
            webpki::Error::IssuerNotCrlSigner,
            webpki::Error::InvalidCrlSignatureForPublicKey,
        ] {
            assert!(is_revocation_error(&err), "{err:?}");
        }
    }

    #[test]
    fn path_failures_are_not_revocation_errors() {
        for err in [
            webpki::Error::UnknownIssuer,
            webpki::Error::CertExpired,
            webpki::Error::RequiredEkuNotFound,
            webpki::Error::InvalidSignatureForPublicKey,
        ] {
            assert!(!is_revocation_error(&err), "{err:?}");
        }
    }
}
