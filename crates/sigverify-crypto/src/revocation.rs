//! Certificate revocation lists.

use std::path::Path;

use log::debug;
use webpki::{BorrowedCertRevocationList, CertRevocationList};

use crate::error::CertError;
use crate::pem_file::{read_der_blocks, CRL_TAG};

/// Answers whether a certificate has been revoked by its issuer.
pub trait RevocationStore: Send + Sync {
    /// Return `true` if a list issued by `issuer` (raw DER name) contains `serial`
    /// (raw DER integer contents).
    fn is_revoked(&self, issuer: &[u8], serial: &[u8]) -> bool;
}

/// The CRLs loaded from one PEM file.
///
/// Every list is checked to decode when loaded, so a corrupt file is rejected
/// before any chain verification starts.
#[derive(Debug, Clone)]
pub struct CrlSet {
    lists: Vec<Vec<u8>>,
}

impl CrlSet {
    /// Load all `X509 CRL` blocks from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::Revocation`] if the file cannot be read, holds no
    /// CRL, or any CRL fails to decode.
    pub fn load(path: &Path) -> Result<Self, CertError> {
        let lists = read_der_blocks(path, CRL_TAG)
            .map_err(|e| CertError::Revocation(format!("{}: {e}", path.display())))?;
        for (i, der) in lists.iter().enumerate() {
            BorrowedCertRevocationList::from_der(der).map_err(|e| {
                CertError::Revocation(format!("{}: CRL #{i} is invalid: {e:?}", path.display()))
            })?;
        }
        debug!("loaded {} CRL(s) from {}", lists.len(), path.display());
        Ok(Self { lists })
    }

    /// Number of lists in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether the set holds no lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Decode the lists for the chain verifier.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::Revocation`] if a list fails to decode.
    pub fn parsed(&self) -> Result<Vec<CertRevocationList<'_>>, CertError> {
        self.lists
            .iter()
            .enumerate()
            .map(|(i, der)| {
                BorrowedCertRevocationList::from_der(der)
                    .map(CertRevocationList::from)
                    .map_err(|e| CertError::Revocation(format!("CRL #{i}: {e:?}")))
            })
            .collect()
    }
}

impl RevocationStore for CrlSet {
    fn is_revoked(&self, issuer: &[u8], serial: &[u8]) -> bool {
        self.lists
            .iter()
            .filter_map(|der| x509_parser::parse_x509_crl(der).ok())
            .filter(|(_, crl)| crl.issuer().as_raw() == issuer)
            .any(|(_, crl)| {
                crl.iter_revoked_certificates()
                    .any(|revoked| revoked.raw_serial() == serial)
            })
    }
}
