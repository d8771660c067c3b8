//! Loaded trust material: certificate chain, CA directory and revocation lists.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rustls_pki_types::CertificateDer;
use sigverify_core::config::{MissingCrlPolicy, TrustStoreConfig};

use crate::error::CertError;
use crate::pem_file::{read_der_blocks, PemFileError, CERTIFICATE_TAG};
use crate::revocation::CrlSet;

/// File extensions picked up from a CA directory.
const CA_FILE_EXTENSIONS: &[&str] = &["pem", "crt", "cer"];

/// Certificates and revocation lists the validator is seeded with.
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct TrustStore {
    /// PEM file the root and intermediate certificates came from.
    pub root_chain_path: PathBuf,
    /// Directory additional CA certificates came from, if any.
    pub ca_directory: Option<PathBuf>,
    /// PEM file the revocation lists came from, if any.
    pub revocation_list_path: Option<PathBuf>,
    /// Whether revocation is checked across the whole chain.
    pub revocation_enforced: bool,
    /// Whether the bundled system roots should also be trusted.
    pub use_system_roots: bool,
    certificates: Vec<CertificateDer<'static>>,
    revocation: Option<CrlSet>,
}

impl TrustStore {
    /// Load the trust material described by `config`.
    ///
    /// A missing CRL is only logged unless the config's policy is
    /// [`MissingCrlPolicy::Deny`]; a configured CRL that cannot be loaded is
    /// always an error.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::Configuration`] if the chain is not configured or
    /// not readable, [`CertError::MalformedCertificate`] if it holds invalid
    /// certificates, and [`CertError::Revocation`] if a configured CRL is unusable.
    pub fn load(config: &TrustStoreConfig) -> Result<Self, CertError> {
        let root_chain_path = config
            .chain_path
            .clone()
            .ok_or_else(|| CertError::Configuration("no certificate chain provided".to_owned()))?;
        if !root_chain_path.is_file() {
            return Err(CertError::Configuration(format!(
                "certificate chain {} not found",
                root_chain_path.display()
            )));
        }

        let mut certificates = load_certificates(&root_chain_path)?;
        if let Some(dir) = &config.ca_directory {
            certificates.extend(load_ca_directory(dir)?);
        }

        let revocation = match (&config.crl_path, config.missing_crl) {
            (Some(path), _) => Some(CrlSet::load(path)?),
            (None, MissingCrlPolicy::Allow) => {
                warn!("no certificate revocation list provided, revocation will not be checked");
                None
            }
            (None, MissingCrlPolicy::Deny) => {
                return Err(CertError::Configuration(
                    "a certificate revocation list is required but none is configured".to_owned(),
                ));
            }
        };

        info!(
            "trust store loaded: {} certificate(s), {} CRL(s)",
            certificates.len(),
            revocation.as_ref().map_or(0, CrlSet::len)
        );

        Ok(Self {
            root_chain_path,
            ca_directory: config.ca_directory.clone(),
            revocation_list_path: config.crl_path.clone(),
            revocation_enforced: revocation.is_some(),
            use_system_roots: config.use_system_roots,
            certificates,
            revocation,
        })
    }

    /// Every certificate from the chain file and CA directory, in load order.
    #[must_use]
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    /// The loaded revocation lists, when revocation is enforced.
    #[must_use]
    pub fn revocation(&self) -> Option<&CrlSet> {
        self.revocation.as_ref()
    }
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, CertError> {
    let blocks = read_der_blocks(path, CERTIFICATE_TAG).map_err(|e| pem_error(path, e))?;
    checked(path, blocks)
}

fn pem_error(path: &Path, err: PemFileError) -> CertError {
    match err {
        PemFileError::Unreadable(e) => {
            CertError::Configuration(format!("cannot open {}: {e}", path.display()))
        }
        other => CertError::MalformedCertificate(format!("{}: {other}", path.display())),
    }
}

fn checked(path: &Path, blocks: Vec<Vec<u8>>) -> Result<Vec<CertificateDer<'static>>, CertError> {
    for der in &blocks {
        x509_parser::parse_x509_certificate(der).map_err(|e| {
            CertError::MalformedCertificate(format!("{}: {e}", path.display()))
        })?;
    }
    debug!("read {} certificate(s) from {}", blocks.len(), path.display());
    Ok(blocks.into_iter().map(CertificateDer::from).collect())
}

fn load_ca_directory(dir: &Path) -> Result<Vec<CertificateDer<'static>>, CertError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        CertError::Configuration(format!("cannot read CA directory {}: {e}", dir.display()))
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| CA_FILE_EXTENSIONS.contains(&ext))
        })
        .collect();
    paths.sort();

    let mut certificates = Vec::new();
    for path in &paths {
        match read_der_blocks(path, CERTIFICATE_TAG) {
            Ok(blocks) => certificates.extend(checked(path, blocks)?),
            Err(PemFileError::NoBlocks(_)) => {
                debug!("skipping {}: no certificates", path.display());
            }
            Err(e) => return Err(pem_error(path, e)),
        }
    }
    Ok(certificates)
}
