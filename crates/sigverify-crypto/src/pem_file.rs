//! Reading DER blocks out of PEM files.

use std::path::Path;

use thiserror::Error;

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
/// PEM label of an X.509 certificate-revocation list.
pub const CRL_TAG: &str = "X509 CRL";

#[derive(Debug, Error)]
pub(crate) enum PemFileError {
    #[error("cannot read file: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("invalid PEM: {0}")]
    Invalid(#[from] ::pem::PemError),
    #[error("no '{0}' blocks found")]
    NoBlocks(&'static str),
}

/// Return the DER contents of every `tag` block in the PEM file at `path`.
///
/// Blocks with other labels are skipped; a file with no matching block is an error.
pub(crate) fn read_der_blocks(path: &Path, tag: &'static str) -> Result<Vec<Vec<u8>>, PemFileError> {
    let raw = std::fs::read(path)?;
    let blocks: Vec<Vec<u8>> = ::pem::parse_many(&raw)?
        .into_iter()
        .filter(|block| block.tag() == tag)
        .map(::pem::Pem::into_contents)
        .collect();
    if blocks.is_empty() {
        return Err(PemFileError::NoBlocks(tag));
    }
    Ok(blocks)
}
