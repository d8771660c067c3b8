//! Streaming verification of detached signatures.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};
use sha2::{Digest, Sha256};
use sigverify_core::request::VerificationRequest;

use crate::error::VerifyError;
use crate::key::SigningKey;

/// Bytes hashed per read of the data stream.
pub const CHUNK_SIZE: usize = 4096;

/// Largest signature blob accepted.
pub const MAX_SIGNATURE_LEN: usize = 4096;

/// Checks data streams against detached signatures made by one key.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier<'k> {
    key: &'k SigningKey,
}

impl<'k> SignatureVerifier<'k> {
    /// Create a verifier for signatures made by `key`.
    #[must_use]
    pub fn new(key: &'k SigningKey) -> Self {
        Self { key }
    }

    /// Check that `signature` covers the full content of `data`.
    ///
    /// The data length is taken before hashing starts; a stream that ends
    /// early is reported as [`VerifyError::Truncated`], never as a mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Mismatch`] if the signature does not match, and
    /// another variant if the check could not be completed.
    pub fn check<D, S>(&self, mut data: D, signature: S) -> Result<(), VerifyError>
    where
        D: Read + Seek,
        S: Read,
    {
        let signature = read_signature(signature)?;

        let expected = data.seek(SeekFrom::End(0))?;
        data.rewind()?;

        let mut hasher = Sha256::new();
        let mut buf = [0u8; CHUNK_SIZE];
        let mut consumed: u64 = 0;
        while consumed < expected {
            let remaining = expected - consumed;
            let len = usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
            data.read_exact(&mut buf[..len]).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    VerifyError::Truncated { expected, consumed }
                } else {
                    VerifyError::Io(e)
                }
            })?;
            hasher.update(&buf[..len]);
            consumed += len as u64;
        }
        debug!("hashed {consumed} bytes for {}", self.key.algorithm());

        self.key.verify_digest(hasher, &signature)
    }

    /// Boolean form of [`SignatureVerifier::check`]; the failure kind is logged.
    pub fn verify<D, S>(&self, data: D, signature: S) -> bool
    where
        D: Read + Seek,
        S: Read,
    {
        match self.check(data, signature) {
            Ok(()) => true,
            Err(VerifyError::Mismatch) => {
                warn!("signature does not match the data");
                false
            }
            Err(e) => {
                warn!("signature could not be checked: {e}");
                false
            }
        }
    }

    /// Open both files of `request` and [`check`](Self::check) them.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Open`] if either file cannot be opened, otherwise
    /// whatever [`check`](Self::check) returns.
    pub fn check_request(&self, request: &VerificationRequest) -> Result<(), VerifyError> {
        let data = open(&request.data_path)?;
        let signature = open(&request.signature_path)?;
        self.check(data, signature)
    }
}

fn open(path: &Path) -> Result<File, VerifyError> {
    File::open(path).map_err(|source| VerifyError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn read_signature<S: Read>(signature: S) -> Result<Vec<u8>, VerifyError> {
    let mut blob = Vec::new();
    signature
        .take(MAX_SIGNATURE_LEN as u64 + 1)
        .read_to_end(&mut blob)?;
    if blob.len() > MAX_SIGNATURE_LEN {
        return Err(VerifyError::SignatureTooLarge {
            max: MAX_SIGNATURE_LEN,
        });
    }
    if blob.is_empty() {
        return Err(VerifyError::MalformedSignature("signature is empty".to_owned()));
    }
    Ok(blob)
}
