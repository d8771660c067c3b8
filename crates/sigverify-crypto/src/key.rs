//! Public keys extracted from trusted certificates.

use log::debug;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::error::{CertError, VerifyError};
use crate::validator::TrustedCertificate;

// rsaEncryption, 1.2.840.113549.1.1.1
const OID_RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113_549, 1, 1, 1];
// id-ecPublicKey, 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];

/// Smallest RSA modulus accepted for a signing key.
pub const MIN_RSA_BITS: usize = 2048;

/// The key every detached signature is checked against.
///
/// Signatures are always computed over the SHA-256 digest of the data.
#[derive(Debug, Clone)]
pub enum SigningKey {
    /// RSA with PKCS#1 v1.5 padding.
    Rsa(rsa::pkcs1v15::VerifyingKey<Sha256>),
    /// ECDSA on P-256 with DER-encoded signatures.
    EcdsaP256(p256::ecdsa::VerifyingKey),
}

impl SigningKey {
    /// Extract the public key of a validated signing certificate.
    ///
    /// # Errors
    ///
    /// See [`SigningKey::from_certificate_der`].
    pub fn from_certificate(cert: &TrustedCertificate) -> Result<Self, CertError> {
        Self::from_certificate_der(cert.der())
    }

    /// Extract the subject public key from a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::MalformedCertificate`] if the certificate cannot be
    /// parsed, or [`CertError::UnsupportedKey`] if its key is neither RSA of
    /// at least [`MIN_RSA_BITS`] nor ECDSA P-256.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, CertError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| CertError::MalformedCertificate(e.to_string()))?;
        let spki = cert.public_key();
        let algorithm: Vec<u64> = spki
            .algorithm
            .algorithm
            .iter()
            .ok_or_else(|| CertError::UnsupportedKey("invalid key algorithm OID".to_owned()))?
            .collect();
        let key_bytes = spki.subject_public_key.data.as_ref();

        if algorithm == OID_RSA_ENCRYPTION {
            let public_key = RsaPublicKey::from_pkcs1_der(key_bytes)
                .map_err(|e| CertError::UnsupportedKey(format!("bad RSA public key: {e}")))?;
            let bits = public_key.size() * 8;
            if bits < MIN_RSA_BITS {
                return Err(CertError::UnsupportedKey(format!(
                    "{bits}-bit RSA key is below the {MIN_RSA_BITS}-bit minimum"
                )));
            }
            debug!("extracted {bits}-bit RSA signing key");
            Ok(Self::Rsa(rsa::pkcs1v15::VerifyingKey::new(public_key)))
        } else if algorithm == OID_EC_PUBLIC_KEY {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|e| CertError::UnsupportedKey(format!("not a P-256 key: {e}")))?;
            debug!("extracted ECDSA P-256 signing key");
            Ok(Self::EcdsaP256(key))
        } else {
            Err(CertError::UnsupportedKey(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.algorithm
            )))
        }
    }

    /// Short name of the signature scheme.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA-PKCS1v15-SHA256",
            Self::EcdsaP256(_) => "ECDSA-P256-SHA256",
        }
    }

    /// Check `signature` against a finished SHA-256 `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MalformedSignature`] if the blob cannot be
    /// decoded for this algorithm, or [`VerifyError::Mismatch`] if it does not
    /// match the digest.
    pub fn verify_digest(&self, digest: Sha256, signature: &[u8]) -> Result<(), VerifyError> {
        match self {
            Self::Rsa(key) => {
                let signature = rsa::pkcs1v15::Signature::try_from(signature)
                    .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
                rsa::signature::DigestVerifier::verify_digest(key, digest, &signature)
                    .map_err(|_| VerifyError::Mismatch)
            }
            Self::EcdsaP256(key) => {
                let signature = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
                p256::ecdsa::signature::DigestVerifier::verify_digest(key, digest, &signature)
                    .map_err(|_| VerifyError::Mismatch)
            }
        }
    }
}
