//! Throwaway certificate authorities and signers for tests.
//!
//! Every fixture lives in its own temporary directory, removed on drop.
//! Failures here are test-setup bugs and panic.
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use std::path::{Path, PathBuf};

use p256::ecdsa::signature::Signer as _;
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateRevocationListParams, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, PublicKeyData,
    RevocationReason, RevokedCertParams, SerialNumber, SignatureAlgorithm,
};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use sha2::Sha256;
use sigverify_core::config::TrustStoreConfig;
use sigverify_core::paths::signature_path;
use tempfile::TempDir;

/// Algorithm of a leaf signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// ECDSA on P-256.
    EcdsaP256,
    /// 2048-bit RSA, PKCS#1 v1.5.
    Rsa2048,
}

/// A root CA written to `chain.pem` in a scratch directory.
pub struct TestPki {
    dir: TempDir,
    root: Authority,
    chain_path: PathBuf,
}

impl TestPki {
    /// Create a fresh root CA and write its certificate to `chain.pem`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root_name("Sigverify Test Root")
    }

    /// Like [`TestPki::new`], with `name` as the root's common name.
    #[must_use]
    pub fn with_root_name(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create fixture dir");
        let root = certificate_authority(name);
        let chain_path = dir.path().join("chain.pem");
        std::fs::write(&chain_path, root.cert.pem()).expect("write chain");
        Self {
            dir,
            root,
            chain_path,
        }
    }

    /// Scratch directory owned by this fixture.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// PEM file holding the root certificate and any intermediates.
    #[must_use]
    pub fn chain_path(&self) -> &Path {
        &self.chain_path
    }

    /// Trust store configuration for this CA alone, without system roots.
    #[must_use]
    pub fn config(&self) -> TrustStoreConfig {
        TrustStoreConfig {
            use_system_roots: false,
            ..TrustStoreConfig::with_chain(&self.chain_path)
        }
    }

    /// Issue a code-signing leaf valid until the far future.
    #[must_use]
    pub fn issue(&self, name: &str, kind: KeyKind, serial: u64) -> Signer {
        self.root.issue(self.dir(), name, kind, serial)
    }

    /// Issue a code-signing leaf whose validity ended in 2021.
    #[must_use]
    pub fn issue_expired(&self, name: &str, serial: u64) -> Signer {
        let mut params = leaf_params(name, serial);
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2021, 1, 1);
        self.root.sign_leaf(self.dir(), name, KeyKind::EcdsaP256, params)
    }

    /// Issue a leaf from a separate CA that is not in `chain.pem`.
    #[must_use]
    pub fn issue_untrusted(&self, name: &str) -> Signer {
        certificate_authority("Rogue Root").issue(self.dir(), name, KeyKind::EcdsaP256, 1)
    }

    /// Issue a code-signing leaf carrying a 1024-bit RSA key and return the
    /// certificate path. No private key is kept.
    #[must_use]
    pub fn issue_weak_rsa(&self, name: &str, serial: u64) -> PathBuf {
        let private =
            rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("generate RSA key");
        let public = Pkcs1PublicKey(
            private
                .to_public_key()
                .to_pkcs1_der()
                .expect("encode RSA public key")
                .as_bytes()
                .to_vec(),
        );
        let mut params = leaf_params(name, serial);
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        let cert = params
            .signed_by(&public, &self.root.cert, &self.root.key)
            .expect("sign weak leaf");
        let path = self.dir().join(format!("{name}.pem"));
        std::fs::write(&path, cert.pem()).expect("write leaf");
        path
    }

    /// Create an intermediate CA under the root and append it to `chain.pem`.
    #[must_use]
    pub fn issue_intermediate(&self, name: &str, serial: u64) -> IntermediateCa {
        let key = KeyPair::generate().expect("generate intermediate key");
        let mut params = ca_params(name);
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.serial_number = Some(SerialNumber::from(serial));
        let cert = params
            .signed_by(&key, &self.root.cert, &self.root.key)
            .expect("sign intermediate");
        let mut chain = std::fs::read_to_string(&self.chain_path).expect("read chain");
        chain.push_str(&cert.pem());
        std::fs::write(&self.chain_path, chain).expect("append intermediate");
        IntermediateCa {
            dir: self.dir().to_path_buf(),
            authority: Authority { cert, key },
        }
    }

    /// Write a CRL signed by the root revoking `serials` to `<name>.crl.pem`
    /// and return its path.
    #[must_use]
    pub fn write_crl(&self, name: &str, serials: &[u64]) -> PathBuf {
        self.root.write_crl(self.dir(), name, serials)
    }
}

impl Default for TestPki {
    fn default() -> Self {
        Self::new()
    }
}

/// An intermediate CA whose certificate is part of its [`TestPki`]'s chain.
///
/// Files are written to the owning fixture's directory, which must outlive it.
pub struct IntermediateCa {
    dir: PathBuf,
    authority: Authority,
}

impl IntermediateCa {
    /// Issue a code-signing leaf valid until the far future.
    #[must_use]
    pub fn issue(&self, name: &str, kind: KeyKind, serial: u64) -> Signer {
        self.authority.issue(&self.dir, name, kind, serial)
    }

    /// Write a CRL signed by this intermediate to `<name>.crl.pem`.
    #[must_use]
    pub fn write_crl(&self, name: &str, serials: &[u64]) -> PathBuf {
        self.authority.write_crl(&self.dir, name, serials)
    }
}

struct Authority {
    cert: Certificate,
    key: KeyPair,
}

impl Authority {
    fn issue(&self, dir: &Path, name: &str, kind: KeyKind, serial: u64) -> Signer {
        let mut params = leaf_params(name, serial);
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        self.sign_leaf(dir, name, kind, params)
    }

    fn sign_leaf(
        &self,
        dir: &Path,
        name: &str,
        kind: KeyKind,
        params: CertificateParams,
    ) -> Signer {
        let (key, signer_key) = match kind {
            KeyKind::EcdsaP256 => {
                let key = KeyPair::generate().expect("generate leaf key");
                let signer_key = SignerKey::ecdsa(&key);
                (key, signer_key)
            }
            KeyKind::Rsa2048 => {
                let private = rsa_private_key();
                let pem = private.to_pkcs8_pem(LineEnding::LF).expect("encode RSA key");
                let key = KeyPair::from_pem(&pem).expect("load RSA key");
                (key, SignerKey::Rsa(rsa::pkcs1v15::SigningKey::new(private)))
            }
        };
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("sign leaf");
        let cert_path = dir.join(format!("{name}.pem"));
        std::fs::write(&cert_path, cert.pem()).expect("write leaf");
        Signer {
            cert_path,
            key: signer_key,
        }
    }

    fn write_crl(&self, dir: &Path, name: &str, serials: &[u64]) -> PathBuf {
        let revoked_certs = serials
            .iter()
            .map(|serial| RevokedCertParams {
                serial_number: SerialNumber::from(*serial),
                revocation_time: rcgen::date_time_ymd(2024, 1, 1),
                reason_code: Some(RevocationReason::KeyCompromise),
                invalidity_date: None,
            })
            .collect();
        let crl = CertificateRevocationListParams {
            this_update: rcgen::date_time_ymd(2024, 1, 1),
            next_update: rcgen::date_time_ymd(2049, 1, 1),
            crl_number: SerialNumber::from(1u64),
            issuing_distribution_point: None,
            revoked_certs,
            key_identifier_method: KeyIdMethod::Sha256,
        }
        .signed_by(&self.cert, &self.key)
        .expect("sign CRL");
        let path = dir.join(format!("{name}.crl.pem"));
        std::fs::write(&path, crl.pem().expect("encode CRL")).expect("write CRL");
        path
    }
}

/// PKCS#1 `RSAPublicKey` bytes, for keys ring refuses to load.
struct Pkcs1PublicKey(Vec<u8>);

impl PublicKeyData for Pkcs1PublicKey {
    fn der_bytes(&self) -> &[u8] {
        &self.0
    }

    fn algorithm(&self) -> &SignatureAlgorithm {
        &rcgen::PKCS_RSA_SHA256
    }
}

/// A leaf certificate on disk plus the private key behind it.
pub struct Signer {
    cert_path: PathBuf,
    key: SignerKey,
}

enum SignerKey {
    Ecdsa(p256::ecdsa::SigningKey),
    Rsa(rsa::pkcs1v15::SigningKey<Sha256>),
}

impl SignerKey {
    fn ecdsa(key: &KeyPair) -> Self {
        Self::Ecdsa(
            p256::ecdsa::SigningKey::from_pkcs8_der(&key.serialize_der())
                .expect("load P-256 key"),
        )
    }
}

impl Signer {
    /// PEM file holding the leaf certificate.
    #[must_use]
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Sign `data` (SHA-256) and return the raw signature blob.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        match &self.key {
            SignerKey::Ecdsa(key) => {
                let signature: p256::ecdsa::Signature = key.sign(data);
                signature.to_der().as_bytes().to_vec()
            }
            SignerKey::Rsa(key) => key
                .sign_with_rng(&mut rand::thread_rng(), data)
                .to_bytes()
                .to_vec(),
        }
    }

    /// Sign the file at `data_path` and write the blob next to it as
    /// `<name>.signed`, returning the signature path.
    pub fn sign_file(&self, data_path: &Path) -> PathBuf {
        let data = std::fs::read(data_path).expect("read data file");
        let path = signature_path(data_path);
        std::fs::write(&path, self.sign(&data)).expect("write signature");
        path
    }
}

fn certificate_authority(name: &str) -> Authority {
    let key = KeyPair::generate().expect("generate CA key");
    let cert = ca_params(name).self_signed(&key).expect("self-sign CA");
    Authority { cert, key }
}

fn ca_params(name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
    params.distinguished_name.push(DnType::CommonName, name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params
}

/// A 2048-bit RSA key with its primes ordered `p > q`, which ring requires
/// before rcgen will load it.
fn rsa_private_key() -> rsa::RsaPrivateKey {
    let generated =
        rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
    let mut primes = generated.primes().to_vec();
    primes.sort_by(|a, b| b.cmp(a));
    rsa::RsaPrivateKey::from_components(
        generated.n().clone(),
        generated.e().clone(),
        generated.d().clone(),
        primes,
    )
    .expect("reorder RSA primes")
}

fn leaf_params(name: &str, serial: u64) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("leaf params");
    params.distinguished_name.push(DnType::CommonName, name);
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::CodeSigning];
    params.serial_number = Some(SerialNumber::from(serial));
    params
}
