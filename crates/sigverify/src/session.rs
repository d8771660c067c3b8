//! The verification session: trust established once, then many signature checks.

use std::io::ErrorKind;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use sigverify_core::config::TrustStoreConfig;
use sigverify_core::paths::signature_path;
use sigverify_core::request::{RemoteRequest, VerificationRequest};
use sigverify_crypto::diagnostics::LogObserver;
use sigverify_crypto::error::{CertError, VerifyError};
use sigverify_crypto::key::SigningKey;
use sigverify_crypto::runtime::CryptoRuntime;
use sigverify_crypto::trust_store::TrustStore;
use sigverify_crypto::validator::{CertificateValidator, TrustedCertificate};
use sigverify_crypto::verifier::SignatureVerifier;
use sigverify_fetch::fetcher::Fetcher;

/// Everything held while a session is ready.
///
/// Fields drop in declaration order, the reverse of the order they are acquired in.
struct ActiveTrust {
    signing_key: SigningKey,
    certificate: TrustedCertificate,
    runtime: CryptoRuntime,
}

enum SessionState {
    Uninitialized,
    Ready(ActiveTrust),
}

/// Verifies downloaded artifacts against detached signatures from one trusted signer.
///
/// Nothing can be verified until [`initialize`](Self::initialize) has
/// validated a signing certificate. Every outcome is reported as a boolean;
/// the reason for a failure is logged.
pub struct VerificationSession {
    trust: TrustStoreConfig,
    fetcher: Arc<dyn Fetcher>,
    state: SessionState,
}

impl VerificationSession {
    /// Create an uninitialized session.
    ///
    /// # Arguments
    ///
    /// * `trust`: Where the chain, CA directory and CRL live.
    /// * `fetcher`: Used by [`verify_remote`](Self::verify_remote) to download signatures.
    pub fn new(trust: TrustStoreConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            trust,
            fetcher,
            state: SessionState::Uninitialized,
        }
    }

    /// Validate the signing certificate at `cert_path` and make the session ready.
    ///
    /// Returns `true` straight away if the session is already ready. On
    /// failure the session stays uninitialized and the reason is logged.
    pub fn initialize(&mut self, cert_path: &Path) -> bool {
        match self.try_initialize(cert_path) {
            Ok(()) => true,
            Err(e) => {
                error!("cannot initialize verification session: {e}");
                false
            }
        }
    }

    /// [`initialize`](Self::initialize), returning the reason for a failure.
    ///
    /// # Errors
    ///
    /// - [`CertError::Configuration`] if the certificate file or the chain is
    ///   missing. A missing certificate is found before any trust material
    ///   is read.
    /// - Any other [`CertError`] raised while loading the trust store,
    ///   validating the certificate or extracting its key.
    pub fn try_initialize(&mut self, cert_path: &Path) -> Result<(), CertError> {
        if let SessionState::Ready(active) = &self.state {
            debug!(
                "session already initialized with '{}'",
                active.certificate.subject()
            );
            return Ok(());
        }
        let active = self.establish(cert_path)?;
        info!(
            "session ready: {} key from '{}', valid until {}",
            active.signing_key.algorithm(),
            active.certificate.subject(),
            active.certificate.not_after()
        );
        self.state = SessionState::Ready(active);
        Ok(())
    }

    fn establish(&self, cert_path: &Path) -> Result<ActiveTrust, CertError> {
        if !cert_path.is_file() {
            return Err(CertError::Configuration(format!(
                "signing certificate {} not found",
                cert_path.display()
            )));
        }
        let runtime = CryptoRuntime::acquire(self.trust.use_system_roots);
        let certificate = {
            let store = TrustStore::load(&self.trust)?;
            CertificateValidator::new(&runtime).validate(&store, cert_path, &mut LogObserver)?
        };
        let signing_key = SigningKey::from_certificate(&certificate)?;
        Ok(ActiveTrust {
            signing_key,
            certificate,
            runtime,
        })
    }

    /// Release the signing key, the certificate and the crypto runtime.
    ///
    /// Does nothing on an uninitialized session.
    pub fn terminate(&mut self) {
        let previous = mem::replace(&mut self.state, SessionState::Uninitialized);
        if let SessionState::Ready(active) = previous {
            info!(
                "releasing signing certificate '{}'",
                active.certificate.subject()
            );
            debug!("runtime at release: {:?}", active.runtime);
        }
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// The active signing certificate, if the session is ready.
    #[must_use]
    pub fn certificate(&self) -> Option<&TrustedCertificate> {
        match &self.state {
            SessionState::Ready(active) => Some(&active.certificate),
            SessionState::Uninitialized => None,
        }
    }

    /// Check that the file at `signature_path` is a valid signature over `data_path`.
    #[must_use]
    pub fn verify_local(&self, data_path: &Path, signature_path: &Path) -> bool {
        let SessionState::Ready(active) = &self.state else {
            warn!("verification requested before the session was initialized");
            return false;
        };
        let request = VerificationRequest::new(data_path, signature_path);
        match SignatureVerifier::new(&active.signing_key).check_request(&request) {
            Ok(()) => {
                info!("signature verified for {}", request.data_path.display());
                true
            }
            Err(VerifyError::Open { path, source }) => {
                warn!("cannot open {}: {source}", path.display());
                false
            }
            Err(VerifyError::Mismatch) => {
                warn!("signature mismatch for {request}");
                false
            }
            Err(e) => {
                warn!("cannot verify {request}: {e}");
                false
            }
        }
    }

    /// Fetch `<data_url>.signed` to `<data_path>.signed` and verify `data_path` against it.
    ///
    /// The fetched signature is removed again unless verification succeeds.
    #[must_use]
    pub fn verify_remote(&self, data_url: &str, data_path: &Path) -> bool {
        if !self.is_ready() {
            warn!("remote verification requested before the session was initialized");
            return false;
        }
        let remote = RemoteRequest::new(data_url, data_path);
        let verified = match self.fetcher.fetch(&remote.signature_url, &remote.signature_path) {
            Ok(()) => {
                debug!(
                    "fetched signature of {} to {}",
                    remote.data_url,
                    remote.signature_path.display()
                );
                let local = remote.local();
                self.verify_local(&local.data_path, &local.signature_path)
            }
            Err(e) => {
                warn!("cannot fetch signature {}: {e}", remote.signature_url);
                false
            }
        };
        if !verified {
            remove_signature(&remote.signature_path);
        }
        verified
    }

    /// Delete `<data_path>.signed` if it exists.
    pub fn discard_signature(&self, data_path: &Path) {
        remove_signature(&signature_path(data_path));
    }
}

fn remove_signature(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("cannot remove {}: {e}", path.display()),
    }
}
