//! Verification material shared by every check made through one session.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rustls_pki_types::{SignatureVerificationAlgorithm, TrustAnchor, UnixTime};

use crate::error::CertError;

/// Supported signature algorithms plus, optionally, the bundled system roots.
///
/// Acquired first when a session initializes and released last when it
/// terminates.
pub struct CryptoRuntime {
    algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
    system_anchors: Vec<TrustAnchor<'static>>,
}

impl CryptoRuntime {
    /// Set up the runtime, loading the Mozilla root set when `use_system_roots` is set.
    #[must_use]
    pub fn acquire(use_system_roots: bool) -> Self {
        let system_anchors = if use_system_roots {
            webpki_roots::TLS_SERVER_ROOTS.to_vec()
        } else {
            Vec::new()
        };
        info!(
            "crypto runtime acquired ({} system trust anchors)",
            system_anchors.len()
        );
        Self {
            algorithms: webpki::ALL_VERIFICATION_ALGS,
            system_anchors,
        }
    }

    /// Signature algorithms accepted on certificate links.
    #[must_use]
    pub fn algorithms(&self) -> &'static [&'static dyn SignatureVerificationAlgorithm] {
        self.algorithms
    }

    /// Trust anchors contributed by the system root set.
    #[must_use]
    pub fn system_anchors(&self) -> &[TrustAnchor<'static>] {
        &self.system_anchors
    }

    /// Whether system roots were loaded.
    #[must_use]
    pub fn uses_system_roots(&self) -> bool {
        !self.system_anchors.is_empty()
    }

    /// Current time for validity-window checks.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::Configuration`] if the system clock is before the Unix epoch.
    pub fn now(&self) -> Result<UnixTime, CertError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CertError::Configuration(format!("system clock is unusable: {e}")))?;
        Ok(UnixTime::since_unix_epoch(since_epoch))
    }
}

impl std::fmt::Debug for CryptoRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoRuntime")
            .field("algorithms", &self.algorithms.len())
            .field("system_anchors", &self.system_anchors.len())
            .finish()
    }
}

impl Drop for CryptoRuntime {
    fn drop(&mut self) {
        debug!("crypto runtime released");
    }
}
