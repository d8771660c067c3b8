use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sigverify::session::VerificationSession;
use sigverify_core::config::TrustStoreConfig;
use sigverify_core::paths::signature_path;
use sigverify_crypto::error::CertError;
use sigverify_fetch::error::FetchError;
use sigverify_fetch::fetcher::Fetcher;
use sigverify_testkit::{KeyKind, TestPki};

fn refusing_fetcher() -> Arc<dyn Fetcher> {
    Arc::new(|url: &str, _: &Path| -> Result<(), FetchError> {
        Err(FetchError::UnexpectedStatus {
            status: 404,
            url: url.to_owned(),
        })
    })
}

/// Serves files from `root`, keyed by the last URL segment.
fn directory_fetcher(root: PathBuf) -> Arc<dyn Fetcher> {
    Arc::new(move |url: &str, dest: &Path| -> Result<(), FetchError> {
        let name = url.rsplit('/').next().unwrap_or(url);
        std::fs::copy(root.join(name), dest)
            .map(|_| ())
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })
    })
}

fn write(path: &Path, data: &[u8]) -> PathBuf {
    std::fs::write(path, data).unwrap();
    path.to_path_buf()
}

#[test]
fn session_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<VerificationSession>();
}

#[test]
fn valid_signature_verifies() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("patch.bin"), b"binary patch contents");
    let sig = signer.sign_file(&data);
    assert!(session.verify_local(&data, &sig));
}

#[test]
fn flipped_signature_byte_fails() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("patch.bin"), b"binary patch contents");
    let sig = signer.sign_file(&data);
    let mut blob = std::fs::read(&sig).unwrap();
    blob[10] ^= 0x80;
    std::fs::write(&sig, blob).unwrap();

    assert!(!session.verify_local(&data, &sig));
}

#[test]
fn truncated_or_extended_data_fails() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let original = b"0123456789abcdef".repeat(1000);
    let data = write(&pki.dir().join("patch.bin"), &original);
    let sig = signer.sign_file(&data);

    write(&data, &original[..original.len() - 1]);
    assert!(!session.verify_local(&data, &sig));

    let mut extended = original.clone();
    extended.push(b'!');
    write(&data, &extended);
    assert!(!session.verify_local(&data, &sig));

    write(&data, &original);
    assert!(session.verify_local(&data, &sig));
}

#[test]
fn missing_data_or_signature_fails() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("patch.bin"), b"contents");
    assert!(!session.verify_local(&data, &signature_path(&data)));
    assert!(!session.verify_local(&pki.dir().join("absent.bin"), &signature_path(&data)));
}

#[test]
fn initialize_is_idempotent() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));
    let serial = session.certificate().unwrap().serial().to_owned();

    // A second call must not re-read anything.
    std::fs::remove_file(signer.cert_path()).unwrap();
    std::fs::remove_file(pki.chain_path()).unwrap();
    assert!(session.initialize(signer.cert_path()));
    assert!(session.is_ready());
    assert_eq!(session.certificate().unwrap().serial(), serial);
}

#[test]
fn missing_chain_leaves_session_uninitialized() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let data = write(&pki.dir().join("patch.bin"), b"contents");
    let sig = signer.sign_file(&data);

    let cfg = TrustStoreConfig {
        use_system_roots: false,
        ..TrustStoreConfig::with_chain(pki.dir().join("no-chain.pem"))
    };
    let mut session = VerificationSession::new(cfg, refusing_fetcher());
    assert!(!session.initialize(signer.cert_path()));
    assert!(!session.is_ready());
    assert!(!session.verify_local(&data, &sig));
}

#[test]
fn unconfigured_chain_fails() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(TrustStoreConfig::default(), refusing_fetcher());
    assert!(!session.initialize(signer.cert_path()));
    assert!(session.certificate().is_none());
}

#[test]
fn missing_certificate_fails() {
    let pki = TestPki::new();
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(!session.initialize(&pki.dir().join("absent.pem")));
    assert!(!session.is_ready());
}

#[test]
fn missing_certificate_is_reported_before_trust_material_is_read() {
    let pki = TestPki::new();
    let corrupt = write(&pki.dir().join("corrupt.crl.pem"), b"garbage");
    let mut session = VerificationSession::new(pki.config().crl(corrupt), refusing_fetcher());

    let err = session
        .try_initialize(&pki.dir().join("absent.pem"))
        .unwrap_err();
    assert!(matches!(err, CertError::Configuration(_)));
    assert!(!session.is_ready());
}

#[test]
fn untrusted_certificate_fails() {
    let pki = TestPki::new();
    let impostor = pki.issue_untrusted("impostor");
    let data = write(&pki.dir().join("patch.bin"), b"contents");
    let sig = impostor.sign_file(&data);

    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(!session.initialize(impostor.cert_path()));
    assert!(!session.verify_local(&data, &sig));
}

#[test]
fn expired_certificate_fails() {
    let pki = TestPki::new();
    let stale = pki.issue_expired("stale", 5);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(!session.initialize(stale.cert_path()));
}

#[test]
fn revoked_certificate_fails() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 7);
    let crl = pki.write_crl("revoked", &[7]);
    let mut session = VerificationSession::new(pki.config().crl(crl), refusing_fetcher());
    assert!(!session.initialize(signer.cert_path()));
}

#[test]
fn unrevoked_certificate_passes_with_crl() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 8);
    let crl = pki.write_crl("revoked", &[7]);
    let mut session = VerificationSession::new(pki.config().crl(crl), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));
}

#[test]
fn unreachable_or_corrupt_crl_fails_initialize() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);

    let absent = pki.config().crl(pki.dir().join("gone.crl.pem"));
    let mut session = VerificationSession::new(absent, refusing_fetcher());
    assert!(!session.initialize(signer.cert_path()));

    let corrupt = write(&pki.dir().join("corrupt.crl.pem"), b"garbage");
    let mut session = VerificationSession::new(pki.config().crl(corrupt), refusing_fetcher());
    assert!(!session.initialize(signer.cert_path()));
}

#[test]
fn remote_fetch_failure_returns_false_without_artifact() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("update.pack"), b"payload");
    assert!(!session.verify_remote("https://updates.test/update.pack", &data));
    assert!(!signature_path(&data).exists());
}

#[test]
fn partial_download_is_removed() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let partial: Arc<dyn Fetcher> = Arc::new(|url: &str, dest: &Path| -> Result<(), FetchError> {
        std::fs::write(dest, b"half a sig").unwrap();
        Err(FetchError::UnexpectedStatus {
            status: 500,
            url: url.to_owned(),
        })
    });
    let mut session = VerificationSession::new(pki.config(), partial);
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("update.pack"), b"payload");
    assert!(!session.verify_remote("https://updates.test/update.pack", &data));
    assert!(!signature_path(&data).exists());
}

#[test]
fn remote_success_keeps_signature() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let server = tempfile::tempdir().unwrap();
    let published = write(&server.path().join("update.pack"), b"payload v2");
    signer.sign_file(&published);

    let mut session = VerificationSession::new(
        pki.config(),
        directory_fetcher(server.path().to_path_buf()),
    );
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("update.pack"), b"payload v2");
    assert!(session.verify_remote("https://updates.test/releases/update.pack", &data));
    assert!(signature_path(&data).exists());
}

#[test]
fn remote_mismatch_removes_signature() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let server = tempfile::tempdir().unwrap();
    let published = write(&server.path().join("update.pack"), b"payload v2");
    signer.sign_file(&published);

    let mut session = VerificationSession::new(
        pki.config(),
        directory_fetcher(server.path().to_path_buf()),
    );
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("update.pack"), b"tampered payload");
    assert!(!session.verify_remote("https://updates.test/releases/update.pack", &data));
    assert!(!signature_path(&data).exists());
}

#[test]
fn remote_verification_needs_initialization() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let counting: Arc<dyn Fetcher> = Arc::new(move |_: &str, _: &Path| -> Result<(), FetchError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let pki = TestPki::new();
    let session = VerificationSession::new(pki.config(), counting);

    let data = write(&pki.dir().join("update.pack"), b"payload");
    assert!(!session.verify_remote("https://updates.test/update.pack", &data));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn terminate_disables_verification() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));

    let data = write(&pki.dir().join("patch.bin"), b"contents");
    let sig = signer.sign_file(&data);
    assert!(session.verify_local(&data, &sig));

    session.terminate();
    assert!(!session.is_ready());
    assert!(!session.verify_local(&data, &sig));

    session.terminate();
    assert!(session.initialize(signer.cert_path()));
    assert!(session.verify_local(&data, &sig));
}

#[test]
fn terminate_without_initialize_is_safe() {
    let pki = TestPki::new();
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    session.terminate();
    assert!(!session.is_ready());
}

#[test]
fn discard_removes_signature_and_tolerates_absence() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let session = VerificationSession::new(pki.config(), refusing_fetcher());

    let data = write(&pki.dir().join("update.pack"), b"payload");
    let sig = signer.sign_file(&data);
    session.discard_signature(&data);
    assert!(!sig.exists());
    assert!(data.exists());

    session.discard_signature(&data);
}

#[test]
fn concurrent_verification_shares_one_session() {
    let pki = TestPki::new();
    let signer = pki.issue("updates", KeyKind::EcdsaP256, 1);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(signer.cert_path()));
    let session = Arc::new(session);

    let files: Vec<(PathBuf, PathBuf)> = (0..4)
        .map(|i| {
            let data = write(&pki.dir().join(format!("part{i}.bin")), &vec![i as u8; 5000]);
            let sig = signer.sign_file(&data);
            (data, sig)
        })
        .collect();

    let handles: Vec<_> = files
        .into_iter()
        .map(|(data, sig)| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.verify_local(&data, &sig))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn rsa_update_pack_scenario() {
    let pki = TestPki::new();
    let k = pki.issue("release-key", KeyKind::Rsa2048, 100);
    let k2 = pki.issue("unrelated-key", KeyKind::Rsa2048, 101);
    let mut session = VerificationSession::new(pki.config(), refusing_fetcher());
    assert!(session.initialize(k.cert_path()));

    let pack: Vec<u8> = (0..1_000_000u32).map(|i| (i % 256) as u8).collect();
    let data = write(&pki.dir().join("update.pack"), &pack);
    let sig = k.sign_file(&data);
    assert_eq!(std::fs::metadata(&sig).unwrap().len(), 256);
    assert!(session.verify_local(&data, &sig));

    let resigned = k2.sign_file(&data);
    assert_eq!(resigned, sig);
    assert!(!session.verify_local(&data, &sig));
}
