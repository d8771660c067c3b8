use std::path::PathBuf;

use sigverify_core::config::{load_toml, save_toml, MissingCrlPolicy, TrustStoreConfig};
use tempfile::tempdir;

#[test]
fn minimal_toml_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trust.toml");
    std::fs::write(&path, "chain_path = \"/usr/share/certs/chain.pem\"\n").unwrap();

    let cfg: TrustStoreConfig = load_toml(&path).unwrap();
    assert_eq!(cfg.chain_path, Some(PathBuf::from("/usr/share/certs/chain.pem")));
    assert!(cfg.crl_path.is_none());
    assert_eq!(cfg.missing_crl, MissingCrlPolicy::Allow);
    assert!(cfg.use_system_roots);
}

#[test]
fn config_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("trust.toml");
    let cfg = TrustStoreConfig::with_chain("/certs/chain.pem")
        .crl("/certs/revoked.crl")
        .ca_directory("/certs/extra");

    save_toml(&cfg, &path).unwrap();
    let loaded: TrustStoreConfig = load_toml(&path).unwrap();
    assert_eq!(loaded, cfg);
}

#[test]
fn deny_policy_parses_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trust.toml");
    std::fs::write(
        &path,
        "chain_path = \"chain.pem\"\nmissing_crl = \"deny\"\nuse_system_roots = false\n",
    )
    .unwrap();

    let cfg: TrustStoreConfig = load_toml(&path).unwrap();
    assert_eq!(cfg.missing_crl, MissingCrlPolicy::Deny);
    assert!(!cfg.use_system_roots);
}

#[test]
fn unknown_policy_string_is_rejected() {
    assert!("sometimes".parse::<MissingCrlPolicy>().is_err());
    assert_eq!("DENY".parse::<MissingCrlPolicy>().unwrap(), MissingCrlPolicy::Deny);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = load_toml::<TrustStoreConfig>(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}
