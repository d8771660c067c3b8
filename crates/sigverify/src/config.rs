//! CLI configuration, read from `~/.sigverify/config.toml` or the environment.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sigverify_core::config::{load_toml, save_toml, TrustStoreConfig};
use sigverify_fetch::fetcher::DEFAULT_TIMEOUT;

/// Environment variable naming the signing certificate.
pub const ENV_CERTIFICATE: &str = "SIGVERIFY_CERTIFICATE";

/// Persisted CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Trust material locations and revocation policy.
    #[serde(flatten)]
    pub trust: TrustStoreConfig,
    /// PEM file holding the leaf signing certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PathBuf>,
    /// Timeout for signature downloads, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl CliConfig {
    /// Build the configuration from `SIGVERIFY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate chain variable is not set.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            trust: TrustStoreConfig::from_env()?,
            certificate: std::env::var_os(ENV_CERTIFICATE).map(PathBuf::from),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        })
    }
}

/// Return the default path for the CLI config file (`~/.sigverify/config.toml`).
#[must_use]
pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
    PathBuf::from(home).join(".sigverify").join("config.toml")
}

/// Write `cfg` to `path`, creating parent directories if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be written.
pub fn save_config(cfg: &CliConfig, path: &Path) -> Result<()> {
    save_toml(cfg, path)?;
    Ok(())
}

/// Load and deserialize a [`CliConfig`] from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or deserialized.
pub fn load_config(path: &Path) -> Result<CliConfig> {
    Ok(load_toml(path)?)
}

/// Load `path` if given, else the default config file if it exists, else the environment.
///
/// # Errors
///
/// Returns an error if the chosen source is unreadable or incomplete.
pub fn resolve_config(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = default_config_path();
            if default.is_file() {
                load_config(&default)
            } else {
                CliConfig::from_env()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = CliConfig {
            trust: TrustStoreConfig::with_chain("/etc/sigverify/chain.pem")
                .crl("/etc/sigverify/revoked.pem"),
            certificate: Some(PathBuf::from("/etc/sigverify/signer.pem")),
            fetch_timeout_secs: 10,
        };
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn flat_file_layout_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "chain_path = \"chain.pem\"\ncertificate = \"signer.pem\"\n",
        )
        .unwrap();
        let cfg = resolve_config(Some(path.as_path())).unwrap();
        assert_eq!(cfg.trust.chain_path, Some(PathBuf::from("chain.pem")));
        assert_eq!(cfg.certificate, Some(PathBuf::from("signer.pem")));
        assert_eq!(cfg.fetch_timeout_secs, DEFAULT_TIMEOUT.as_secs());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(resolve_config(Some(path.as_path())).is_err());
    }
}
