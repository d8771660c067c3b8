//! Trust store configuration, loaded from a TOML file or environment variables.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the PEM certificate-chain file.
pub const ENV_CHAIN: &str = "SIGVERIFY_CHAIN";
/// Environment variable naming an extra directory of PEM CA certificates.
pub const ENV_CA_DIR: &str = "SIGVERIFY_CA_DIR";
/// Environment variable naming the PEM certificate-revocation list.
pub const ENV_CRL: &str = "SIGVERIFY_CRL";
/// Environment variable set to `deny` to refuse running without a CRL.
pub const ENV_MISSING_CRL: &str = "SIGVERIFY_MISSING_CRL";

/// Errors during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("missing required setting: {0}")]
    Missing(String),
    /// The configuration file could not be read or written.
    #[error("config I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// What to do when no certificate-revocation list is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCrlPolicy {
    /// Proceed without revocation checking, logging the reduced assurance.
    #[default]
    Allow,
    /// Treat a missing CRL as a configuration error.
    Deny,
}

impl std::str::FromStr for MissingCrlPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(ConfigError::Parse(format!(
                "unknown missing-CRL policy '{other}', expected 'allow' or 'deny'"
            ))),
        }
    }
}

/// Where the trust material lives and how strictly it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStoreConfig {
    /// PEM file holding the root and intermediate certificates.
    pub chain_path: Option<PathBuf>,
    /// Optional directory of additional PEM CA certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_directory: Option<PathBuf>,
    /// Optional PEM certificate-revocation list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crl_path: Option<PathBuf>,
    /// Behaviour when `crl_path` is not set.
    #[serde(default)]
    pub missing_crl: MissingCrlPolicy,
    /// Also trust the bundled Mozilla root set.
    #[serde(default = "default_use_system_roots")]
    pub use_system_roots: bool,
}

fn default_use_system_roots() -> bool {
    true
}

impl Default for TrustStoreConfig {
    fn default() -> Self {
        Self {
            chain_path: None,
            ca_directory: None,
            crl_path: None,
            missing_crl: MissingCrlPolicy::default(),
            use_system_roots: default_use_system_roots(),
        }
    }
}

impl TrustStoreConfig {
    /// Configuration trusting only the chain at `chain_path`.
    pub fn with_chain(chain_path: impl Into<PathBuf>) -> Self {
        Self {
            chain_path: Some(chain_path.into()),
            ..Self::default()
        }
    }

    /// Set the revocation list.
    #[must_use]
    pub fn crl(mut self, crl_path: impl Into<PathBuf>) -> Self {
        self.crl_path = Some(crl_path.into());
        self
    }

    /// Set the extra CA directory.
    #[must_use]
    pub fn ca_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ca_directory = Some(dir.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `SIGVERIFY_CHAIN` is not set, or
    /// [`ConfigError::Parse`] if `SIGVERIFY_MISSING_CRL` holds an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain_path = env::var_os(ENV_CHAIN)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Missing(ENV_CHAIN.to_owned()))?;
        let missing_crl = match env::var(ENV_MISSING_CRL) {
            Ok(raw) => raw.parse()?,
            Err(_) => MissingCrlPolicy::default(),
        };
        Ok(Self {
            chain_path: Some(chain_path),
            ca_directory: env::var_os(ENV_CA_DIR).map(PathBuf::from),
            crl_path: env::var_os(ENV_CRL).map(PathBuf::from),
            missing_crl,
            use_system_roots: default_use_system_roots(),
        })
    }
}

/// Load and deserialize a `T` from the TOML file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Serialize `value` as TOML to `path`, creating parent directories if necessary.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be written, or
/// [`ConfigError::Parse`] if `value` cannot be represented as TOML.
pub fn save_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let raw = toml::to_string(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    std::fs::write(path, raw).map_err(io_err)
}
