//! CLI subcommand implementations.

pub mod configure;
pub mod discard;
pub mod fetch;
pub mod verify;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sigverify_fetch::fetcher::HttpFetcher;

use crate::config::CliConfig;
use crate::session::VerificationSession;

/// Build an uninitialized session from `cfg`, downloading over HTTP.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn session(cfg: &CliConfig) -> Result<VerificationSession> {
    let fetcher = HttpFetcher::new(Duration::from_secs(cfg.fetch_timeout_secs))
        .context("cannot build HTTP client")?;
    Ok(VerificationSession::new(cfg.trust.clone(), Arc::new(fetcher)))
}

/// Build a session from `cfg` and initialize it with the signing certificate.
///
/// `certificate` overrides the configured certificate path.
///
/// # Errors
///
/// Returns an error if no certificate is configured or it cannot be trusted.
pub fn open_session(cfg: &CliConfig, certificate: Option<&Path>) -> Result<VerificationSession> {
    let Some(cert_path) = certificate.or(cfg.certificate.as_deref()) else {
        bail!("no signing certificate configured; pass --certificate or set `certificate`");
    };
    let mut session = session(cfg)?;
    if !session.initialize(cert_path) {
        bail!(
            "signing certificate {} is not trusted (see log for details)",
            cert_path.display()
        );
    }
    Ok(session)
}
