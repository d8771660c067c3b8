//! `sigverify fetch <url> <data_path>`: download the signature for an artifact and check it.

use std::path::Path;

use anyhow::{bail, Result};
use sigverify_core::paths::signature_path;

use crate::session::VerificationSession;

/// Run `sigverify fetch`.
///
/// # Errors
///
/// Returns an error if the signature cannot be fetched or does not verify.
pub fn run_fetch(session: &VerificationSession, url: &str, data_path: &Path) -> Result<()> {
    if !session.verify_remote(url, data_path) {
        bail!("{} failed remote verification", data_path.display());
    }
    println!(
        "verified {} (signature kept at {})",
        data_path.display(),
        signature_path(data_path).display()
    );
    Ok(())
}
