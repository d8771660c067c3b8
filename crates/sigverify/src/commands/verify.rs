//! `sigverify verify <data> [--signature <path>]`: check a local file.

use std::path::Path;

use anyhow::{bail, Result};
use sigverify_core::paths::signature_path;

use crate::session::VerificationSession;

/// Run `sigverify verify`, defaulting the signature to `<data>.signed`.
///
/// # Errors
///
/// Returns an error if the signature does not verify.
pub fn run_verify(
    session: &VerificationSession,
    data: &Path,
    signature: Option<&Path>,
) -> Result<()> {
    let signature = signature.map_or_else(|| signature_path(data), Path::to_path_buf);
    if !session.verify_local(data, &signature) {
        bail!("{} failed verification", data.display());
    }
    println!("verified {}", data.display());
    Ok(())
}
