//! `sigverify discard <data_path>`: remove a stored signature.

use std::path::Path;

use crate::session::VerificationSession;

/// Run `sigverify discard`. Missing signatures are not an error.
pub fn run_discard(session: &VerificationSession, data_path: &Path) {
    session.discard_signature(data_path);
}
