//! Naming of detached signature artifacts.

use std::path::{Path, PathBuf};

/// Suffix appended to a data URL or file name to locate its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".signed";

/// Return the URL of the detached signature for `data_url`.
#[must_use]
pub fn signature_url(data_url: &str) -> String {
    format!("{data_url}{SIGNATURE_SUFFIX}")
}

/// Return the local path of the detached signature for `data_path`.
///
/// The suffix is appended to the full file name, so `update.pack` becomes
/// `update.pack.signed` rather than having its extension replaced.
#[must_use]
pub fn signature_path(data_path: &Path) -> PathBuf {
    let mut raw = data_path.as_os_str().to_owned();
    raw.push(SIGNATURE_SUFFIX);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_gets_suffix_appended() {
        assert_eq!(
            signature_url("https://cdn.example.com/update/10/pack.tar"),
            "https://cdn.example.com/update/10/pack.tar.signed"
        );
    }

    #[test]
    fn path_keeps_existing_extension() {
        let p = signature_path(Path::new("/var/lib/update/update.pack"));
        assert_eq!(p, PathBuf::from("/var/lib/update/update.pack.signed"));
    }
}
