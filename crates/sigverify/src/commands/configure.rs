//! `sigverify configure`: persist trust settings to the config file.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{save_config, CliConfig};

/// Run `sigverify configure`, writing `cfg` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn run_configure(cfg: &CliConfig, path: &Path) -> Result<()> {
    save_config(cfg, path)
        .with_context(|| format!("cannot write config to {}", path.display()))?;
    println!("Config saved to {}", path.display());
    Ok(())
}
