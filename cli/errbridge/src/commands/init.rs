//! `errbridge init` — write a starter `errbridge.toml`.

use std::path::Path;

use anyhow::{bail, Result};
use errbridge_core::config::CONFIG_FILE_NAME;
use errbridge_core::{BridgeConfig, FatalPolicy};

/// Write a configuration for `library` into `dir`.
pub fn run(dir: &Path, library: &str, fatal: FatalPolicy) -> Result<()> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    let mut config = BridgeConfig::default();
    config.bridge.library = library.to_string();
    config.bridge.fatal = fatal;
    std::fs::write(&path, config.to_toml())?;

    println!("Created {}", path.display());
    Ok(())
}
