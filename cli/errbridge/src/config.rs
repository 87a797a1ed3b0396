//! `errbridge.toml` discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use errbridge_core::config::CONFIG_FILE_NAME;
use errbridge_core::BridgeConfig;

/// Search upward from `start_dir` for `errbridge.toml`, returning the parsed
/// configuration and the directory it was found in.
pub fn find_and_load(start_dir: &Path) -> Result<Option<(BridgeConfig, PathBuf)>> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            let config = BridgeConfig::load(&candidate)
                .with_context(|| format!("loading {}", candidate.display()))?;
            return Ok(Some((config, dir)));
        }
        if !dir.pop() {
            return Ok(None);
        }
    }
}

/// The discovered configuration, or defaults when there is none.
pub fn load_or_default(start_dir: &Path) -> Result<BridgeConfig> {
    Ok(find_and_load(start_dir)?
        .map(|(config, _)| config)
        .unwrap_or_default())
}
