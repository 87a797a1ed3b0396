//! `errbridge.toml` configuration.
//!
//! ```toml
//! [bridge]
//! library = "gdalconst_wrap"
//! fatal = "abort"
//!
//! [logging]
//! filter = "errbridge_core=debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::fatal::FatalPolicy;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "errbridge.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// The `[bridge]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Native library whose registration entry points are called.
    #[serde(default = "default_library")]
    pub library: String,
    /// How protocol violations terminate.
    #[serde(default)]
    pub fatal: FatalPolicy,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            library: default_library(),
            fatal: FatalPolicy::default(),
        }
    }
}

fn default_library() -> String {
    "native".to_string()
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// Parse a configuration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(input)?;
        if config.bridge.library.trim().is_empty() {
            return Err(BridgeError::InvalidConfig {
                detail: "bridge.library must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Parse a configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> String {
        // Plain structs of strings and enums always serialize.
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
