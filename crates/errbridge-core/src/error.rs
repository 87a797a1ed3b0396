//! Recoverable errors of the bridge crate.
//!
//! Protocol violations are not here: they go through [`crate::fatal`].

/// Errors from configuration loading and name parsing.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// An error kind name matched neither family.
    #[error("unknown error kind: {name}")]
    UnknownKind { name: String },

    /// A configuration value failed validation.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
