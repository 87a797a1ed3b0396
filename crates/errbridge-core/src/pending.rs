//! Pending errors: domain failures raised by native code, awaiting the host.

use serde::{Deserialize, Serialize};

use crate::kind::{ArgumentErrorKind, ErrorKind, ErrorTag};

/// A domain error raised by native code and not yet retrieved by the host.
///
/// Values are only produced by registered constructors and are never
/// mutated afterwards; the host receives ownership through
/// [`ErrorBridge::take_pending`](crate::ErrorBridge::take_pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error(
    "{tag}: {message}{}{}",
    param_suffix(.param_name),
    inner_suffix(.inner_message)
)]
pub struct PendingError {
    tag: ErrorTag,
    message: String,
    param_name: Option<String>,
    inner_message: Option<String>,
}

impl PendingError {
    /// Build a plain error. Used by constructor functions.
    pub fn new(kind: ErrorKind, message: &str, inner_message: Option<&str>) -> Self {
        Self {
            tag: ErrorTag::Error(kind),
            message: message.to_string(),
            param_name: None,
            inner_message: inner_message.map(str::to_string),
        }
    }

    /// Build an argument error. Used by constructor functions.
    pub fn argument(
        kind: ArgumentErrorKind,
        message: &str,
        param_name: &str,
        inner_message: Option<&str>,
    ) -> Self {
        Self {
            tag: ErrorTag::Argument(kind),
            message: message.to_string(),
            param_name: Some(param_name.to_string()),
            inner_message: inner_message.map(str::to_string),
        }
    }

    pub fn tag(&self) -> ErrorTag {
        self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    /// Message of the error this one superseded, if any.
    pub fn inner_message(&self) -> Option<&str> {
        self.inner_message.as_deref()
    }
}

fn param_suffix(param_name: &Option<String>) -> String {
    match param_name {
        Some(param) => format!(" (parameter '{param}')"),
        None => String::new(),
    }
}

fn inner_suffix(inner_message: &Option<String>) -> String {
    match inner_message {
        Some(inner) => format!(" [inner: {inner}]"),
        None => String::new(),
    }
}
