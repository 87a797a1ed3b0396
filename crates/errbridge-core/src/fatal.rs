//! Protocol violations and the unrecoverable channel that reports them.
//!
//! Violations are bridge misuse (double registration, raising while an
//! earlier error is still unretrieved, raising a kind nobody registered).
//! They never travel as [`PendingError`]s: [`fatal`] logs them and then
//! either panics with the violation as payload or aborts the process,
//! depending on the process-wide [`FatalPolicy`].

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::kind::ErrorTag;
use crate::pending::PendingError;

/// Bridge misuse that cannot be repaired locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// An error was raised while an earlier one was still unretrieved.
    #[error(
        "FATAL: an earlier pending error from native code was missed \
         and never surfaced ({pending}); raised while pending: {raised}"
    )]
    MissedPendingError {
        pending: PendingError,
        raised: PendingError,
    },

    /// A one-time registration step ran a second time.
    #[error("FATAL: {what} registered more than once")]
    DuplicateRegistration { what: &'static str },

    /// A kind was raised that the host never supplied a constructor for.
    #[error("FATAL: no constructor registered for error kind {tag}")]
    UnregisteredKind { tag: ErrorTag },

    /// A bridge call arrived before the registration handshake completed.
    #[error("FATAL: {what} used before registration")]
    NotRegistered { what: &'static str },
}

/// How a protocol violation terminates the offending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// Panic with the [`ProtocolViolation`] as payload.
    #[default]
    Panic,
    /// Print the violation to stderr and abort the process.
    Abort,
}

impl FatalPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "panic" => Some(Self::Panic),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

impl std::fmt::Display for FatalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Panic => write!(f, "panic"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

static POLICY: AtomicU8 = AtomicU8::new(0);

/// Set the process-wide fatal policy.
pub fn set_fatal_policy(policy: FatalPolicy) {
    let raw = match policy {
        FatalPolicy::Panic => 0,
        FatalPolicy::Abort => 1,
    };
    POLICY.store(raw, Ordering::SeqCst);
}

/// The process-wide fatal policy currently in effect.
pub fn fatal_policy() -> FatalPolicy {
    match POLICY.load(Ordering::SeqCst) {
        1 => FatalPolicy::Abort,
        _ => FatalPolicy::Panic,
    }
}

/// Report a protocol violation and stop the current call.
pub fn fatal(violation: ProtocolViolation) -> ! {
    tracing::error!(%violation, "bridge protocol violation");
    match fatal_policy() {
        FatalPolicy::Panic => std::panic::panic_any(violation),
        FatalPolicy::Abort => {
            eprintln!("{violation}");
            std::process::abort()
        }
    }
}

/// Extract a [`ProtocolViolation`] from a panic payload, if that is what it carries.
pub fn violation_from_panic(payload: &(dyn std::any::Any + Send)) -> Option<&ProtocolViolation> {
    payload.downcast_ref::<ProtocolViolation>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ErrorKind;

    #[test]
    fn fatal_panics_with_violation_payload() {
        let payload = std::panic::catch_unwind(|| {
            fatal(ProtocolViolation::DuplicateRegistration {
                what: "error constructors",
            })
        })
        .unwrap_err();
        let violation = violation_from_panic(payload.as_ref()).unwrap();
        assert_eq!(
            violation,
            &ProtocolViolation::DuplicateRegistration {
                what: "error constructors"
            }
        );
    }

    #[test]
    fn missed_pending_message_names_both_errors() {
        let violation = ProtocolViolation::MissedPendingError {
            pending: PendingError::new(ErrorKind::IO, "first", None),
            raised: PendingError::new(ErrorKind::Overflow, "second", Some("first")),
        };
        let text = violation.to_string();
        assert!(text.starts_with("FATAL"));
        assert!(text.contains("IO: first"));
        assert!(text.contains("Overflow: second"));
    }

    #[test]
    fn parse_policy() {
        assert_eq!(FatalPolicy::parse("Abort"), Some(FatalPolicy::Abort));
        assert_eq!(FatalPolicy::parse("panic"), Some(FatalPolicy::Panic));
        assert_eq!(FatalPolicy::parse("ignore"), None);
        assert_eq!(FatalPolicy::default(), FatalPolicy::Panic);
    }
}
