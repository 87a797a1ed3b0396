//! `errbridge simulate` — raise one error and show what the host receives.

use anyhow::{bail, Result};
use errbridge_core::{ErrorBridge, ErrorTag, PendingError};
use serde::Serialize;

/// What the host side observed around one raise.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub pending_after_raise: bool,
    pub outstanding_after_raise: usize,
    pub received: PendingError,
    pub pending_after_take: bool,
}

/// Raise `kind` on a fresh bridge and take it back.
pub fn simulate(kind: &str, message: &str, param: Option<&str>) -> Result<Outcome> {
    let tag: ErrorTag = kind.parse()?;
    let bridge = ErrorBridge::standard();
    match (tag, param) {
        (ErrorTag::Error(kind), None) => bridge.raise(kind, message),
        (ErrorTag::Argument(kind), Some(param)) => bridge.raise_argument(kind, message, param),
        (ErrorTag::Error(kind), Some(_)) => bail!("{kind} does not take --param"),
        (ErrorTag::Argument(kind), None) => bail!("{kind} requires --param"),
    }
    let pending_after_raise = bridge.is_pending();
    let outstanding_after_raise = bridge.outstanding();
    let Some(received) = bridge.take_pending() else {
        bail!("raised error was not pending");
    };
    Ok(Outcome {
        pending_after_raise,
        outstanding_after_raise,
        received,
        pending_after_take: bridge.is_pending(),
    })
}

pub fn run(kind: &str, message: &str, param: Option<&str>, json: bool) -> Result<()> {
    let outcome = simulate(kind, message, param)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("host received: {}", outcome.received);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use errbridge_core::{ArgumentErrorKind, ErrorKind};

    #[test]
    fn simulate_plain_error() {
        let outcome = simulate("io", "disk read failed", None).unwrap();
        assert!(outcome.pending_after_raise);
        assert_eq!(outcome.outstanding_after_raise, 1);
        assert!(!outcome.pending_after_take);
        assert_eq!(outcome.received.tag(), ErrorTag::Error(ErrorKind::IO));
        assert_eq!(outcome.received.message(), "disk read failed");
    }

    #[test]
    fn simulate_argument_error() {
        let outcome = simulate("ArgumentNull", "value required", Some("path")).unwrap();
        let err = outcome.received;
        assert_eq!(err.tag(), ErrorTag::Argument(ArgumentErrorKind::ArgumentNull));
        assert_eq!(err.param_name(), Some("path"));
    }

    #[test]
    fn param_must_match_family() {
        assert!(simulate("io", "x", Some("p")).is_err());
        assert!(simulate("argument", "x", None).is_err());
        assert!(simulate("segfault", "x", None).is_err());
    }
}
