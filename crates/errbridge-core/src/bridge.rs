//! The bridge facade: native code raises, the host takes.
//!
//! `raise` never throws into the native stack. It builds the error with the
//! registered constructor and parks it in the calling context's slot. After
//! the native call returns, the host asks [`ErrorBridge::take_pending`] and
//! propagates what it gets back through its own error channel.
//!
//! At most one error may be unretrieved per context. Raising a second one is
//! a [`ProtocolViolation::MissedPendingError`]: the new error is built with
//! the old one chained in, and the call terminates through [`fatal`].

use std::sync::Arc;

use crate::fatal::{fatal, ProtocolViolation};
use crate::kind::{ArgumentErrorKind, ErrorKind};
use crate::pending::PendingError;
use crate::registry::ErrorRegistry;
use crate::slot::{ErrorSlot, SlotAccess, ThreadLocalSlots};

/// Separator used when an argument error absorbs the message of an earlier one.
pub const INNER_EXCEPTION_SEPARATOR: &str = " Inner Exception: ";

/// Error handoff between native code and the host.
#[derive(Debug)]
pub struct ErrorBridge<A: SlotAccess = ThreadLocalSlots> {
    registry: Arc<ErrorRegistry>,
    slot: ErrorSlot<A>,
}

impl ErrorBridge<ThreadLocalSlots> {
    /// A bridge with per-thread slots over `registry`.
    pub fn new(registry: Arc<ErrorRegistry>) -> Self {
        Self::with_slot(registry, ErrorSlot::new())
    }

    /// A bridge over a registry holding the standard constructors.
    pub fn standard() -> Self {
        Self::new(Arc::new(ErrorRegistry::standard()))
    }
}

impl<A: SlotAccess> ErrorBridge<A> {
    pub fn with_slot(registry: Arc<ErrorRegistry>, slot: ErrorSlot<A>) -> Self {
        Self { registry, slot }
    }

    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    /// Raise a plain error on behalf of native code.
    ///
    /// If the context already holds an error, that error is removed from the
    /// slot and chained as `inner_message` of the new one, and both leave
    /// through a fatal [`ProtocolViolation::MissedPendingError`]. The slot is
    /// empty afterwards, same as after a violating [`ErrorSlot::set`].
    pub fn raise(&self, kind: ErrorKind, message: &str) {
        let ctor = self.registry.error_constructor(kind);
        match self.slot.take() {
            Some(pending) => {
                let raised = ctor(message, Some(pending.message()));
                fatal(ProtocolViolation::MissedPendingError { pending, raised });
            }
            None => {
                let error = ctor(message, None);
                tracing::debug!(kind = %kind, msg = message, "native error raised");
                self.slot.set(error);
            }
        }
    }

    /// Raise an argument error on behalf of native code.
    ///
    /// Unlike [`raise`](Self::raise), a superseded error is folded into the
    /// message text as `"<message> Inner Exception: <old message>"` instead of
    /// `inner_message`. This applies to all three argument kinds, including
    /// plain `Argument`, so hosts matching on message text see one format.
    pub fn raise_argument(&self, kind: ArgumentErrorKind, message: &str, param_name: &str) {
        let ctor = self.registry.argument_constructor(kind);
        match self.slot.take() {
            Some(pending) => {
                let message =
                    format!("{message}{INNER_EXCEPTION_SEPARATOR}{}", pending.message());
                let raised = ctor(&message, param_name, None);
                fatal(ProtocolViolation::MissedPendingError { pending, raised });
            }
            None => {
                let error = ctor(message, param_name, None);
                tracing::debug!(
                    kind = %kind,
                    msg = message,
                    param_name,
                    "native argument error raised"
                );
                self.slot.set(error);
            }
        }
    }

    /// Retrieve and clear the calling context's pending error.
    pub fn take_pending(&self) -> Option<PendingError> {
        let taken = self.slot.take();
        if let Some(error) = &taken {
            tracing::debug!(kind = %error.tag(), msg = error.message(), "pending error taken");
        }
        taken
    }

    /// Whether the calling context has an unretrieved error.
    pub fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }

    /// Unretrieved errors across all contexts. Diagnostic only.
    pub fn outstanding(&self) -> usize {
        self.slot.outstanding()
    }

    /// Turn the calling context's pending error, if any, into an `Err`.
    pub fn check(&self) -> Result<(), PendingError> {
        match self.take_pending() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Run a native call and surface any error it raised.
    pub fn call<T>(&self, native: impl FnOnce() -> T) -> Result<T, PendingError> {
        let value = native();
        self.check()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatal::violation_from_panic;
    use crate::kind::ErrorTag;
    use crate::registry::{ArgumentConstructorTable, ErrorConstructorTable};

    fn missed(f: impl FnOnce()) -> (PendingError, PendingError) {
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).unwrap_err();
        match violation_from_panic(payload.as_ref()).cloned() {
            Some(ProtocolViolation::MissedPendingError { pending, raised }) => (pending, raised),
            other => panic!("expected a missed pending error, got {other:?}"),
        }
    }

    #[test]
    fn every_kind_round_trips() {
        let bridge = ErrorBridge::standard();
        for kind in ErrorKind::ALL {
            bridge.raise(kind, "plain failure");
            let err = bridge.take_pending().unwrap();
            assert_eq!(err.tag(), ErrorTag::Error(kind));
            assert_eq!(err.message(), "plain failure");
            assert_eq!(err.inner_message(), None);
            assert_eq!(bridge.take_pending(), None);
        }
    }

    #[test]
    fn every_argument_kind_carries_param_name() {
        let bridge = ErrorBridge::standard();
        for kind in ArgumentErrorKind::ALL {
            bridge.raise_argument(kind, "bad value", "band");
            let err = bridge.take_pending().unwrap();
            assert_eq!(err.tag(), ErrorTag::Argument(kind));
            assert_eq!(err.param_name(), Some("band"));
            assert!(!bridge.is_pending());
        }
    }

    #[test]
    fn second_raise_is_fatal_and_chains_inner_message() {
        let bridge = ErrorBridge::standard();
        bridge.raise(ErrorKind::IO, "disk read failed");
        let (pending, raised) = missed(|| bridge.raise(ErrorKind::Overflow, "too large"));
        assert_eq!(pending.message(), "disk read failed");
        assert_eq!(raised.tag(), ErrorTag::Error(ErrorKind::Overflow));
        assert_eq!(raised.inner_message(), Some("disk read failed"));
        assert!(!bridge.is_pending());
        assert_eq!(bridge.outstanding(), 0);
    }

    #[test]
    fn plain_argument_kind_also_folds_message() {
        let bridge = ErrorBridge::standard();
        bridge.raise(ErrorKind::InvalidOperation, "not open");
        let (_, raised) =
            missed(|| bridge.raise_argument(ArgumentErrorKind::Argument, "bad band", "band"));
        assert_eq!(raised.message(), "bad band Inner Exception: not open");
        assert_eq!(raised.inner_message(), None);
    }

    #[test]
    fn second_argument_raise_folds_message() {
        let bridge = ErrorBridge::standard();
        bridge.raise(ErrorKind::IO, "disk read failed");
        let (_, raised) = missed(|| {
            bridge.raise_argument(ArgumentErrorKind::ArgumentNull, "value required", "path")
        });
        assert_eq!(raised.message(), "value required Inner Exception: disk read failed");
        assert_eq!(raised.inner_message(), None);
        assert_eq!(raised.param_name(), Some("path"));
    }

    #[test]
    fn check_and_call_surface_errors() {
        let bridge = ErrorBridge::standard();
        assert_eq!(bridge.check(), Ok(()));

        let ok = bridge.call(|| 42);
        assert_eq!(ok, Ok(42));

        let failed = bridge.call(|| {
            bridge.raise(ErrorKind::DivideByZero, "band ratio");
            0
        });
        let err = failed.unwrap_err();
        assert_eq!(err.tag(), ErrorTag::Error(ErrorKind::DivideByZero));
        assert_eq!(bridge.outstanding(), 0);
    }

    #[test]
    fn custom_constructors_are_used() {
        let registry = ErrorRegistry::new();
        registry.register_error_constructors(
            ErrorConstructorTable::new().with(ErrorKind::IO, |message, inner| {
                PendingError::new(ErrorKind::IO, &format!("gdal: {message}"), inner)
            }),
        );
        registry.register_argument_constructors(ArgumentConstructorTable::new());
        let bridge = ErrorBridge::new(Arc::new(registry));
        bridge.raise(ErrorKind::IO, "open failed");
        assert_eq!(bridge.take_pending().unwrap().message(), "gdal: open failed");
    }
}
