//! End-to-end properties of the raise / take protocol.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;

use errbridge_core::fatal::violation_from_panic;
use errbridge_core::{
    ArgumentConstructorTable, ArgumentErrorKind, ErrorBridge, ErrorConstructorTable, ErrorKind,
    ErrorRegistry, ErrorTag, PendingError, ProtocolViolation,
};

fn partial_bridge() -> ErrorBridge {
    let registry = ErrorRegistry::new();
    registry.register_error_constructors(
        ErrorConstructorTable::new().with(ErrorKind::IO, |message, inner| {
            PendingError::new(ErrorKind::IO, message, inner)
        }),
    );
    registry.register_argument_constructors(ArgumentConstructorTable::new().with(
        ArgumentErrorKind::ArgumentNull,
        |message, param, inner| {
            PendingError::argument(ArgumentErrorKind::ArgumentNull, message, param, inner)
        },
    ));
    ErrorBridge::new(Arc::new(registry))
}

#[test]
fn io_and_argument_null_round_trip() {
    let bridge = partial_bridge();

    bridge.raise(ErrorKind::IO, "disk read failed");
    let err = bridge.take_pending().expect("IO error pending");
    assert_eq!(err.tag(), ErrorTag::Error(ErrorKind::IO));
    assert_eq!(err.message(), "disk read failed");
    assert_eq!(bridge.take_pending(), None);

    bridge.raise_argument(ArgumentErrorKind::ArgumentNull, "value required", "path");
    let err = bridge.take_pending().expect("argument error pending");
    assert_eq!(err.tag(), ErrorTag::Argument(ArgumentErrorKind::ArgumentNull));
    assert!(err.message().contains("value required"));
    assert_eq!(err.param_name(), Some("path"));
}

#[test]
fn raising_an_unregistered_kind_is_fatal() {
    let bridge = partial_bridge();
    let payload =
        catch_unwind(AssertUnwindSafe(|| bridge.raise(ErrorKind::Overflow, "nope"))).unwrap_err();
    assert_eq!(
        violation_from_panic(payload.as_ref()),
        Some(&ProtocolViolation::UnregisteredKind {
            tag: ErrorTag::Error(ErrorKind::Overflow)
        })
    );
    assert!(!bridge.is_pending());
}

#[test]
fn double_raise_is_observed_as_fatal_not_overwrite() {
    let bridge = ErrorBridge::standard();
    bridge.raise(ErrorKind::IO, "first");
    let payload =
        catch_unwind(AssertUnwindSafe(|| bridge.raise(ErrorKind::IO, "second"))).unwrap_err();
    assert!(matches!(
        violation_from_panic(payload.as_ref()),
        Some(ProtocolViolation::MissedPendingError { .. })
    ));
    // Neither error is left behind to be mistaken for an ordinary one.
    assert_eq!(bridge.take_pending(), None);
    assert_eq!(bridge.outstanding(), 0);
}

#[test]
fn take_pending_is_idempotent_when_empty() {
    let bridge = ErrorBridge::standard();
    for _ in 0..100 {
        assert_eq!(bridge.take_pending(), None);
        assert!(!bridge.is_pending());
    }
}

#[test]
fn errors_do_not_leak_between_threads() {
    let bridge = Arc::new(ErrorBridge::standard());
    let raised = Arc::new(Barrier::new(2));
    let checked = Arc::new(Barrier::new(2));

    let a = {
        let (bridge, raised, checked) = (bridge.clone(), raised.clone(), checked.clone());
        thread::spawn(move || {
            bridge.raise(ErrorKind::InvalidOperation, "only on A");
            raised.wait();
            checked.wait();
            assert!(bridge.is_pending());
            bridge.take_pending()
        })
    };
    let b = {
        let bridge = bridge.clone();
        thread::spawn(move || {
            raised.wait();
            let seen = (bridge.is_pending(), bridge.take_pending());
            checked.wait();
            seen
        })
    };

    assert_eq!(b.join().unwrap(), (false, None));
    let from_a = a.join().unwrap().expect("A keeps its error");
    assert_eq!(from_a.message(), "only on A");
    assert_eq!(bridge.outstanding(), 0);
}

#[test]
fn concurrent_raise_and_take_keeps_the_ledger_balanced() {
    let bridge = Arc::new(ErrorBridge::standard());
    let workers: Vec<_> = (0..8)
        .map(|n| {
            let bridge = bridge.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    let message = format!("worker {n} call {i}");
                    bridge.raise_argument(ArgumentErrorKind::ArgumentOutOfRange, &message, "index");
                    let err = bridge.take_pending().expect("own error");
                    assert_eq!(err.message(), message);
                    assert_eq!(bridge.take_pending(), None);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(bridge.outstanding(), 0);
}

#[test]
fn host_propagates_with_question_mark() {
    fn open_dataset(bridge: &ErrorBridge, path: &str) -> Result<usize, PendingError> {
        let handle = bridge.call(|| {
            if path.is_empty() {
                bridge.raise_argument(ArgumentErrorKind::Argument, "empty path", "path");
                return 0;
            }
            7
        })?;
        Ok(handle)
    }

    let bridge = ErrorBridge::standard();
    assert_eq!(open_dataset(&bridge, "scene.tif"), Ok(7));
    let err = open_dataset(&bridge, "").unwrap_err();
    assert_eq!(err.to_string(), "Argument: empty path (parameter 'path')");
}
