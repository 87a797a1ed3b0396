//! Constructor tables for both error families.
//!
//! The host fills each family's table exactly once, before the first raise.
//! After that the tables are read-only and lookups take no lock.

use std::sync::OnceLock;

use crate::fatal::{fatal, ProtocolViolation};
use crate::kind::{ArgumentErrorKind, ErrorKind, ErrorTag};
use crate::pending::PendingError;

/// Builds a plain error from `(message, inner_message)`.
pub type ErrorConstructor = fn(&str, Option<&str>) -> PendingError;

/// Builds an argument error from `(message, param_name, inner_message)`.
pub type ArgumentConstructor = fn(&str, &str, Option<&str>) -> PendingError;

/// Fixed-size table of plain-error constructors, indexed by [`ErrorKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorConstructorTable {
    entries: [Option<ErrorConstructor>; ErrorKind::ALL.len()],
}

impl ErrorConstructorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the constructor for `kind`.
    pub fn with(mut self, kind: ErrorKind, ctor: ErrorConstructor) -> Self {
        self.entries[kind.index()] = Some(ctor);
        self
    }

    /// A constructor for every plain kind, each producing its own tag.
    pub fn standard() -> Self {
        macro_rules! standard_table {
            ($($kind:ident),* $(,)?) => {
                Self::new()$(.with(ErrorKind::$kind, |message, inner| {
                    PendingError::new(ErrorKind::$kind, message, inner)
                }))*
            };
        }
        standard_table!(
            Application,
            Arithmetic,
            DivideByZero,
            IndexOutOfRange,
            InvalidCast,
            InvalidOperation,
            IO,
            NullReference,
            OutOfMemory,
            Overflow,
            SystemGeneric,
        )
    }

    pub fn get(&self, kind: ErrorKind) -> Option<ErrorConstructor> {
        self.entries[kind.index()]
    }

    /// Kinds that have a constructor.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        ErrorKind::ALL
            .into_iter()
            .filter(|kind| self.entries[kind.index()].is_some())
            .collect()
    }
}

/// Fixed-size table of argument-error constructors, indexed by [`ArgumentErrorKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentConstructorTable {
    entries: [Option<ArgumentConstructor>; ArgumentErrorKind::ALL.len()],
}

impl ArgumentConstructorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ArgumentErrorKind, ctor: ArgumentConstructor) -> Self {
        self.entries[kind.index()] = Some(ctor);
        self
    }

    pub fn standard() -> Self {
        Self::new()
            .with(ArgumentErrorKind::Argument, |message, param, inner| {
                PendingError::argument(ArgumentErrorKind::Argument, message, param, inner)
            })
            .with(ArgumentErrorKind::ArgumentNull, |message, param, inner| {
                PendingError::argument(ArgumentErrorKind::ArgumentNull, message, param, inner)
            })
            .with(ArgumentErrorKind::ArgumentOutOfRange, |message, param, inner| {
                PendingError::argument(ArgumentErrorKind::ArgumentOutOfRange, message, param, inner)
            })
    }

    pub fn get(&self, kind: ArgumentErrorKind) -> Option<ArgumentConstructor> {
        self.entries[kind.index()]
    }

    pub fn kinds(&self) -> Vec<ArgumentErrorKind> {
        ArgumentErrorKind::ALL
            .into_iter()
            .filter(|kind| self.entries[kind.index()].is_some())
            .collect()
    }
}

/// Init-once mapping from error kinds to their constructors.
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    errors: OnceLock<ErrorConstructorTable>,
    arguments: OnceLock<ArgumentConstructorTable>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with both standard tables already registered.
    pub fn standard() -> Self {
        let registry = Self::new();
        registry.register_error_constructors(ErrorConstructorTable::standard());
        registry.register_argument_constructors(ArgumentConstructorTable::standard());
        registry
    }

    /// Register the plain-error constructors. A second call is fatal.
    pub fn register_error_constructors(&self, table: ErrorConstructorTable) {
        if self.errors.set(table).is_err() {
            fatal(ProtocolViolation::DuplicateRegistration {
                what: "error constructors",
            });
        }
        tracing::info!(kinds = ?table.kinds(), "registered error constructors");
    }

    /// Register the argument-error constructors. A second call is fatal.
    pub fn register_argument_constructors(&self, table: ArgumentConstructorTable) {
        if self.arguments.set(table).is_err() {
            fatal(ProtocolViolation::DuplicateRegistration {
                what: "argument error constructors",
            });
        }
        tracing::info!(kinds = ?table.kinds(), "registered argument error constructors");
    }

    /// Whether both families have been registered.
    pub fn is_ready(&self) -> bool {
        self.errors.get().is_some() && self.arguments.get().is_some()
    }

    /// Constructor for `kind`. Missing registration or a missing entry is fatal.
    pub fn error_constructor(&self, kind: ErrorKind) -> ErrorConstructor {
        let Some(table) = self.errors.get() else {
            fatal(ProtocolViolation::NotRegistered {
                what: "error constructors",
            });
        };
        match table.get(kind) {
            Some(ctor) => ctor,
            None => fatal(ProtocolViolation::UnregisteredKind {
                tag: ErrorTag::Error(kind),
            }),
        }
    }

    /// Constructor for argument `kind`. Missing registration or a missing entry is fatal.
    pub fn argument_constructor(&self, kind: ArgumentErrorKind) -> ArgumentConstructor {
        let Some(table) = self.arguments.get() else {
            fatal(ProtocolViolation::NotRegistered {
                what: "argument error constructors",
            });
        };
        match table.get(kind) {
            Some(ctor) => ctor,
            None => fatal(ProtocolViolation::UnregisteredKind {
                tag: ErrorTag::Argument(kind),
            }),
        }
    }
}
