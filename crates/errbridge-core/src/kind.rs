//! The closed taxonomy of error kinds native code may raise.
//!
//! Two families exist: plain errors, whose constructors take a message, and
//! argument errors, whose constructors additionally take the name of the
//! offending parameter. The order of each `ALL` array is the callback-slot
//! order native code receives during the registration handshake.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Error kinds whose constructors take only a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
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
}

impl ErrorKind {
    /// Every kind, in callback-slot order.
    pub const ALL: [ErrorKind; 11] = [
        Self::Application,
        Self::Arithmetic,
        Self::DivideByZero,
        Self::IndexOutOfRange,
        Self::InvalidCast,
        Self::InvalidOperation,
        Self::IO,
        Self::NullReference,
        Self::OutOfMemory,
        Self::Overflow,
        Self::SystemGeneric,
    ];

    /// Position of this kind in the family's fixed-size tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::Arithmetic => "Arithmetic",
            Self::DivideByZero => "DivideByZero",
            Self::IndexOutOfRange => "IndexOutOfRange",
            Self::InvalidCast => "InvalidCast",
            Self::InvalidOperation => "InvalidOperation",
            Self::IO => "IO",
            Self::NullReference => "NullReference",
            Self::OutOfMemory => "OutOfMemory",
            Self::Overflow => "Overflow",
            Self::SystemGeneric => "SystemGeneric",
        }
    }

    /// Parse a kind name, ignoring case, `-` and `_`.
    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "application" => Some(Self::Application),
            "arithmetic" => Some(Self::Arithmetic),
            "dividebyzero" => Some(Self::DivideByZero),
            "indexoutofrange" => Some(Self::IndexOutOfRange),
            "invalidcast" => Some(Self::InvalidCast),
            "invalidoperation" => Some(Self::InvalidOperation),
            "io" => Some(Self::IO),
            "nullreference" => Some(Self::NullReference),
            "outofmemory" => Some(Self::OutOfMemory),
            "overflow" => Some(Self::Overflow),
            "systemgeneric" | "system" => Some(Self::SystemGeneric),
            _ => None,
        }
    }
}

/// Error kinds that carry the name of the offending parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentErrorKind {
    Argument,
    ArgumentNull,
    ArgumentOutOfRange,
}

impl ArgumentErrorKind {
    /// Every argument kind, in callback-slot order.
    pub const ALL: [ArgumentErrorKind; 3] =
        [Self::Argument, Self::ArgumentNull, Self::ArgumentOutOfRange];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Argument => "Argument",
            Self::ArgumentNull => "ArgumentNull",
            Self::ArgumentOutOfRange => "ArgumentOutOfRange",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "argument" => Some(Self::Argument),
            "argumentnull" => Some(Self::ArgumentNull),
            "argumentoutofrange" => Some(Self::ArgumentOutOfRange),
            _ => None,
        }
    }
}

/// A kind from either family, as stored on a pending error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorTag {
    Error(ErrorKind),
    Argument(ArgumentErrorKind),
}

impl ErrorTag {
    pub fn name(self) -> &'static str {
        match self {
            Self::Error(kind) => kind.name(),
            Self::Argument(kind) => kind.name(),
        }
    }

    /// Whether this tag belongs to the argument family.
    pub fn is_argument(self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Parse a tag from either family.
    pub fn parse(s: &str) -> Option<Self> {
        ErrorKind::parse(s)
            .map(Self::Error)
            .or_else(|| ArgumentErrorKind::parse(s).map(Self::Argument))
    }
}

impl std::str::FromStr for ErrorTag {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BridgeError::UnknownKind {
            name: s.to_string(),
        })
    }
}

impl From<ErrorKind> for ErrorTag {
    fn from(kind: ErrorKind) -> Self {
        Self::Error(kind)
    }
}

impl From<ArgumentErrorKind> for ErrorTag {
    fn from(kind: ArgumentErrorKind) -> Self {
        Self::Argument(kind)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for ArgumentErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
