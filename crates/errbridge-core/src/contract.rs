//! The registration contract shared with native code.
//!
//! Native code indexes the callback tables by position, so the list of
//! tags, their order and their constructor shapes is a compatibility
//! surface. Any change to it bumps [`CONTRACT_VERSION`].

use serde::Serialize;

use crate::kind::{ArgumentErrorKind, ErrorKind, ErrorTag};

/// Version of the callback layout handed over during the handshake.
pub const CONTRACT_VERSION: u32 = 1;

/// Which callback table an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Exception,
    Argument,
}

/// Parameters a constructor of this entry receives from native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shape {
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "message+paramName")]
    MessageAndParam,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message => write!(f, "(message)"),
            Self::MessageAndParam => write!(f, "(message, paramName)"),
        }
    }
}

/// One callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractEntry {
    /// Position within the family's callback table.
    pub slot: usize,
    pub tag: ErrorTag,
    pub family: Family,
    pub shape: Shape,
}

/// The complete, ordered callback layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationContract {
    pub version: u32,
    pub entries: Vec<ContractEntry>,
}

impl RegistrationContract {
    pub fn current() -> Self {
        let exceptions = ErrorKind::ALL.into_iter().map(|kind| ContractEntry {
            slot: kind.index(),
            tag: ErrorTag::Error(kind),
            family: Family::Exception,
            shape: Shape::Message,
        });
        let arguments = ArgumentErrorKind::ALL.into_iter().map(|kind| ContractEntry {
            slot: kind.index(),
            tag: ErrorTag::Argument(kind),
            family: Family::Argument,
            shape: Shape::MessageAndParam,
        });
        Self {
            version: CONTRACT_VERSION,
            entries: exceptions.chain(arguments).collect(),
        }
    }

    pub fn entries_in(&self, family: Family) -> impl Iterator<Item = &ContractEntry> {
        self.entries.iter().filter(move |e| e.family == family)
    }

    /// Human-readable table.
    pub fn render_text(&self) -> String {
        let mut out = format!("Registration contract v{}\n", self.version);
        for (family, title) in [
            (Family::Exception, "exception callbacks"),
            (Family::Argument, "argument callbacks"),
        ] {
            out.push_str(&format!("\n{title}:\n"));
            for entry in self.entries_in(family) {
                out.push_str(&format!(
                    "  [{:>2}] {:<20} {}\n",
                    entry.slot,
                    entry.tag.name(),
                    entry.shape
                ));
            }
        }
        out
    }
}
