//! Error propagation from native libraries into a host runtime.
//!
//! Native code cannot throw through an FFI call stack. Instead it raises
//! into the bridge, which parks exactly one [`PendingError`] per execution
//! context; the host takes it after the call returns and propagates it with
//! its own machinery. Misuse of the protocol is never turned into a domain
//! error: it goes through [`fatal`].
//!
//! ## Modules
//!
//! - [`kind`] — The closed error-kind taxonomy
//! - [`pending`] — The pending error value
//! - [`slot`] — Per-context error slot and pending ledger
//! - [`registry`] — Init-once constructor tables
//! - [`bridge`] — `raise` / `take_pending` facade
//! - [`registrar`] — C-ABI callbacks and the registration handshake
//! - [`contract`] — The documented callback layout
//! - [`fatal`] — Protocol violations and the fatal policy
//! - [`config`] — `errbridge.toml` parsing

pub mod bridge;
pub mod config;
pub mod contract;
pub mod error;
pub mod fatal;
pub mod kind;
pub mod pending;
pub mod registrar;
pub mod registry;
pub mod slot;

// Re-export key types for convenience
pub use bridge::ErrorBridge;
pub use config::BridgeConfig;
pub use contract::{RegistrationContract, CONTRACT_VERSION};
pub use error::BridgeError;
pub use fatal::{fatal, FatalPolicy, ProtocolViolation};
pub use kind::{ArgumentErrorKind, ErrorKind, ErrorTag};
pub use pending::PendingError;
pub use registrar::{CallbackRegistrar, LazyRegistrar, NativeEntryPoints};
pub use registry::{ArgumentConstructorTable, ErrorConstructorTable, ErrorRegistry};
pub use slot::{ErrorSlot, ParkedError, SlotAccess, ThreadLocalSlots};
