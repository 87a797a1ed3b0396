//! The one-time registration handshake with native code.
//!
//! Native code cannot unwind into the host, so it reports failures by
//! calling back into host-provided `extern "C"` functions. During the
//! handshake the host installs the process-wide [`ErrorBridge`] (with the
//! standard constructor tables) and hands three `#[repr(C)]` callback
//! tables to the native library's registration entry points:
//!
//! - [`ExceptionCallbacks`]: one `(message)` callback per [`ErrorKind`]
//! - [`ArgumentCallbacks`]: one `(message, param_name)` callback per
//!   [`ArgumentErrorKind`]
//! - a [`StringCallback`] that copies a native string into host-owned memory
//!
//! Field order of the callback tables is the registration contract; see
//! [`crate::contract`].

use std::borrow::Cow;
use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::bridge::ErrorBridge;
use crate::config::BridgeConfig;
use crate::fatal::{fatal, set_fatal_policy, FatalPolicy, ProtocolViolation};
use crate::kind::{ArgumentErrorKind, ErrorKind};

/// Callback native code invokes to raise a plain error.
pub type ExceptionCallback = unsafe extern "C" fn(message: *const c_char);

/// Callback native code invokes to raise an argument error.
pub type ArgumentCallback = unsafe extern "C" fn(message: *const c_char, param_name: *const c_char);

/// Callback that copies a native string into a host-owned allocation.
pub type StringCallback = unsafe extern "C" fn(native: *const c_char) -> *mut c_char;

/// Plain-error callbacks, in [`ErrorKind::ALL`] order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExceptionCallbacks {
    pub application: ExceptionCallback,
    pub arithmetic: ExceptionCallback,
    pub divide_by_zero: ExceptionCallback,
    pub index_out_of_range: ExceptionCallback,
    pub invalid_cast: ExceptionCallback,
    pub invalid_operation: ExceptionCallback,
    pub io: ExceptionCallback,
    pub null_reference: ExceptionCallback,
    pub out_of_memory: ExceptionCallback,
    pub overflow: ExceptionCallback,
    pub system: ExceptionCallback,
}

/// Argument-error callbacks, in [`ArgumentErrorKind::ALL`] order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ArgumentCallbacks {
    pub argument: ArgumentCallback,
    pub argument_null: ArgumentCallback,
    pub argument_out_of_range: ArgumentCallback,
}

macro_rules! exception_callbacks {
    ($($field:ident => $func:ident($kind:ident)),* $(,)?) => {
        $(
            unsafe extern "C" fn $func(message: *const c_char) {
                let message = native_str(message);
                installed("exception callback").raise(ErrorKind::$kind, &message);
            }
        )*

        impl ExceptionCallbacks {
            /// The host's callbacks, each raising its own kind on the global bridge.
            pub fn host() -> Self {
                Self { $($field: $func),* }
            }

            /// The callback for `kind`.
            pub fn get(&self, kind: ErrorKind) -> ExceptionCallback {
                match kind {
                    $(ErrorKind::$kind => self.$field,)*
                }
            }
        }
    };
}

exception_callbacks!(
    application => raise_application(Application),
    arithmetic => raise_arithmetic(Arithmetic),
    divide_by_zero => raise_divide_by_zero(DivideByZero),
    index_out_of_range => raise_index_out_of_range(IndexOutOfRange),
    invalid_cast => raise_invalid_cast(InvalidCast),
    invalid_operation => raise_invalid_operation(InvalidOperation),
    io => raise_io(IO),
    null_reference => raise_null_reference(NullReference),
    out_of_memory => raise_out_of_memory(OutOfMemory),
    overflow => raise_overflow(Overflow),
    system => raise_system(SystemGeneric),
);

macro_rules! argument_callbacks {
    ($($field:ident => $func:ident($kind:ident)),* $(,)?) => {
        $(
            unsafe extern "C" fn $func(message: *const c_char, param_name: *const c_char) {
                let message = native_str(message);
                let param_name = native_str(param_name);
                installed("argument callback").raise_argument(
                    ArgumentErrorKind::$kind,
                    &message,
                    &param_name,
                );
            }
        )*

        impl ArgumentCallbacks {
            pub fn host() -> Self {
                Self { $($field: $func),* }
            }

            pub fn get(&self, kind: ArgumentErrorKind) -> ArgumentCallback {
                match kind {
                    $(ArgumentErrorKind::$kind => self.$field,)*
                }
            }
        }
    };
}

argument_callbacks!(
    argument => raise_argument(Argument),
    argument_null => raise_argument_null(ArgumentNull),
    argument_out_of_range => raise_argument_out_of_range(ArgumentOutOfRange),
);

/// Copy a native string into host memory. Release it with [`reclaim_host_string`].
///
/// # Safety
///
/// `native` must be null or point to a NUL-terminated string.
pub unsafe extern "C" fn create_host_string(native: *const c_char) -> *mut c_char {
    match CString::new(native_str(native).into_owned()) {
        Ok(owned) => owned.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Take back a string produced by [`create_host_string`].
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`create_host_string`] that has
/// not been reclaimed yet.
pub unsafe fn reclaim_host_string(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let owned = CString::from_raw(ptr);
    Some(owned.to_string_lossy().into_owned())
}

/// Null becomes the empty string; invalid UTF-8 is replaced.
unsafe fn native_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Registration entry points exported by the native library.
#[derive(Debug, Clone, Copy)]
pub struct NativeEntryPoints {
    register_exceptions: unsafe extern "C" fn(ExceptionCallbacks),
    register_arguments: unsafe extern "C" fn(ArgumentCallbacks),
    register_string: unsafe extern "C" fn(StringCallback),
}

impl NativeEntryPoints {
    /// # Safety
    ///
    /// Each function must be safe to call once with the host's callback
    /// tables, and must not call back into the registrar while doing so.
    pub const unsafe fn new(
        register_exceptions: unsafe extern "C" fn(ExceptionCallbacks),
        register_arguments: unsafe extern "C" fn(ArgumentCallbacks),
        register_string: unsafe extern "C" fn(StringCallback),
    ) -> Self {
        Self {
            register_exceptions,
            register_arguments,
            register_string,
        }
    }
}

static BRIDGE: OnceLock<ErrorBridge> = OnceLock::new();
static HANDSHAKE_STARTED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static IN_HANDSHAKE: Cell<bool> = const { Cell::new(false) };
}

/// The process-wide bridge, once the handshake has installed it.
pub fn global() -> Option<&'static ErrorBridge> {
    BRIDGE.get()
}

fn installed(what: &'static str) -> &'static ErrorBridge {
    match BRIDGE.get() {
        Some(bridge) => bridge,
        None => fatal(ProtocolViolation::NotRegistered { what }),
    }
}

/// Performs the registration handshake.
pub struct CallbackRegistrar;

impl CallbackRegistrar {
    /// Install the global bridge and hand the callbacks to native code.
    ///
    /// Runs at most once per process; a repeated or re-entrant call is a
    /// fatal [`ProtocolViolation::DuplicateRegistration`].
    pub fn handshake(
        entry: &NativeEntryPoints,
        library: &str,
        policy: FatalPolicy,
    ) -> &'static ErrorBridge {
        if HANDSHAKE_STARTED.swap(true, Ordering::SeqCst) {
            fatal(ProtocolViolation::DuplicateRegistration {
                what: "callback handshake",
            });
        }
        set_fatal_policy(policy);

        // Constructors are in place before native code can call anything.
        let bridge = BRIDGE.get_or_init(ErrorBridge::standard);

        IN_HANDSHAKE.with(|flag| flag.set(true));
        // SAFETY: `NativeEntryPoints::new` is the caller's promise that
        // these are valid registration functions.
        unsafe {
            (entry.register_exceptions)(ExceptionCallbacks::host());
            (entry.register_arguments)(ArgumentCallbacks::host());
            (entry.register_string)(create_host_string);
        }
        IN_HANDSHAKE.with(|flag| flag.set(false));

        tracing::info!(library, policy = %policy, "native callback handshake complete");
        bridge
    }

    /// [`handshake`](Self::handshake) with settings from a loaded configuration.
    pub fn handshake_with_config(
        entry: &NativeEntryPoints,
        config: &BridgeConfig,
    ) -> &'static ErrorBridge {
        Self::handshake(entry, &config.bridge.library, config.bridge.fatal)
    }

    /// Whether the handshake has started in this process.
    pub fn is_registered() -> bool {
        HANDSHAKE_STARTED.load(Ordering::SeqCst)
    }
}

/// A `static`-friendly registrar that performs the handshake on first use.
///
/// ```ignore
/// static HOST: LazyRegistrar = LazyRegistrar::new(
///     unsafe { NativeEntryPoints::new(reg_exceptions, reg_arguments, reg_string) },
///     "gdalconst_wrap",
///     FatalPolicy::Abort,
/// );
///
/// let bridge = HOST.bridge();
/// ```
pub struct LazyRegistrar {
    entry: NativeEntryPoints,
    library: &'static str,
    policy: FatalPolicy,
    bridge: OnceLock<&'static ErrorBridge>,
}

impl LazyRegistrar {
    pub const fn new(entry: NativeEntryPoints, library: &'static str, policy: FatalPolicy) -> Self {
        Self {
            entry,
            library,
            policy,
            bridge: OnceLock::new(),
        }
    }

    /// The global bridge, running the handshake first if nobody has yet.
    pub fn bridge(&self) -> &'static ErrorBridge {
        if IN_HANDSHAKE.with(Cell::get) {
            fatal(ProtocolViolation::DuplicateRegistration {
                what: "callback handshake (re-entrant)",
            });
        }
        self.bridge.get_or_init(|| {
            CallbackRegistrar::handshake(&self.entry, self.library, self.policy)
        })
    }
}
