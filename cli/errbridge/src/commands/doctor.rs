//! `errbridge doctor` — configuration and handshake diagnostics.
//!
//! The handshake check registers against an in-process loopback that plays
//! the native library: it records the callback tables it is given, and the
//! doctor then raises through those raw function pointers.

use std::ffi::CString;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{bail, Result};
use errbridge_core::registrar::{
    self, reclaim_host_string, ArgumentCallbacks, ExceptionCallbacks, StringCallback,
};
use errbridge_core::{
    ArgumentErrorKind, BridgeConfig, CallbackRegistrar, ErrorKind, ErrorTag, NativeEntryPoints,
    CONTRACT_VERSION,
};

static LOOPBACK_EXCEPTIONS: OnceLock<ExceptionCallbacks> = OnceLock::new();
static LOOPBACK_ARGUMENTS: OnceLock<ArgumentCallbacks> = OnceLock::new();
static LOOPBACK_STRING: OnceLock<StringCallback> = OnceLock::new();

unsafe extern "C" fn loopback_register_exceptions(callbacks: ExceptionCallbacks) {
    let _ = LOOPBACK_EXCEPTIONS.set(callbacks);
}

unsafe extern "C" fn loopback_register_arguments(callbacks: ArgumentCallbacks) {
    let _ = LOOPBACK_ARGUMENTS.set(callbacks);
}

unsafe extern "C" fn loopback_register_string(callback: StringCallback) {
    let _ = LOOPBACK_STRING.set(callback);
}

/// Print diagnostic information and run the loopback handshake.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("=== errbridge doctor ===");
    println!();
    println!("errbridge version:  {}", env!("CARGO_PKG_VERSION"));
    println!("Contract version:   {CONTRACT_VERSION}");
    println!();

    println!("--- Configuration ---");
    let config = match crate::config::find_and_load(project_dir) {
        Ok(Some((config, dir))) => {
            println!("  errbridge.toml: found at {}", dir.display());
            config
        }
        Ok(None) => {
            println!("  errbridge.toml: not found (using defaults)");
            BridgeConfig::default()
        }
        Err(e) => {
            println!("  errbridge.toml: error — {e:#}");
            BridgeConfig::default()
        }
    };
    println!("  Library:      {}", config.bridge.library);
    println!("  Fatal policy: {}", config.bridge.fatal);
    println!();

    println!("--- Loopback handshake ---");
    let checks = loopback_check(&config)?;
    for check in checks {
        println!("  ok  {check}");
    }
    Ok(())
}

fn loopback_check(config: &BridgeConfig) -> Result<Vec<String>> {
    let bridge = match registrar::global() {
        Some(bridge) => bridge,
        None => {
            // SAFETY: the loopback functions only store what they receive.
            let entry = unsafe {
                NativeEntryPoints::new(
                    loopback_register_exceptions,
                    loopback_register_arguments,
                    loopback_register_string,
                )
            };
            CallbackRegistrar::handshake_with_config(&entry, config)
        }
    };
    let mut passed = Vec::new();

    let (Some(exceptions), Some(arguments), Some(create_string)) = (
        LOOPBACK_EXCEPTIONS.get(),
        LOOPBACK_ARGUMENTS.get(),
        LOOPBACK_STRING.get(),
    ) else {
        bail!("native side did not receive every callback table");
    };
    passed.push("callback tables delivered".to_string());

    for kind in ErrorKind::ALL {
        let message = CString::new(format!("doctor {kind}"))?;
        unsafe { (exceptions.get(kind))(message.as_ptr()) };
        match bridge.take_pending() {
            Some(err) if err.tag() == ErrorTag::Error(kind) => {}
            other => bail!("{kind} callback delivered {other:?}"),
        }
    }
    passed.push(format!("{} exception callbacks", ErrorKind::ALL.len()));

    let param = CString::new("param")?;
    for kind in ArgumentErrorKind::ALL {
        let message = CString::new(format!("doctor {kind}"))?;
        unsafe { (arguments.get(kind))(message.as_ptr(), param.as_ptr()) };
        match bridge.take_pending() {
            Some(err)
                if err.tag() == ErrorTag::Argument(kind) && err.param_name() == Some("param") => {}
            other => bail!("{kind} callback delivered {other:?}"),
        }
    }
    passed.push(format!("{} argument callbacks", ArgumentErrorKind::ALL.len()));

    let native = CString::new("echo")?;
    let echoed = unsafe { reclaim_host_string(create_string(native.as_ptr())) };
    if echoed.as_deref() != Some("echo") {
        bail!("string callback returned {echoed:?}");
    }
    passed.push("string callback".to_string());

    if bridge.is_pending() || bridge.outstanding() != 0 {
        bail!("bridge left {} error(s) outstanding", bridge.outstanding());
    }
    passed.push("no errors outstanding".to_string());

    tracing::debug!(checks = passed.len(), "loopback handshake verified");
    Ok(passed)
}
