// This is free and unencumbered software released into the public domain.

//! CLI helpers (error reporting, verbosity handling).
//!
//! This module must compile even when the crate feature `cli` is disabled,
//! because the library is built in non-CLI configurations.

#[cfg(feature = "cli")]
use crate::shared::CameraError;

#[cfg(feature = "cli")]
use std::process::ExitCode;

// sysexits.h-style codes.
#[cfg(feature = "cli")]
const EX_USAGE: u8 = 64;
#[cfg(feature = "cli")]
const EX_UNAVAILABLE: u8 = 69;
#[cfg(feature = "cli")]
const EX_SOFTWARE: u8 = 70;
#[cfg(feature = "cli")]
const EX_IOERR: u8 = 74;
#[cfg(feature = "cli")]
const EX_TEMPFAIL: u8 = 75;
#[cfg(feature = "cli")]
const EX_NOPERM: u8 = 77;
#[cfg(feature = "cli")]
const EX_CONFIG: u8 = 78;

#[cfg(feature = "cli")]
pub fn handle_error(err: &CameraError, verbose: u8) -> ExitCode {
    use tracing::{debug, error};

    error!(target: "camsession", %err, "camera command failed");
    if verbose >= 2 {
        debug!(target: "camsession", ?err, "detailed error");
    }

    report_error(err, verbose);
    map_error_to_exit_code(err)
}

#[cfg(feature = "cli")]
pub fn info_user(verbose: u8, msg: &str) {
    if verbose >= 1 {
        eprintln!("INFO: {msg}");
    }

    tracing::info!(target: "camsession", "{msg}");
}

#[cfg(feature = "cli")]
pub fn warn_user(verbose: u8, msg: &str) {
    if verbose >= 1 {
        eprintln!("WARN: {msg}");
    }

    tracing::warn!(target: "camsession", "{msg}");
}

#[cfg(feature = "cli")]
fn report_error(err: &CameraError, verbose: u8) {
    use std::error::Error as _;
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "ERROR: {err}");

    if verbose >= 2 {
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = writeln!(stderr, "  Caused by: {}", cause);
            source = cause.source();
        }
    }
}

#[cfg(feature = "cli")]
fn map_error_to_exit_code(err: &CameraError) -> ExitCode {
    let code = match err {
        CameraError::PermissionDenied(_) => EX_NOPERM,
        CameraError::DeviceUnavailable => EX_UNAVAILABLE,
        CameraError::NotFound(_) => EX_UNAVAILABLE,
        CameraError::NotConfigured => EX_USAGE,
        CameraError::ConfigurationFailed(_) => EX_CONFIG,
        CameraError::RecorderInitFailed(_) => EX_UNAVAILABLE,
        CameraError::StorageError { .. } => EX_IOERR,
        CameraError::Timeout(_) => EX_TEMPFAIL,
        CameraError::DeviceError { .. } => EX_SOFTWARE,
    };
    ExitCode::from(code)
}

// When `cli` is disabled, keep the module linkable without exposing CLI-only
// helpers.
#[cfg(not(feature = "cli"))]
#[inline]
pub fn info_user(_verbose: u8, _msg: &str) {}

#[cfg(not(feature = "cli"))]
#[inline]
pub fn warn_user(_verbose: u8, _msg: &str) {}
