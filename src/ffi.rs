//! FFI bindings for Mudra Flow
//!
//! C-compatible functions for embedding a session in a host UI. Frames and
//! telemetry go in as C strings; results come back as JSON strings that must be
//! freed by the caller using `mudra_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::FlowError;
use crate::events::Event;
use crate::landmarks::Detection;
use crate::session::SessionEngine;
use crate::telemetry::{parse_line, BiometricEstimator};
use crate::types::BiometricSnapshot;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize to a C string, recording the error on failure
fn json_to_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&FlowError::from(e).to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a session and the biometric estimator feeding it
pub struct MudraSessionHandle {
    engine: SessionEngine,
    estimator: BiometricEstimator,
}

impl MudraSessionHandle {
    fn new(config: EngineConfig) -> Self {
        let mut estimator = BiometricEstimator::new(config.telemetry.clone());
        estimator.set_connected(true);
        Self {
            engine: SessionEngine::new(config),
            estimator,
        }
    }

    fn adopt(&mut self, snapshot: BiometricSnapshot) -> TelemetryOutput {
        let events = self.engine.apply_biometrics(snapshot.clone());
        TelemetryOutput {
            biometrics: snapshot,
            events,
        }
    }
}

/// Result of feeding telemetry into a session
#[derive(Debug, Serialize)]
struct TelemetryOutput {
    biometrics: BiometricSnapshot,
    events: Vec<Event>,
}

/// Create a new session.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for the
///   default configuration.
/// - Returns a pointer to a newly allocated session.
/// - Must be freed with `mudra_session_free`.
/// - Returns NULL on error; call `mudra_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_new(config_json: *const c_char) -> *mut MudraSessionHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match EngineConfig::from_json(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(MudraSessionHandle::new(config)))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mudra_session_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_free(session: *mut MudraSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Process one frame of detector output.
///
/// `frame_json` is a detection object: `{"hands": [[{x, y}, ...]], "face": [...]}`.
/// Returns the frame output (snapshot and events) as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mudra_session_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `mudra_free_string`.
/// - Returns NULL on error; call `mudra_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_process_frame(
    session: *mut MudraSessionHandle,
    frame_json: *const c_char,
    now_ms: u64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    let json_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };

    match Detection::from_json(&json_str) {
        Ok(detection) => json_to_cstr(&handle.engine.process_frame(&detection, now_ms)),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Feed one raw telemetry line, e.g. `BPM:72,SpO2:98,BEAT:1`.
///
/// Returns `{"biometrics": ..., "events": [...]}` as JSON. A line carrying no
/// recognized field is ignored: NULL is returned and no error is set.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mudra_session_new`.
/// - `line` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `mudra_free_string`.
/// - Returns NULL on error; call `mudra_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_push_telemetry(
    session: *mut MudraSessionHandle,
    line: *const c_char,
    now_ms: u64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    let line_str = match cstr_to_string(line) {
        Some(s) => s,
        None => {
            set_last_error("Invalid telemetry string pointer");
            return ptr::null_mut();
        }
    };

    let Some(parsed) = parse_line(&line_str) else {
        return ptr::null_mut();
    };
    match handle.estimator.ingest(&parsed, now_ms) {
        Some(snapshot) => json_to_cstr(&handle.adopt(snapshot)),
        None => ptr::null_mut(),
    }
}

/// Advance the telemetry clock without a new line.
///
/// Returns the reset biometrics as JSON once the stream has gone stale, and
/// NULL (with no error set) otherwise.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mudra_session_new`.
/// - Returns a newly allocated string that must be freed with `mudra_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_tick(
    session: *mut MudraSessionHandle,
    now_ms: u64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    match handle.estimator.tick(now_ms) {
        Some(snapshot) => json_to_cstr(&handle.adopt(snapshot)),
        None => ptr::null_mut(),
    }
}

/// Build the session report.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mudra_session_new`.
/// - Returns a newly allocated string that must be freed with `mudra_free_string`.
/// - Returns NULL on error; call `mudra_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mudra_session_report(session: *mut MudraSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;

    match handle.engine.report().to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Mudra Flow functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Mudra Flow function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mudra_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Mudra Flow call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn mudra_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn mudra_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let value = serde_json::from_str(CStr::from_ptr(ptr).to_str().unwrap()).unwrap();
        mudra_free_string(ptr);
        value
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        unsafe {
            let session = mudra_session_new(ptr::null());
            assert!(!session.is_null());

            let frame = CString::new(r#"{"hands": []}"#).unwrap();
            let output = take_json(mudra_session_process_frame(session, frame.as_ptr(), 0));
            assert_eq!(output["snapshot"]["confirmed"]["state"], "idle");
            assert_eq!(output["snapshot"]["level"], 1);

            let report = take_json(mudra_session_report(session));
            assert_eq!(report["frames"], 1);
            assert_eq!(report["producer"], "mudra-flow");

            mudra_session_free(session);
        }
    }

    #[test]
    fn test_ffi_telemetry_and_staleness() {
        unsafe {
            let session = mudra_session_new(ptr::null());

            let line = CString::new("BPM:72,SpO2:98").unwrap();
            let output = take_json(mudra_session_push_telemetry(session, line.as_ptr(), 0));
            assert_eq!(output["biometrics"]["heart_rate"], 72);
            assert_eq!(output["biometrics"]["is_connected"], true);

            let noise = CString::new("hello world").unwrap();
            assert!(mudra_session_push_telemetry(session, noise.as_ptr(), 100).is_null());
            assert!(mudra_last_error().is_null());

            assert!(mudra_session_tick(session, 1000).is_null());
            let reset = take_json(mudra_session_tick(session, 3001));
            assert_eq!(reset["biometrics"]["heart_rate"], 0);

            let report = take_json(mudra_session_report(session));
            assert_eq!(report["peak_heart_rate"], 72);

            mudra_session_free(session);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let bad_config = CString::new("not json").unwrap();
            assert!(mudra_session_new(bad_config.as_ptr()).is_null());
            assert!(!mudra_last_error().is_null());

            let session = mudra_session_new(ptr::null());
            let bad_frame = CString::new(r#"{"hands": [[{"x": 0.5, "y": 0.5}]]}"#).unwrap();
            let result = mudra_session_process_frame(session, bad_frame.as_ptr(), 0);
            assert!(result.is_null());

            let error = mudra_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(mudra_session_report(ptr::null_mut()).is_null());
            mudra_session_free(session);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = mudra_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
