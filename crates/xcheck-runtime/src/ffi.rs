//! C ABI for instrumented programs.
//!
//! Instrumented code links `libxcheck_runtime.a` and drives one session
//! through an opaque handle:
//!
//! ```c
//! typedef struct XcheckHandle XcheckHandle;
//!
//! XcheckHandle* xcheck_begin_session(void);
//! XcheckHandle* xcheck_begin_fakechecks(void);
//! void     xcheck_record(XcheckHandle*, uint64_t site_id, uint8_t tag, uint64_t hash);
//! void     xcheck_record_bytes(XcheckHandle*, uint64_t site_id, uint8_t tag,
//!                              const uint8_t* payload, size_t len);
//! int32_t  xcheck_end_session(XcheckHandle*);
//! uint64_t xcheck_violations(const XcheckHandle*);
//! void     xcheck_release(XcheckHandle*);
//! uint64_t xcheck_site_id(const char* name);
//! ```
//!
//! Ending a session does not free its handle. Threads still recording into
//! it get a reported protocol violation and the ended session is untouched.
//! The handle is freed by `xcheck_release` once no thread uses it, or never.
//!
//! # Safety
//!
//! The caller (C code) must ensure:
//! - handles come from `xcheck_begin_*` and are not used after
//!   `xcheck_release`
//! - `payload` points to `len` readable bytes
//! - `name` is a NUL-terminated string
//!
//! Null handles, unknown tags and exhausted storage abort the process.

use std::ffi::{CStr, c_char};
use std::path::PathBuf;

use tracing::{error, info};
use xcheck_hash::hash_bytes;

use crate::codec::save_session;
use crate::{
    CrossCheckSink, EventKind, FakeChecks, RuntimeConfig, RuntimeError, SiteId, begin_session,
};

/// Opaque per-execution handle.
pub struct XcheckHandle {
    sink: Box<dyn CrossCheckSink>,
    output: Option<PathBuf>,
    compress: bool,
}

impl XcheckHandle {
    /// Wrap a sink. A finished session is written to `output` when set.
    #[must_use]
    pub fn new(sink: Box<dyn CrossCheckSink>, output: Option<PathBuf>, compress: bool) -> Self {
        Self {
            sink,
            output,
            compress,
        }
    }

    /// Hand the handle over to C.
    #[must_use]
    pub fn into_raw(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    fn record(&self, site_id: u64, tag: u8, payload_hash: u64) {
        let Some(kind) = EventKind::from_tag(tag) else {
            fatal(&RuntimeError::UnknownKind(tag));
        };
        match self.sink.check(SiteId::from_raw(site_id), kind, payload_hash) {
            // Already reported by the sink; recording continues.
            Ok(_) | Err(RuntimeError::ProtocolViolation(_)) => {}
            Err(err) => fatal(&err),
        }
    }

    /// Finalize the sink and write the session file if configured.
    fn finish(&self) -> i32 {
        let session = match self.sink.finish() {
            Ok(session) => session,
            Err(RuntimeError::ProtocolViolation(_)) => return 1,
            Err(err) => fatal(&err),
        };
        let (Some(session), Some(path)) = (session, self.output.as_ref()) else {
            return 0;
        };
        match save_session(path, &session, self.compress) {
            Ok(()) => {
                info!(path = %path.display(), events = session.len(), "session written");
                0
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to write session");
                1
            }
        }
    }
}

fn fatal(err: &RuntimeError) -> ! {
    error!(error = %err, "xcheck runtime failure, aborting");
    eprintln!("xcheck: fatal: {err}");
    std::process::abort()
}

fn config_from_env() -> RuntimeConfig {
    RuntimeConfig::from_env().unwrap_or_else(|err| fatal(&err))
}

/// # Safety
///
/// `handle` must be null or a live pointer from `xcheck_begin_*`.
unsafe fn handle_ref<'a>(handle: *const XcheckHandle) -> &'a XcheckHandle {
    if handle.is_null() {
        fatal(&RuntimeError::ProtocolViolation("null xcheck handle"));
    }
    unsafe { &*handle }
}

// =============================================================================
// FFI Exports - called by instrumented code
// =============================================================================

/// Start a recording session configured from `XCHECK_*` variables.
#[unsafe(no_mangle)]
pub extern "C" fn xcheck_begin_session() -> *mut XcheckHandle {
    let config = config_from_env();
    let output = config.output.clone();
    let compress = config.compress;
    let handle = begin_session(config).unwrap_or_else(|err| fatal(&err));
    XcheckHandle::new(Box::new(handle), output, compress).into_raw()
}

/// Start a session that prints checks instead of recording them.
#[unsafe(no_mangle)]
pub extern "C" fn xcheck_begin_fakechecks() -> *mut XcheckHandle {
    let config = config_from_env();
    let sink: Box<dyn CrossCheckSink> = match &config.fake_output {
        Some(path) => Box::new(FakeChecks::create(path).unwrap_or_else(|err| fatal(&err))),
        None => Box::new(FakeChecks::stderr()),
    };
    XcheckHandle::new(sink, None, false).into_raw()
}

/// Record one check.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_record(
    handle: *const XcheckHandle,
    site_id: u64,
    tag: u8,
    payload_hash: u64,
) {
    unsafe { handle_ref(handle) }.record(site_id, tag, payload_hash);
}

/// Record one check whose payload is a byte buffer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_record_bytes(
    handle: *const XcheckHandle,
    site_id: u64,
    tag: u8,
    payload: *const u8,
    len: usize,
) {
    let handle = unsafe { handle_ref(handle) };
    let bytes: &[u8] = if len == 0 {
        &[]
    } else if payload.is_null() {
        fatal(&RuntimeError::ProtocolViolation("null payload with non-zero length"));
    } else {
        unsafe { std::slice::from_raw_parts(payload, len) }
    };
    handle.record(site_id, tag, hash_bytes(bytes));
}

/// Finish the session and write it out if configured. The handle stays
/// valid; later records are reported as protocol violations.
///
/// Returns 0 on success and 1 if the session was already ended or could not
/// be written.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_end_session(handle: *const XcheckHandle) -> i32 {
    unsafe { handle_ref(handle) }.finish()
}

/// Number of protocol violations reported on this handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_violations(handle: *const XcheckHandle) -> u64 {
    unsafe { handle_ref(handle) }.sink.violations()
}

/// Free a handle. No other thread may use it during or after this call.
/// A null handle is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_release(handle: *mut XcheckHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// Site id for a NUL-terminated function name. Returns 0 for null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xcheck_site_id(name: *const c_char) -> u64 {
    if name.is_null() {
        return 0;
    }
    let name = unsafe { CStr::from_ptr(name) };
    SiteId::from_name_bytes(name.to_bytes(), 0).raw()
}
