//! C ABI.
//!
//! Every function takes an explicit [`CallgateContext`] created with
//! [`callgate_context_new`]; there is no process-global state. Functions
//! return a [`Status`] code as `i32` (see [`callgate_status_message`]).
//!
//! `callgate_cancel` and `callgate_shutdown` wait for invocations still
//! running on other threads, so once they return `0` the caller may free
//! the handler's `user` data. Called from inside the handler's own
//! callback, they do not wait for that invocation.

use crate::config::FacadeConfig;
use crate::facade::DispatchFacade;
use crate::logging;
use crate::status::Status;
use callgate_core::{InputError, Notify};
use std::ffi::{CStr, CString, c_char, c_void};
use std::{ptr, slice};

/// Handler callback: `(user, source, data, len)`.
///
/// `source` is a NUL-terminated string and `data` points to `len` bytes;
/// both are only valid for the duration of the call.
pub type CallgateCallback =
    unsafe extern "C" fn(user: *mut c_void, source: *const c_char, data: *const u8, len: usize);

/// A foreign handler: callback plus opaque user pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CallgateHandler {
    /// Must be non-null.
    pub cb: Option<CallgateCallback>,
    /// Passed back to `cb` unchanged.
    pub user: *mut c_void,
}

struct ForeignNotify {
    cb: CallgateCallback,
    user: *mut c_void,
}

// SAFETY: the registering caller promises that `user` may be used from any
// thread for as long as the registration is live; the library never
// dereferences it.
unsafe impl Send for ForeignNotify {}
// SAFETY: as above; the library only copies the pointer.
unsafe impl Sync for ForeignNotify {}

impl Notify for ForeignNotify {
    fn notify(&self, source: &str, payload: &[u8]) {
        let source = source_cstring(source);
        // SAFETY: `cb` and `user` were supplied together by the caller, and
        // the pointers passed here outlive the call.
        unsafe { (self.cb)(self.user, source.as_ptr(), payload.as_ptr(), payload.len()) }
    }
}

fn source_cstring(source: &str) -> CString {
    let bytes = source.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

/// Opaque library context.
pub struct CallgateContext {
    facade: DispatchFacade,
}

impl CallgateContext {
    /// Wrap an existing facade.
    pub fn new(facade: DispatchFacade) -> Self {
        Self { facade }
    }

    /// The facade behind this context.
    pub fn facade(&self) -> &DispatchFacade {
        &self.facade
    }
}

fn invalid(what: &'static str) -> i32 {
    let err = InputError::NullPointer(what);
    tracing::warn!(error = %err, "input rejected");
    Status::from(&err).code()
}

/// Read a NUL-terminated UTF-8 argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(invalid(what));
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str().map_err(|_| {
        let err = InputError::InvalidUtf8(what);
        tracing::warn!(error = %err, "input rejected");
        Status::from(&err).code()
    })
}

/// Borrow `len` bytes at `data`; a null `data` is only accepted with `len == 0`.
///
/// `len` is checked before any slice is formed, so an oversized value is
/// reported instead of reaching `from_raw_parts`.
///
/// # Safety
/// `data` must be null or valid for reads of `len` bytes.
unsafe fn bytes_arg<'a>(data: *const u8, len: usize, limit: usize) -> Result<&'a [u8], i32> {
    let limit = limit.min(isize::MAX as usize);
    if len > limit {
        let err = InputError::PayloadTooLarge { len, limit };
        tracing::warn!(error = %err, "input rejected");
        return Err(Status::from(&err).code());
    }
    if data.is_null() {
        return if len == 0 { Ok(&[]) } else { Err(invalid("data")) };
    }
    // SAFETY: non-null and valid for `len` bytes per the caller's contract.
    Ok(unsafe { slice::from_raw_parts(data, len) })
}

/// # Safety
/// `ctx` must be null or a live pointer from [`callgate_context_new`].
unsafe fn context<'a>(ctx: *const CallgateContext) -> Result<&'a CallgateContext, i32> {
    // SAFETY: per the caller's contract.
    unsafe { ctx.as_ref() }.ok_or_else(|| invalid("ctx"))
}

/// Create a context configured from the environment. Returns null if the
/// delivery worker could not be started.
#[unsafe(no_mangle)]
pub extern "C" fn callgate_context_new() -> *mut CallgateContext {
    match DispatchFacade::from_config(FacadeConfig::from_env()) {
        Ok(facade) => Box::into_raw(Box::new(CallgateContext::new(facade))),
        Err(err) => {
            tracing::error!(error = %err, "failed to create context");
            ptr::null_mut()
        }
    }
}

/// Shut down (draining) and free a context. Null is ignored.
///
/// # Safety
/// `ctx` must be null or a pointer from [`callgate_context_new`] that has
/// not been freed, and must not be called from inside a handler.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_context_free(ctx: *mut CallgateContext) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: ownership returns from the caller per the contract.
    let ctx = unsafe { Box::from_raw(ctx) };
    ctx.facade.shutdown_and_drain();
}

/// Register `handler` for `dest`; the token is written to `out_token`.
///
/// # Safety
/// `ctx` as for [`callgate_context_free`]; `dest` a NUL-terminated string;
/// `handler` and `out_token` valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_register(
    ctx: *const CallgateContext,
    dest: *const c_char,
    handler: *const CallgateHandler,
    out_token: *mut u64,
) -> i32 {
    // SAFETY: forwarded caller contract.
    let ctx = match unsafe { context(ctx) } {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    // SAFETY: forwarded caller contract.
    let dest = match unsafe { str_arg(dest, "dest") } {
        Ok(dest) => dest,
        Err(code) => return code,
    };
    // SAFETY: forwarded caller contract.
    let Some(handler) = (unsafe { handler.as_ref() }) else {
        return invalid("handler");
    };
    let Some(cb) = handler.cb else {
        return invalid("handler.cb");
    };
    if out_token.is_null() {
        return invalid("out_token");
    }

    match ctx.facade.register(dest, ForeignNotify { cb, user: handler.user }) {
        Ok(token) => {
            // SAFETY: checked non-null above.
            unsafe { out_token.write(token.to_raw()) };
            Status::Ok.code()
        }
        Err(status) => status.code(),
    }
}

/// Cancel a registration, waiting for invocations running on other threads.
///
/// # Safety
/// `ctx` as for [`callgate_context_free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_cancel(ctx: *const CallgateContext, token: u64) -> i32 {
    // SAFETY: forwarded caller contract.
    match unsafe { context(ctx) } {
        Ok(ctx) => ctx.facade.cancel_raw(token).code(),
        Err(code) => code,
    }
}

/// Queue a message for asynchronous delivery to every handler of `dest`.
///
/// # Safety
/// `ctx` as for [`callgate_context_free`]; `dest` and `src` NUL-terminated
/// strings; `data` valid for `len` bytes (may be null if `len` is 0).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_send(
    ctx: *const CallgateContext,
    dest: *const c_char,
    src: *const c_char,
    data: *const u8,
    len: usize,
) -> i32 {
    // SAFETY: forwarded caller contract.
    let args = unsafe { message_args(ctx, dest, src, data, len) };
    match args {
        Ok((ctx, dest, src, payload)) => ctx.facade.send(dest, src, payload.to_vec()).code(),
        Err(code) => code,
    }
}

/// Deliver a message synchronously; the number of handlers invoked is
/// written to `out_delivered` when it is non-null.
///
/// # Safety
/// As for [`callgate_send`]; `out_delivered` null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_dispatch(
    ctx: *const CallgateContext,
    dest: *const c_char,
    src: *const c_char,
    data: *const u8,
    len: usize,
    out_delivered: *mut usize,
) -> i32 {
    // SAFETY: forwarded caller contract.
    let args = unsafe { message_args(ctx, dest, src, data, len) };
    let (ctx, dest, src, payload) = match args {
        Ok(args) => args,
        Err(code) => return code,
    };
    match ctx.facade.dispatch(dest, src, payload) {
        Ok(delivered) => {
            if !out_delivered.is_null() {
                // SAFETY: non-null per check, valid per contract.
                unsafe { out_delivered.write(delivered) };
            }
            Status::Ok.code()
        }
        Err(status) => status.code(),
    }
}

/// # Safety
/// As for [`callgate_send`].
unsafe fn message_args<'a>(
    ctx: *const CallgateContext,
    dest: *const c_char,
    src: *const c_char,
    data: *const u8,
    len: usize,
) -> Result<(&'a CallgateContext, &'a str, &'a str, &'a [u8]), i32> {
    // SAFETY: forwarded caller contract.
    unsafe {
        let ctx = context(ctx)?;
        let limit = ctx.facade.max_payload_len();
        Ok((
            ctx,
            str_arg(dest, "dest")?,
            str_arg(src, "src")?,
            bytes_arg(data, len, limit)?,
        ))
    }
}

/// Cancel every registration and refuse new ones, waiting for running
/// invocations. Idempotent; the context stays allocated.
///
/// # Safety
/// `ctx` as for [`callgate_context_free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn callgate_shutdown(ctx: *const CallgateContext) -> i32 {
    // SAFETY: forwarded caller contract.
    match unsafe { context(ctx) } {
        Ok(ctx) => {
            ctx.facade.shutdown_and_drain();
            Status::Ok.code()
        }
        Err(code) => code,
    }
}

/// Static description of a status code. Unknown codes map to the
/// `Internal` message.
#[unsafe(no_mangle)]
pub extern "C" fn callgate_status_message(code: i32) -> *const c_char {
    Status::from_code(code).unwrap_or(Status::Internal).message().as_ptr()
}

/// Install the stderr log subscriber. Returns `1` if installed by this
/// call, `0` if one was already present.
#[unsafe(no_mangle)]
pub extern "C" fn callgate_init_logging() -> i32 {
    i32::from(logging::init())
}
