use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use pipebridge_line::LineError;
use pipebridge_transport::{codes, ErrorKind};

struct LastError {
    code: u32,
    kind: ErrorKind,
    message: CString,
}

impl Default for LastError {
    fn default() -> Self {
        Self {
            code: 0,
            kind: ErrorKind::Ok,
            message: CString::default(),
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<LastError> = RefCell::new(LastError::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = LastError::default();
    });
}

pub(crate) fn record(kind: ErrorKind, code: u32, message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    let message = CString::new(sanitized).unwrap_or_default();
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = LastError {
            code,
            kind,
            message,
        };
    });
}

pub(crate) fn record_line_error(err: &LineError) {
    tracing::debug!(kind = %err.kind(), code = err.os_code(), %err, "pipe call failed");
    record(err.kind(), err.os_code(), err.to_string());
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) {
    record(ErrorKind::InvalidArgument, codes::INVALID_ARGUMENT, message);
}

pub(crate) fn set_invalid_handle(handle: isize) {
    record(
        ErrorKind::InvalidArgument,
        codes::INVALID_HANDLE,
        format!("unknown pipe handle {handle}"),
    );
}

pub(crate) fn set_truncated(returned: usize, remaining: usize) {
    record(
        ErrorKind::BufferTruncated,
        codes::MORE_DATA,
        format!("line truncated to {returned} bytes; {remaining} bytes remain buffered"),
    );
}

pub(crate) fn set_panic_error() {
    record(
        ErrorKind::Internal,
        codes::IO_FAILURE,
        "panic across FFI boundary",
    );
}

pub(crate) fn last_code() -> u32 {
    LAST_ERROR.with(|state| state.borrow().code)
}

pub(crate) fn last_kind() -> ErrorKind {
    LAST_ERROR.with(|state| state.borrow().kind)
}

pub(crate) fn last_message_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().message.as_ptr())
}
