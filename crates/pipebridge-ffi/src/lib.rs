//! pipebridge-ffi: flat C-ABI exports for the pipebridge client.
//!
//! Every export clears the calling thread's last-error state on entry and
//! reports failure through a sentinel return value. Panics never cross the
//! boundary.

mod error;
mod pipe;
mod registry;
mod transport;
mod types;

use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

pub use pipe::{
    pipe_close, pipe_close_all, pipe_connect, pipe_read_line, pipe_write, pipe_write_wide,
};
pub use types::{
    PipeHandle, INVALID_PIPE_HANDLE, PIPE_FAILURE, PIPE_KIND_ACCESS_DENIED,
    PIPE_KIND_BROKEN_PIPE, PIPE_KIND_BUFFER_TRUNCATED, PIPE_KIND_CONFIG_FAILURE,
    PIPE_KIND_ENCODING_FAILURE, PIPE_KIND_INTERNAL, PIPE_KIND_INVALID_ARGUMENT, PIPE_KIND_IO,
    PIPE_KIND_NOT_FOUND, PIPE_KIND_NO_REMOTE_PROCESS, PIPE_KIND_OK, PIPE_KIND_TIMEOUT,
    PIPE_NO_DATA,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Platform error code recorded by this thread's last call, `0` after success.
#[no_mangle]
pub extern "system" fn pipe_last_error() -> u32 {
    ffi_boundary(0, error::last_code)
}

/// Taxonomy code recorded by this thread's last call (see `PIPE_KIND_*`).
#[no_mangle]
pub extern "system" fn pipe_last_error_kind() -> i32 {
    ffi_boundary(PIPE_KIND_INTERNAL, || error::last_kind() as i32)
}

/// Message for this thread's last failure; empty after success.
///
/// The pointer stays valid until the next pipebridge call on this thread.
#[no_mangle]
pub extern "system" fn pipe_last_error_message() -> *const c_char {
    ffi_boundary(std::ptr::null(), error::last_message_ptr)
}
