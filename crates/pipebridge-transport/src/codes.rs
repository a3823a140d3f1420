//! Platform error codes used by the bridge, and their classification.
//!
//! Windows codes are `GetLastError` values, Unix codes are `errno` values.
//! Codes the bridge synthesizes itself (deadline expiry, encoding failure,
//! truncation) are picked from the same platform namespace so callers can
//! always look them up in the OS documentation.

use crate::error::ErrorKind;

#[cfg(windows)]
mod platform {
    use windows_sys::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_BROKEN_PIPE, ERROR_FILE_NOT_FOUND, ERROR_GEN_FAILURE,
        ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER, ERROR_MORE_DATA, ERROR_NO_DATA,
        ERROR_NO_UNICODE_TRANSLATION, ERROR_PIPE_BUSY, ERROR_PIPE_NOT_CONNECTED,
        ERROR_SEM_TIMEOUT,
    };

    pub const NOT_FOUND: u32 = ERROR_FILE_NOT_FOUND;
    pub const TIMEOUT: u32 = ERROR_SEM_TIMEOUT;
    pub const PIPE_BUSY: u32 = ERROR_PIPE_BUSY;
    pub const ACCESS_DENIED: u32 = ERROR_ACCESS_DENIED;
    pub const INVALID_ARGUMENT: u32 = ERROR_INVALID_PARAMETER;
    pub const INVALID_HANDLE: u32 = ERROR_INVALID_HANDLE;
    pub const ENCODING_FAILURE: u32 = ERROR_NO_UNICODE_TRANSLATION;
    pub const BROKEN_PIPE: u32 = ERROR_BROKEN_PIPE;
    pub const NO_REMOTE_PROCESS: u32 = ERROR_PIPE_NOT_CONNECTED;
    pub const MORE_DATA: u32 = ERROR_MORE_DATA;
    pub const IO_FAILURE: u32 = ERROR_GEN_FAILURE;

    /// "The pipe is being closed."
    pub const PIPE_CLOSING: u32 = ERROR_NO_DATA;
}

#[cfg(unix)]
mod platform {
    pub const NOT_FOUND: u32 = libc::ENOENT as u32;
    pub const TIMEOUT: u32 = libc::ETIMEDOUT as u32;
    pub const PIPE_BUSY: u32 = libc::ECONNREFUSED as u32;
    pub const ACCESS_DENIED: u32 = libc::EACCES as u32;
    pub const INVALID_ARGUMENT: u32 = libc::EINVAL as u32;
    pub const INVALID_HANDLE: u32 = libc::EBADF as u32;
    pub const ENCODING_FAILURE: u32 = libc::EILSEQ as u32;
    pub const BROKEN_PIPE: u32 = libc::EPIPE as u32;
    pub const NO_REMOTE_PROCESS: u32 = libc::ENOTCONN as u32;
    pub const MORE_DATA: u32 = libc::EMSGSIZE as u32;
    pub const IO_FAILURE: u32 = libc::EIO as u32;

    /// Peer reset the connection.
    pub const PIPE_CLOSING: u32 = libc::ECONNRESET as u32;
}

pub use platform::*;

/// Map a platform code onto the stable taxonomy.
pub fn classify(code: u32) -> ErrorKind {
    match code {
        0 => ErrorKind::Ok,
        NOT_FOUND => ErrorKind::NotFound,
        TIMEOUT | PIPE_BUSY => ErrorKind::Timeout,
        ACCESS_DENIED => ErrorKind::AccessDenied,
        INVALID_ARGUMENT | INVALID_HANDLE => ErrorKind::InvalidArgument,
        ENCODING_FAILURE => ErrorKind::EncodingFailure,
        BROKEN_PIPE | PIPE_CLOSING => ErrorKind::BrokenPipe,
        NO_REMOTE_PROCESS => ErrorKind::NoRemoteProcess,
        MORE_DATA => ErrorKind::BufferTruncated,
        _ => ErrorKind::Io,
    }
}
