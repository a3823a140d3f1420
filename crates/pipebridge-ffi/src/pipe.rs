use std::borrow::Cow;
use std::os::raw::c_char;
use std::time::Duration;

use pipebridge_line::{wide_to_utf8, LineChannel, LineError, ReadOutcome};
use tracing::debug;

use crate::error;
use crate::registry;
use crate::transport;
use crate::types::{PipeHandle, INVALID_PIPE_HANDLE, PIPE_FAILURE, PIPE_NO_DATA};

/// Resolve `handle`, then encode and write. An unknown handle is reported
/// before any encoding failure.
fn write_encoded<'a>(
    handle: PipeHandle,
    encode: impl FnOnce() -> pipebridge_line::Result<Cow<'a, [u8]>>,
) -> i32 {
    let written = registry::with_channel(handle, |channel| -> pipebridge_line::Result<i32> {
        let bytes = encode()?;
        let count = transport::count_to_i32(bytes.len()).ok_or_else(|| {
            LineError::InvalidArgument(format!(
                "write of {} bytes exceeds the reportable maximum",
                bytes.len()
            ))
        })?;
        channel.write_bytes(&bytes)?;
        Ok(count)
    });

    match written {
        None => {
            error::set_invalid_handle(handle);
            PIPE_FAILURE
        }
        Some(Err(err)) => {
            error::record_line_error(&err);
            PIPE_FAILURE
        }
        Some(Ok(count)) => count,
    }
}

/// Connect to the pipe `name`, waiting at most `timeout_ms` for it.
///
/// Returns a handle, or `-1` on failure.
///
/// # Safety
/// `name` must be null or a NUL-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "system" fn pipe_connect(name: *const u16, timeout_ms: u32) -> PipeHandle {
    crate::ffi_boundary(INVALID_PIPE_HANDLE, || {
        error::clear_error_state();

        let name = {
            // SAFETY: null is checked in the helper; the caller guarantees termination.
            match unsafe { transport::required_wide_arg(name, "name") } {
                Some(v) => v,
                None => return INVALID_PIPE_HANDLE,
            }
        };

        let connected = wide_to_utf8(name).and_then(|name| {
            LineChannel::connect(&name, Duration::from_millis(u64::from(timeout_ms)))
        });

        match connected {
            Ok(channel) => {
                let raw = channel.raw_handle();
                let handle = registry::insert(channel);
                debug!(handle, ?raw, "pipe handle registered");
                handle
            }
            Err(err) => {
                error::record_line_error(&err);
                INVALID_PIPE_HANDLE
            }
        }
    })
}

/// Write UTF-16 text as UTF-8. Returns the UTF-8 byte count, or `-1`.
///
/// Nothing is written when the text contains an unpaired surrogate.
///
/// # Safety
/// `text` must be null or a NUL-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "system" fn pipe_write_wide(handle: PipeHandle, text: *const u16) -> i32 {
    crate::ffi_boundary(PIPE_FAILURE, || {
        error::clear_error_state();

        let text = {
            // SAFETY: null is checked in the helper; the caller guarantees termination.
            match unsafe { transport::required_wide_arg(text, "text") } {
                Some(v) => v,
                None => return PIPE_FAILURE,
            }
        };

        write_encoded(handle, || {
            wide_to_utf8(text).map(|utf8| Cow::Owned(utf8.into_bytes()))
        })
    })
}

/// Write a NUL-terminated byte string verbatim. Returns the byte count, or `-1`.
///
/// # Safety
/// `data` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "system" fn pipe_write(handle: PipeHandle, data: *const c_char) -> i32 {
    crate::ffi_boundary(PIPE_FAILURE, || {
        error::clear_error_state();

        let data = {
            // SAFETY: null is checked in the helper.
            match unsafe { transport::required_bytes_arg(data, "data") } {
                Some(v) => v,
                None => return PIPE_FAILURE,
            }
        };

        write_encoded(handle, || Ok(Cow::Borrowed(data)))
    })
}

/// Copy the next available line into `buf` without blocking.
///
/// Returns the byte count written before the terminator, `0` when no line is
/// ready, or `-1` on failure. At most `capacity - 1` bytes are copied; the
/// rest of a longer line is kept for the next call and the call records
/// `BufferTruncated`.
///
/// # Safety
/// `buf` must be null or writable for `capacity` bytes.
#[no_mangle]
pub unsafe extern "system" fn pipe_read_line(
    handle: PipeHandle,
    buf: *mut c_char,
    capacity: i32,
) -> i32 {
    crate::ffi_boundary(PIPE_FAILURE, || {
        error::clear_error_state();

        let Some(room) = transport::buffer_room(buf, capacity) else {
            return PIPE_FAILURE;
        };

        let read = registry::with_channel(handle, |channel| {
            channel
                .read_line(room)
                .map(|outcome| (outcome, channel.pending_len()))
        });

        let (outcome, pending) = match read {
            None => {
                error::set_invalid_handle(handle);
                return PIPE_FAILURE;
            }
            Some(Err(err)) => {
                error::record_line_error(&err);
                return PIPE_FAILURE;
            }
            Some(Ok(read)) => read,
        };

        if let ReadOutcome::Empty = outcome {
            return PIPE_NO_DATA;
        }

        let data = outcome.bytes();
        // SAFETY: `data.len() <= capacity - 1`, so data and terminator fit.
        unsafe { transport::copy_out(buf, data) };

        if let ReadOutcome::Truncated(_) = outcome {
            error::set_truncated(data.len(), pending);
        }

        transport::count_to_i32(data.len()).unwrap_or(PIPE_FAILURE)
    })
}

/// Close a handle. Unknown, sentinel and already-closed handles are ignored.
#[no_mangle]
pub extern "system" fn pipe_close(handle: PipeHandle) {
    crate::ffi_boundary((), || {
        error::clear_error_state();

        let Some(entry) = registry::remove(handle) else {
            return;
        };
        registry::close_entry(&entry);
        debug!(handle, "pipe handle released");
    });
}

/// Close every handle still open. Returns the number of handles closed.
///
/// For host teardown; any handle used afterwards is unknown.
#[no_mangle]
pub extern "system" fn pipe_close_all() -> i32 {
    crate::ffi_boundary(PIPE_FAILURE, || {
        error::clear_error_state();

        let drained = registry::drain();
        for (handle, entry) in &drained {
            registry::close_entry(entry);
            debug!(handle, "pipe handle released");
        }
        transport::count_to_i32(drained.len()).unwrap_or(i32::MAX)
    })
}
