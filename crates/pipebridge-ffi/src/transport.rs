use std::ffi::CStr;
use std::os::raw::c_char;

use pipebridge_line::encoding::wide_len;

use crate::error;

/// Borrow a required NUL-terminated UTF-16 argument, without the terminator.
///
/// # Safety
/// `value` must be null or point to a readable NUL-terminated `u16` sequence
/// that stays alive for the duration of the call.
pub(crate) unsafe fn required_wide_arg<'a>(value: *const u16, name: &str) -> Option<&'a [u16]> {
    if value.is_null() {
        error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }

    // SAFETY: non-null, and the caller guarantees a terminator.
    let len = unsafe { wide_len(value) };
    // SAFETY: `len` units before the terminator are readable.
    Some(unsafe { std::slice::from_raw_parts(value, len) })
}

/// Borrow a required NUL-terminated byte string, without the terminator.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_bytes_arg<'a>(value: *const c_char, name: &str) -> Option<&'a [u8]> {
    if value.is_null() {
        error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }

    // SAFETY: the caller guarantees `value` points to a valid C string.
    Some(unsafe { CStr::from_ptr(value) }.to_bytes())
}

/// Validate the output buffer and return how many data bytes fit in it.
pub(crate) fn buffer_room(buf: *mut c_char, capacity: i32) -> Option<usize> {
    if buf.is_null() {
        error::set_invalid_argument("buffer cannot be null");
        return None;
    }
    if capacity < 2 {
        error::set_invalid_argument(format!(
            "buffer capacity must be at least 2 (got {capacity})"
        ));
        return None;
    }
    usize::try_from(capacity - 1).ok()
}

/// Copy `data` into `buf` and NUL-terminate it.
///
/// # Safety
/// `buf` must be writable for `data.len() + 1` bytes.
pub(crate) unsafe fn copy_out(buf: *mut c_char, data: &[u8]) {
    let dst = buf.cast::<u8>();
    // SAFETY: the caller sized `buf` for the data plus its terminator, and
    // `data` is owned by the reader so the regions cannot overlap.
    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        *dst.add(data.len()) = 0;
    }
}

/// Convert a byte count into the `i32` return slot.
pub(crate) fn count_to_i32(count: usize) -> Option<i32> {
    i32::try_from(count).ok()
}
