//! Conversions between host wide text (UTF-16 code units) and UTF-8.
//!
//! Conversion is strict: an unpaired surrogate fails with
//! [`LineError::Encoding`] instead of being replaced with U+FFFD.

use crate::error::{LineError, Result};

/// Convert UTF-16 code units to UTF-8, failing on unpaired surrogates.
pub fn wide_to_utf8(wide: &[u16]) -> Result<String> {
    let mut out = String::with_capacity(wide.len());
    let mut position = 0usize;

    for decoded in char::decode_utf16(wide.iter().copied()) {
        match decoded {
            Ok(ch) => {
                position += ch.len_utf16();
                out.push(ch);
            }
            Err(err) => {
                return Err(LineError::Encoding {
                    position,
                    unit: err.unpaired_surrogate(),
                })
            }
        }
    }

    Ok(out)
}

/// Convert UTF-8 text to UTF-16 code units, without a terminator.
pub fn utf8_to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Length of a NUL-terminated wide string, excluding the terminator.
///
/// # Safety
/// `ptr` must be non-null and point to a readable sequence of `u16` that
/// contains a 0 unit.
pub unsafe fn wide_len(ptr: *const u16) -> usize {
    let mut len = 0usize;
    // SAFETY: the caller guarantees a terminator exists, so every offset up to
    // and including it is readable.
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    len
}
