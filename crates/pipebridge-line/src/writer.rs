use pipebridge_transport::{PipeChannel, TransportError};
use tracing::trace;

use crate::encoding::wide_to_utf8;
use crate::error::{LineError, Result};

/// Write every byte of `bytes` to `channel`, returning the count written.
///
/// Loops over partial writes. No flush is issued; pipe writes are not
/// buffered in user space.
pub fn write_all<C: PipeChannel>(channel: &mut C, bytes: &[u8]) -> Result<usize> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match channel.write(&bytes[offset..]) {
            Ok(0) => return Err(TransportError::closed_by_remote().into()),
            Ok(n) => offset += n,
            Err(TransportError::Io(err)) if err.kind() == std::io::ErrorKind::Interrupted => {
                continue
            }
            Err(err) => return Err(LineError::Transport(err)),
        }
    }

    trace!(written = offset, "wrote bytes");
    Ok(offset)
}

/// Convert wide text to UTF-8 and write it. Returns the UTF-8 byte count.
///
/// Nothing is written if the text does not convert.
pub fn write_wide<C: PipeChannel>(channel: &mut C, wide: &[u16]) -> Result<usize> {
    let text = wide_to_utf8(wide)?;
    write_all(channel, text.as_bytes())
}
