use std::fmt;
use std::time::Duration;

use pipebridge_transport::{connect_with_config, ConnectConfig, NativeChannel, PipeChannel};
use tracing::{debug, warn};

use crate::error::{LineError, Result};
use crate::reader::{LineConfig, LineReader, ReadOutcome};
use crate::writer;

/// An open pipe connection exchanging newline-delimited text.
///
/// Owns the channel and its line accumulator together, so buffered bytes can
/// never outlive or be shared across connections. After [`LineChannel::close`]
/// every operation fails with [`LineError::Closed`].
pub struct LineChannel<C: PipeChannel = NativeChannel> {
    channel: Option<C>,
    reader: LineReader,
}

impl LineChannel<NativeChannel> {
    /// Connect to `name` through the native transport.
    pub fn connect(name: &str, timeout: Duration) -> Result<Self> {
        Self::connect_with_config(name, &ConnectConfig::with_timeout(timeout))
    }

    pub fn connect_with_config(name: &str, config: &ConnectConfig) -> Result<Self> {
        let channel = connect_with_config(name, config)?;
        Ok(Self::new(channel))
    }
}

impl<C: PipeChannel> LineChannel<C> {
    /// Wrap an already-connected channel.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, LineConfig::default())
    }

    pub fn with_config(channel: C, config: LineConfig) -> Self {
        Self {
            channel: Some(channel),
            reader: LineReader::with_config(config),
        }
    }

    /// Write raw bytes. Returns the byte count written.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        writer::write_all(self.channel_mut()?, bytes)
    }

    /// Write UTF-16 text as UTF-8. Returns the UTF-8 byte count written.
    pub fn write_wide(&mut self, wide: &[u16]) -> Result<usize> {
        writer::write_wide(self.channel_mut()?, wide)
    }

    pub fn write_str(&mut self, text: &str) -> Result<usize> {
        self.write_bytes(text.as_bytes())
    }

    /// Non-blocking read of the next line, at most `max_len` bytes.
    pub fn read_line(&mut self, max_len: usize) -> Result<ReadOutcome> {
        let channel = self.channel.as_mut().ok_or(LineError::Closed)?;
        self.reader.read_line(channel, max_len)
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        let Some(mut channel) = self.channel.take() else {
            return;
        };

        let handle = channel.raw_handle();
        if let Err(err) = channel.cancel_io() {
            warn!(handle, %err, "cancelling outstanding I/O failed");
        }
        drop(channel);

        let discarded = self.reader.pending_len();
        self.reader.discard();
        debug!(handle, discarded, "pipe channel closed");
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Raw OS handle, or `None` once closed.
    pub fn raw_handle(&self) -> Option<isize> {
        self.channel.as_ref().map(PipeChannel::raw_handle)
    }

    /// Bytes received but not yet returned by [`LineChannel::read_line`].
    pub fn pending_len(&self) -> usize {
        self.reader.pending_len()
    }

    fn channel_mut(&mut self) -> Result<&mut C> {
        self.channel.as_mut().ok_or(LineError::Closed)
    }
}

impl<C: PipeChannel> Drop for LineChannel<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: PipeChannel> fmt::Debug for LineChannel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineChannel")
            .field("handle", &self.raw_handle())
            .field("pending", &self.reader.pending_len())
            .finish()
    }
}
