use std::time::Duration;

use crate::error::Result;
use crate::name::PipeName;

/// An open, bidirectional byte-stream channel to a pipe listener.
///
/// One implementation exists per target platform. Dropping a channel
/// releases the OS resource; callers that need cancellation ordering call
/// [`PipeChannel::cancel_io`] first.
pub trait PipeChannel: Send {
    /// Bytes that can be read right now without blocking.
    ///
    /// `Ok(0)` means "no data yet". A channel whose remote end has gone away
    /// reports an error instead.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read into `buf`. Callers never ask for more than
    /// [`PipeChannel::bytes_available`] reported, so this does not block.
    /// End of stream is reported as `BrokenPipe`; `Ok(0)` only means the read
    /// raced with the remote writer and got nothing.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Synchronous write; returns the bytes the kernel accepted. Never flushes.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Switch the channel to byte-stream read mode.
    fn set_byte_mode(&mut self) -> Result<()>;

    /// Cancel any I/O still outstanding against the channel.
    fn cancel_io(&mut self) -> Result<()>;

    /// Raw OS handle value, for diagnostics.
    fn raw_handle(&self) -> isize;
}

/// Result of one readiness check against a pipe name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A pipe instance is free to open.
    Ready,
    /// No pipe with this name exists (yet).
    Missing,
    /// The pipe exists but no instance became free within the wait.
    Busy,
}

/// Platform capability for resolving pipe names into channels.
pub trait PipeEndpoint {
    type Channel: PipeChannel;

    /// Wait up to `timeout` for a free instance of `name`.
    ///
    /// Implementations may return early with [`Readiness::Missing`] when the
    /// name does not exist at all.
    fn wait_ready(&self, name: &PipeName, timeout: Duration) -> Result<Readiness>;

    /// Open `name` for exclusive read/write access.
    fn open(&self, name: &PipeName) -> Result<Self::Channel>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}
