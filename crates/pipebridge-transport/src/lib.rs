//! Client-side pipe transport.
//!
//! Resolves a pipe name into an open byte-stream channel:
//! - Windows named pipes (`\\.\pipe\name`)
//! - Unix domain sockets (Linux/macOS), addressed with the same names
//!
//! This is the lowest layer of pipebridge. Everything else builds on the
//! [`PipeChannel`] capability provided here.

pub mod codes;
pub mod connector;
pub mod error;
pub mod name;
pub mod traits;

#[cfg(unix)]
pub mod uds;

#[cfg(windows)]
pub mod windows;

pub use connector::{
    connect, connect_via, connect_with_config, ConnectConfig, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_POLL_INTERVAL,
};
pub use error::{ErrorKind, Result, TransportError};
pub use name::PipeName;
pub use traits::{PipeChannel, PipeEndpoint, Readiness};

#[cfg(unix)]
pub use uds::{UnixPipeClient as NativeChannel, UnixSocketEndpoint as NativeEndpoint};

#[cfg(windows)]
pub use windows::{NamedPipeClient as NativeChannel, NamedPipeEndpoint as NativeEndpoint};
