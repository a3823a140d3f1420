//! Client-side named-pipe bridge exchanging newline-delimited text.
//!
//! # Crate Structure
//!
//! - [`transport`]: pipe names, bounded connect, platform channels
//! - [`line`]: UTF-16 to UTF-8 writes and non-blocking line reads
//!
//! The flat C surface lives in the separate `pipebridge-ffi` crate.

/// Re-export transport types.
pub mod transport {
    pub use pipebridge_transport::*;
}

/// Re-export line types.
pub mod line {
    pub use pipebridge_line::*;
}

pub use pipebridge_line::{LineChannel, LineError, ReadOutcome};
pub use pipebridge_transport::{ConnectConfig, ErrorKind, TransportError};
