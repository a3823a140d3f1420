use std::time::Duration;

use crate::codes;

/// Stable failure taxonomy shared by every layer of the bridge.
///
/// The discriminants are part of the C ABI (`pipe_last_error_kind`) and must
/// not be renumbered.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ok = 0,
    /// The named channel does not exist.
    NotFound = 1,
    /// The channel existed but did not become ready before the deadline.
    Timeout = 2,
    AccessDenied = 3,
    /// Byte-mode setup failed after a successful open.
    ConfigFailure = 4,
    /// Null, zero or negative inputs.
    InvalidArgument = 5,
    /// Wide text could not be converted to UTF-8.
    EncodingFailure = 6,
    /// The remote end closed the channel mid-operation.
    BrokenPipe = 7,
    NoRemoteProcess = 8,
    /// A line was longer than the caller's buffer. Not a hard error.
    BufferTruncated = 9,
    /// Any other OS-level failure.
    Io = 10,
    Internal = 99,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Ok => "ok",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::AccessDenied => "access-denied",
            ErrorKind::ConfigFailure => "config-failure",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::EncodingFailure => "encoding-failure",
            ErrorKind::BrokenPipe => "broken-pipe",
            ErrorKind::NoRemoteProcess => "no-remote-process",
            ErrorKind::BufferTruncated => "buffer-truncated",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in pipe transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The pipe name was never seen before the deadline.
    #[error("pipe {name} not found (os error {code})")]
    NotFound { name: String, code: u32 },

    /// The pipe existed but never became ready before the deadline.
    #[error("timed out after {timeout:?} waiting for pipe {name}")]
    Timeout {
        name: String,
        timeout: Duration,
        code: u32,
    },

    /// Every pipe instance is taken or the listener is not accepting yet.
    #[error("pipe {name} is busy (os error {code})")]
    Busy { name: String, code: u32 },

    #[error("access denied opening pipe {name} (os error {code})")]
    AccessDenied { name: String, code: u32 },

    /// The channel opened but could not be switched to byte mode.
    #[error("failed to configure byte mode on pipe {name} (os error {code})")]
    ConfigFailure { name: String, code: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote end closed the channel.
    #[error("pipe broken (os error {code})")]
    BrokenPipe { code: u32 },

    #[error("no process on the other end of the pipe (os error {code})")]
    NoRemoteProcess { code: u32 },

    /// Any other I/O error on the channel.
    #[error("pipe I/O error: {0}")]
    Io(std::io::Error),
}

impl TransportError {
    /// Classify an OS-level I/O error into the stable taxonomy.
    pub fn from_io(err: std::io::Error) -> Self {
        match err.raw_os_error().map(|code| code as u32) {
            Some(code) => match codes::classify(code) {
                ErrorKind::BrokenPipe => TransportError::BrokenPipe { code },
                ErrorKind::NoRemoteProcess => TransportError::NoRemoteProcess { code },
                _ => TransportError::Io(err),
            },
            None => TransportError::Io(err),
        }
    }

    /// The remote closed its end (end of stream).
    pub fn closed_by_remote() -> Self {
        TransportError::BrokenPipe {
            code: codes::BROKEN_PIPE,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::NotFound { .. } => ErrorKind::NotFound,
            TransportError::Timeout { .. } | TransportError::Busy { .. } => ErrorKind::Timeout,
            TransportError::AccessDenied { .. } => ErrorKind::AccessDenied,
            TransportError::ConfigFailure { .. } => ErrorKind::ConfigFailure,
            TransportError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TransportError::BrokenPipe { .. } => ErrorKind::BrokenPipe,
            TransportError::NoRemoteProcess { .. } => ErrorKind::NoRemoteProcess,
            TransportError::Io(_) => ErrorKind::Io,
        }
    }

    /// The platform error code behind this failure (`GetLastError` / `errno`).
    pub fn os_code(&self) -> u32 {
        match self {
            TransportError::NotFound { code, .. }
            | TransportError::Timeout { code, .. }
            | TransportError::Busy { code, .. }
            | TransportError::AccessDenied { code, .. }
            | TransportError::ConfigFailure { code, .. }
            | TransportError::BrokenPipe { code }
            | TransportError::NoRemoteProcess { code } => *code,
            TransportError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            TransportError::Io(err) => err
                .raw_os_error()
                .map(|code| code as u32)
                .unwrap_or(codes::IO_FAILURE),
        }
    }

    /// Whether the connector should keep waiting for the listener.
    pub(crate) fn is_not_ready(&self) -> bool {
        matches!(
            self,
            TransportError::Busy { .. } | TransportError::NotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
