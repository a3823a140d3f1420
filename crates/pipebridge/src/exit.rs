use std::fmt;
use std::io;

use pipebridge_line::LineError;
use pipebridge_transport::ErrorKind;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Exit code for a taxonomy kind.
pub fn kind_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Ok | ErrorKind::BufferTruncated => SUCCESS,
        ErrorKind::NotFound | ErrorKind::ConfigFailure | ErrorKind::Io => TRANSPORT_ERROR,
        ErrorKind::Timeout => TIMEOUT,
        ErrorKind::AccessDenied => PERMISSION_DENIED,
        ErrorKind::InvalidArgument => USAGE,
        ErrorKind::EncodingFailure => DATA_INVALID,
        ErrorKind::BrokenPipe | ErrorKind::NoRemoteProcess => FAILURE,
        ErrorKind::Internal => INTERNAL,
    }
}

pub fn line_error(context: &str, err: LineError) -> CliError {
    CliError::new(kind_code(err.kind()), format!("{context}: {err}"))
}
