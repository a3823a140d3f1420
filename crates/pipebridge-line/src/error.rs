use pipebridge_transport::{codes, ErrorKind, TransportError};

/// Errors that can occur while writing or reading line frames.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Wide text contained an unpaired surrogate.
    #[error("invalid UTF-16 at code unit {position}: unpaired surrogate {unit:#06x}")]
    Encoding { position: usize, unit: u16 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The channel has already been closed.
    #[error("channel closed")]
    Closed,
}

impl LineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineError::Transport(err) => err.kind(),
            LineError::Encoding { .. } => ErrorKind::EncodingFailure,
            LineError::InvalidArgument(_) | LineError::Closed => ErrorKind::InvalidArgument,
        }
    }

    pub fn os_code(&self) -> u32 {
        match self {
            LineError::Transport(err) => err.os_code(),
            LineError::Encoding { .. } => codes::ENCODING_FAILURE,
            LineError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            LineError::Closed => codes::INVALID_HANDLE,
        }
    }
}

pub type Result<T> = std::result::Result<T, LineError>;
