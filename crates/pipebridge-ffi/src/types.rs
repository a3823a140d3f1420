/// Opaque connection handle handed to C callers.
///
/// Handles are registry keys, not OS handle values, so a stale handle can
/// never alias a connection opened later.
pub type PipeHandle = isize;

/// Returned by `pipe_connect` on failure. Never a valid handle.
pub const INVALID_PIPE_HANDLE: PipeHandle = -1;

/// Returned by the counting calls on failure.
pub const PIPE_FAILURE: i32 = -1;

/// Returned by `pipe_read_line` when no complete line is available.
pub const PIPE_NO_DATA: i32 = 0;

#[allow(dead_code)]
pub const PIPE_KIND_OK: i32 = 0;
#[allow(dead_code)]
pub const PIPE_KIND_NOT_FOUND: i32 = 1;
#[allow(dead_code)]
pub const PIPE_KIND_TIMEOUT: i32 = 2;
#[allow(dead_code)]
pub const PIPE_KIND_ACCESS_DENIED: i32 = 3;
#[allow(dead_code)]
pub const PIPE_KIND_CONFIG_FAILURE: i32 = 4;
#[allow(dead_code)]
pub const PIPE_KIND_INVALID_ARGUMENT: i32 = 5;
#[allow(dead_code)]
pub const PIPE_KIND_ENCODING_FAILURE: i32 = 6;
#[allow(dead_code)]
pub const PIPE_KIND_BROKEN_PIPE: i32 = 7;
#[allow(dead_code)]
pub const PIPE_KIND_NO_REMOTE_PROCESS: i32 = 8;
#[allow(dead_code)]
pub const PIPE_KIND_BUFFER_TRUNCATED: i32 = 9;
#[allow(dead_code)]
pub const PIPE_KIND_IO: i32 = 10;
#[allow(dead_code)]
pub const PIPE_KIND_INTERNAL: i32 = 99;

#[cfg(test)]
mod tests {
    use pipebridge_transport::ErrorKind;

    use super::*;

    #[test]
    fn kind_constants_match_taxonomy() {
        let pairs = [
            (PIPE_KIND_OK, ErrorKind::Ok),
            (PIPE_KIND_NOT_FOUND, ErrorKind::NotFound),
            (PIPE_KIND_TIMEOUT, ErrorKind::Timeout),
            (PIPE_KIND_ACCESS_DENIED, ErrorKind::AccessDenied),
            (PIPE_KIND_CONFIG_FAILURE, ErrorKind::ConfigFailure),
            (PIPE_KIND_INVALID_ARGUMENT, ErrorKind::InvalidArgument),
            (PIPE_KIND_ENCODING_FAILURE, ErrorKind::EncodingFailure),
            (PIPE_KIND_BROKEN_PIPE, ErrorKind::BrokenPipe),
            (PIPE_KIND_NO_REMOTE_PROCESS, ErrorKind::NoRemoteProcess),
            (PIPE_KIND_BUFFER_TRUNCATED, ErrorKind::BufferTruncated),
            (PIPE_KIND_IO, ErrorKind::Io),
            (PIPE_KIND_INTERNAL, ErrorKind::Internal),
        ];
        for (constant, kind) in pairs {
            assert_eq!(constant, kind as i32, "{kind}");
        }
    }
}
