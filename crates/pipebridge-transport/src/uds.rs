use std::io::{ErrorKind as IoErrorKind, Read};
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::traits::{PipeChannel, PipeEndpoint, Readiness};

/// Unix domain socket endpoint.
///
/// Stands in for the Windows named pipe namespace on Linux and macOS. A pipe
/// is "ready" once its socket path exists; the listener accepting is the
/// open itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixSocketEndpoint;

impl PipeEndpoint for UnixSocketEndpoint {
    type Channel = UnixPipeClient;

    fn wait_ready(&self, name: &PipeName, _timeout: Duration) -> Result<Readiness> {
        let path = name.socket_path();
        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.file_type().is_socket() => Ok(Readiness::Ready),
            Ok(_) => {
                debug!(?path, "pipe path exists but is not a socket");
                Ok(Readiness::Missing)
            }
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(Readiness::Missing),
            Err(err) if err.kind() == IoErrorKind::PermissionDenied => {
                Err(TransportError::AccessDenied {
                    name: name.to_string(),
                    code: os_code(&err),
                })
            }
            Err(err) => Err(TransportError::from_io(err)),
        }
    }

    fn open(&self, name: &PipeName) -> Result<UnixPipeClient> {
        let path = name.socket_path();
        let stream = UnixStream::connect(path).map_err(|err| match err.kind() {
            IoErrorKind::NotFound => TransportError::NotFound {
                name: name.to_string(),
                code: os_code(&err),
            },
            IoErrorKind::ConnectionRefused => TransportError::Busy {
                name: name.to_string(),
                code: os_code(&err),
            },
            IoErrorKind::PermissionDenied => TransportError::AccessDenied {
                name: name.to_string(),
                code: os_code(&err),
            },
            _ => TransportError::from_io(err),
        })?;

        suppress_sigpipe(&stream)?;
        debug!(?path, "connected to unix domain socket");
        Ok(UnixPipeClient { stream })
    }

    fn transport_name(&self) -> &'static str {
        "unix-domain-socket"
    }
}

/// A connected Unix domain socket used as a pipe channel.
#[derive(Debug)]
pub struct UnixPipeClient {
    stream: UnixStream,
}

impl UnixPipeClient {
    fn peek_one(&self) -> Result<usize> {
        let mut probe = 0u8;
        // SAFETY: `probe` is a valid writable byte, and the fd is an open socket
        // owned by `self.stream` for the duration of the call.
        let rc = unsafe {
            libc::recv(
                self.stream.as_raw_fd(),
                (&mut probe as *mut u8).cast::<libc::c_void>(),
                1,
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };

        match rc {
            0 => Err(TransportError::closed_by_remote()),
            n if n > 0 => Ok(n as usize),
            _ => {
                let err = std::io::Error::last_os_error();
                match err.kind() {
                    IoErrorKind::WouldBlock | IoErrorKind::Interrupted => Ok(0),
                    _ => Err(TransportError::from_io(err)),
                }
            }
        }
    }
}

impl PipeChannel for UnixPipeClient {
    fn bytes_available(&mut self) -> Result<usize> {
        let mut available: libc::c_int = 0;
        // SAFETY: FIONREAD writes a single c_int through the provided pointer,
        // which points at a live local.
        let rc = unsafe {
            libc::ioctl(
                self.stream.as_raw_fd(),
                libc::FIONREAD,
                &mut available as *mut libc::c_int,
            )
        };
        if rc < 0 {
            return Err(TransportError::from_io(std::io::Error::last_os_error()));
        }

        if available > 0 {
            trace!(available, "socket has pending bytes");
            return Ok(available as usize);
        }

        // FIONREAD cannot tell "nothing yet" from "peer hung up".
        self.peek_one()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.stream.read(buf) {
                Ok(0) if !buf.is_empty() => return Err(TransportError::closed_by_remote()),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            // SAFETY: `buf` is a valid readable slice for its length and the fd is
            // an open socket owned by `self.stream`.
            let rc = unsafe {
                libc::send(
                    self.stream.as_raw_fd(),
                    buf.as_ptr().cast::<libc::c_void>(),
                    buf.len(),
                    SEND_FLAGS,
                )
            };
            if rc >= 0 {
                return Ok(rc as usize);
            }

            let err = std::io::Error::last_os_error();
            if err.kind() != IoErrorKind::Interrupted {
                return Err(TransportError::from_io(err));
            }
        }
    }

    fn set_byte_mode(&mut self) -> Result<()> {
        // SOCK_STREAM sockets are byte streams already.
        Ok(())
    }

    fn cancel_io(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::from_io(err)),
        }
    }

    fn raw_handle(&self) -> isize {
        self.stream.as_raw_fd() as isize
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;

// A dead peer must surface as EPIPE, not kill the host process.
#[cfg(target_vendor = "apple")]
fn suppress_sigpipe(stream: &UnixStream) -> Result<()> {
    let enable: libc::c_int = 1;
    // SAFETY: `enable` is a live c_int and the option length matches its size.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_NOSIGPIPE,
            (&enable as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(TransportError::from_io(std::io::Error::last_os_error()))
    }
}

#[cfg(not(target_vendor = "apple"))]
fn suppress_sigpipe(_stream: &UnixStream) -> Result<()> {
    Ok(())
}

fn os_code(err: &std::io::Error) -> u32 {
    err.raw_os_error()
        .map(|code| code as u32)
        .unwrap_or(crate::codes::IO_FAILURE)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Instant;

    use super::*;
    use crate::connector::{connect_with_config, ConnectConfig};
    use crate::error::ErrorKind;

    fn unique_socket(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "pipebridge-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let sock = dir.join("bridge.sock");
        (dir, sock)
    }

    fn config(timeout_ms: u64) -> ConnectConfig {
        ConnectConfig {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn wait_for_bytes(client: &mut UnixPipeClient, at_least: usize) -> usize {
        let start = Instant::now();
        loop {
            let available = client.bytes_available().unwrap();
            if available >= at_least || start.elapsed() > Duration::from_secs(2) {
                return available;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn connect_write_and_read() {
        let (dir, sock) = unique_socket("rw");
        let listener = UnixListener::bind(&sock).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping\n");
            stream.write_all(b"pong\n").unwrap();
            buf
        });

        let mut client = connect_with_config(sock.to_str().unwrap(), &config(1000)).unwrap();
        assert_eq!(client.write(b"ping\n").unwrap(), 5);

        assert_eq!(wait_for_bytes(&mut client, 5), 5);
        let mut buf = [0u8; 5];
        assert_eq!(client.read_available(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"pong\n");

        server.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn idle_channel_reports_zero_available() {
        let (dir, sock) = unique_socket("idle");
        let listener = UnixListener::bind(&sock).unwrap();

        let mut client = connect_with_config(sock.to_str().unwrap(), &config(1000)).unwrap();
        let (_server_side, _) = listener.accept().unwrap();

        let start = Instant::now();
        assert_eq!(client.bytes_available().unwrap(), 0);
        assert!(start.elapsed() < Duration::from_millis(100));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn remote_hangup_is_broken_pipe() {
        let (dir, sock) = unique_socket("hangup");
        let listener = UnixListener::bind(&sock).unwrap();

        let mut client = connect_with_config(sock.to_str().unwrap(), &config(1000)).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        drop(server_side);

        let err = client.bytes_available().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);

        let mut buf = [0u8; 4];
        let err = client.read_available(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_socket_times_out_as_not_found() {
        let (dir, sock) = unique_socket("missing");
        let start = Instant::now();
        let err = connect_with_config(sock.to_str().unwrap(), &config(200)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(start.elapsed() < Duration::from_millis(200 + 500));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn late_listener_connects_within_timeout() {
        let (dir, sock) = unique_socket("late");
        let bind_path = sock.clone();
        let server = thread::spawn(move || {
            thread::sleep(Duration::from_millis(1500));
            let listener = UnixListener::bind(&bind_path).unwrap();
            let _ = listener.accept().unwrap();
        });

        let start = Instant::now();
        let client = connect_with_config(sock.to_str().unwrap(), &config(2000));
        let elapsed = start.elapsed();

        assert!(client.is_ok(), "connect should succeed: {client:?}");
        assert!(elapsed >= Duration::from_millis(1400));
        assert!(elapsed <= Duration::from_millis(2100));

        server.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stale_socket_without_listener_times_out() {
        let (dir, sock) = unique_socket("stale");
        drop(UnixListener::bind(&sock).unwrap());
        assert!(sock.exists());

        let err = connect_with_config(sock.to_str().unwrap(), &config(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cancel_io_is_safe_to_repeat() {
        let (dir, sock) = unique_socket("cancel");
        let listener = UnixListener::bind(&sock).unwrap();

        let mut client = connect_with_config(sock.to_str().unwrap(), &config(1000)).unwrap();
        let _server_side = listener.accept().unwrap();

        client.cancel_io().unwrap();
        client.cancel_io().unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_after_remote_close_fails_without_signal() {
        let (dir, sock) = unique_socket("epipe");
        let listener = UnixListener::bind(&sock).unwrap();

        let mut client = connect_with_config(sock.to_str().unwrap(), &config(1000)).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        drop(server_side);

        let mut failed = None;
        for _ in 0..16 {
            if let Err(err) = client.write(b"frame\n") {
                failed = Some(err);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let err = failed.expect("write to a closed peer should eventually fail");
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
