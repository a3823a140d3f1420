use std::ptr;
use std::time::Duration;

use tracing::{debug, trace};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_NOT_FOUND,
    ERROR_PIPE_BUSY, ERROR_SEM_TIMEOUT, GENERIC_READ, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, WriteFile, FILE_ATTRIBUTE_NORMAL, OPEN_EXISTING,
};
use windows_sys::Win32::System::Pipes::{
    PeekNamedPipe, SetNamedPipeHandleState, WaitNamedPipeW, PIPE_READMODE_BYTE,
};
use windows_sys::Win32::System::IO::CancelIoEx;

use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::traits::{PipeChannel, PipeEndpoint, Readiness};

/// `WaitNamedPipeW` treats 0 as "server default" and `u32::MAX` as forever.
const MAX_WAIT_MS: u32 = u32::MAX - 1;

/// Windows named pipe endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamedPipeEndpoint;

impl PipeEndpoint for NamedPipeEndpoint {
    type Channel = NamedPipeClient;

    fn wait_ready(&self, name: &PipeName, timeout: Duration) -> Result<Readiness> {
        let wide = name.to_wide();
        let wait_ms = u32::try_from(timeout.as_millis())
            .unwrap_or(MAX_WAIT_MS)
            .clamp(1, MAX_WAIT_MS);

        // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives the call.
        let ok = unsafe { WaitNamedPipeW(wide.as_ptr(), wait_ms) };
        if ok != 0 {
            return Ok(Readiness::Ready);
        }

        match last_error() {
            ERROR_FILE_NOT_FOUND => Ok(Readiness::Missing),
            ERROR_SEM_TIMEOUT => Ok(Readiness::Busy),
            ERROR_ACCESS_DENIED => Err(TransportError::AccessDenied {
                name: name.to_string(),
                code: ERROR_ACCESS_DENIED,
            }),
            code => Err(os_error(code)),
        }
    }

    fn open(&self, name: &PipeName) -> Result<NamedPipeClient> {
        let wide = name.to_wide();

        // SAFETY: `wide` is NUL-terminated; null security attributes and template
        // handle are documented as valid.
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                ptr::null_mut(),
            )
        };

        if handle == INVALID_HANDLE_VALUE {
            let code = last_error();
            return Err(match code {
                ERROR_PIPE_BUSY => TransportError::Busy {
                    name: name.to_string(),
                    code,
                },
                ERROR_FILE_NOT_FOUND => TransportError::NotFound {
                    name: name.to_string(),
                    code,
                },
                ERROR_ACCESS_DENIED => TransportError::AccessDenied {
                    name: name.to_string(),
                    code,
                },
                _ => os_error(code),
            });
        }

        debug!(%name, handle = handle as isize, "opened named pipe");
        Ok(NamedPipeClient { handle })
    }

    fn transport_name(&self) -> &'static str {
        "windows-named-pipe"
    }
}

/// Client end of a Windows named pipe.
#[derive(Debug)]
pub struct NamedPipeClient {
    handle: HANDLE,
}

// SAFETY: a pipe HANDLE may be used from any thread; the bridge never uses one
// handle from two threads at once.
unsafe impl Send for NamedPipeClient {}

impl PipeChannel for NamedPipeClient {
    fn bytes_available(&mut self) -> Result<usize> {
        let mut available: u32 = 0;
        // SAFETY: a null buffer with size 0 only queries counts; `available` is a
        // live writable u32.
        let ok = unsafe {
            PeekNamedPipe(
                self.handle,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                &mut available,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(os_error(last_error()));
        }

        trace!(available, "named pipe peek");
        Ok(available as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let mut read: u32 = 0;
        // SAFETY: `buf` is writable for `len` bytes and the handle is open and
        // synchronous (no OVERLAPPED).
        let ok = unsafe {
            ReadFile(
                self.handle,
                buf.as_mut_ptr(),
                len,
                &mut read,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(os_error(last_error()));
        }
        Ok(read as usize)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let mut written: u32 = 0;
        // SAFETY: `buf` is readable for `len` bytes and the handle is open and
        // synchronous (no OVERLAPPED).
        let ok = unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                len,
                &mut written,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(os_error(last_error()));
        }
        // No FlushFileBuffers: it blocks until the server drains the pipe.
        Ok(written as usize)
    }

    fn set_byte_mode(&mut self) -> Result<()> {
        let mode = PIPE_READMODE_BYTE;
        // SAFETY: `mode` is a live value; null collection parameters are allowed
        // for local pipes.
        let ok = unsafe {
            SetNamedPipeHandleState(self.handle, &mode, ptr::null(), ptr::null())
        };
        if ok == 0 {
            return Err(os_error(last_error()));
        }
        Ok(())
    }

    fn cancel_io(&mut self) -> Result<()> {
        // SAFETY: a null OVERLAPPED cancels every outstanding request on the handle.
        let ok = unsafe { CancelIoEx(self.handle, ptr::null()) };
        if ok == 0 {
            let code = last_error();
            if code != ERROR_NOT_FOUND {
                return Err(os_error(code));
            }
        }
        Ok(())
    }

    fn raw_handle(&self) -> isize {
        self.handle as isize
    }
}

impl Drop for NamedPipeClient {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateFileW and is closed exactly once here.
        unsafe {
            CloseHandle(self.handle);
        }
        debug!(handle = self.handle as isize, "closed named pipe");
    }
}

fn last_error() -> u32 {
    // SAFETY: GetLastError has no preconditions.
    unsafe { GetLastError() }
}

fn os_error(code: u32) -> TransportError {
    TransportError::from_io(std::io::Error::from_raw_os_error(code as i32))
}
