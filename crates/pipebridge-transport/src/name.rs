use std::fmt;
#[cfg(unix)]
use std::path::{Path, PathBuf};

use crate::error::{Result, TransportError};

/// Local pipe namespace prefix on Windows.
pub const LOCAL_PIPE_PREFIX: &str = r"\\.\pipe\";

/// Windows caps full pipe names at 256 characters.
pub const MAX_NAME_LEN: usize = 256;

/// A validated pipe name.
///
/// On Windows this is the full `\\server\pipe\name` path handed to the wide
/// OS APIs. On Unix the same names resolve to a Unix domain socket path:
/// `\\.\pipe\foo` and `foo` both map to `<temp_dir>/foo`, and anything
/// containing `/` is taken as a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipeName {
    full: String,
    #[cfg(unix)]
    socket_path: PathBuf,
}

impl PipeName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(TransportError::InvalidArgument(
                "pipe name cannot be empty".into(),
            ));
        }
        if name.contains('\0') {
            return Err(TransportError::InvalidArgument(
                "pipe name cannot contain NUL".into(),
            ));
        }

        let full = if name.starts_with(r"\\") {
            match split_pipe_path(name) {
                Some(rest) if !rest.is_empty() => name.to_string(),
                _ => {
                    return Err(TransportError::InvalidArgument(format!(
                        "pipe path must look like \\\\server\\pipe\\name: {name}"
                    )))
                }
            }
        } else if cfg!(windows) {
            format!("{LOCAL_PIPE_PREFIX}{name}")
        } else {
            name.to_string()
        };

        if full.chars().count() > MAX_NAME_LEN {
            return Err(TransportError::InvalidArgument(format!(
                "pipe name too long ({} chars, max {MAX_NAME_LEN})",
                full.chars().count()
            )));
        }

        #[cfg(unix)]
        let socket_path = resolve_socket_path(&full)?;

        Ok(Self {
            full,
            #[cfg(unix)]
            socket_path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// NUL-terminated UTF-16 form for the wide Windows APIs.
    #[cfg(windows)]
    pub fn to_wide(&self) -> Vec<u16> {
        self.full.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Socket path this name resolves to.
    #[cfg(unix)]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Return the part after `\\server\pipe\`, if `name` has that shape.
fn split_pipe_path(name: &str) -> Option<&str> {
    let rest = name.strip_prefix(r"\\")?;
    let (server, rest) = rest.split_once('\\')?;
    if server.is_empty() {
        return None;
    }
    let (segment, rest) = rest.split_once('\\')?;
    segment.eq_ignore_ascii_case("pipe").then_some(rest)
}

#[cfg(unix)]
fn resolve_socket_path(full: &str) -> Result<PathBuf> {
    if let Some(rest) = split_pipe_path(full) {
        let mut path = std::env::temp_dir();
        for part in rest.split('\\').filter(|part| !part.is_empty()) {
            if part == "." || part == ".." || part.contains('/') {
                return Err(TransportError::InvalidArgument(format!(
                    "pipe name component not allowed: {part}"
                )));
            }
            path.push(part);
        }
        return Ok(path);
    }

    if full.contains('/') {
        return Ok(PathBuf::from(full));
    }

    Ok(std::env::temp_dir().join(full))
}
