use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pipebridge_transport::{PipeChannel, Result, TransportError};

/// In-memory channel with scriptable availability, short reads and failures.
#[derive(Default)]
pub(crate) struct ScriptedChannel {
    pub incoming: VecDeque<u8>,
    /// Extra bytes reported by `bytes_available` that `read_available` never delivers.
    pub overreport: usize,
    /// Once `incoming` drains, the remote is gone.
    pub hangup_when_drained: bool,
    pub fail_reads: bool,
    pub write_limit: Option<usize>,
    pub fail_writes: bool,
    pub written: Vec<u8>,
    pub read_calls: usize,
    pub journal: Journal,
}

/// Lifecycle events of the owning channel. Dropping it records the release.
#[derive(Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    fn push(&self, event: &'static str) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event);
        }
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.push("release");
    }
}

impl ScriptedChannel {
    pub fn with_incoming(bytes: &[u8]) -> Self {
        Self {
            incoming: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub fn journal(&self) -> Arc<Mutex<Vec<&'static str>>> {
        self.journal.0.clone()
    }
}

impl PipeChannel for ScriptedChannel {
    fn bytes_available(&mut self) -> Result<usize> {
        if self.incoming.is_empty() && self.hangup_when_drained {
            return Err(TransportError::closed_by_remote());
        }
        let available = self.incoming.len() + self.overreport;
        self.overreport = 0;
        Ok(available)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_calls += 1;
        if self.fail_reads {
            return Err(TransportError::closed_by_remote());
        }
        let n = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.fail_writes {
            return Err(TransportError::closed_by_remote());
        }
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn set_byte_mode(&mut self) -> Result<()> {
        Ok(())
    }

    fn cancel_io(&mut self) -> Result<()> {
        self.journal.push("cancel");
        Ok(())
    }

    fn raw_handle(&self) -> isize {
        7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_update_keeps_single_release() {
        let channel = ScriptedChannel {
            write_limit: Some(1),
            fail_reads: true,
            ..ScriptedChannel::with_incoming(b"queued")
        };
        let journal = channel.journal();

        assert_eq!(channel.incoming.len(), 6);
        assert!(journal.lock().unwrap().is_empty());
        drop(channel);
        assert_eq!(*journal.lock().unwrap(), vec!["release"]);
    }
}
