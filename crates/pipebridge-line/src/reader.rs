use bytes::{Bytes, BytesMut};
use pipebridge_transport::{PipeChannel, TransportError};
use tracing::{debug, trace};

use crate::error::{LineError, Result};

/// Frame delimiter.
pub const NEWLINE: u8 = b'\n';

/// Default upper bound on one channel read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Line reader configuration.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum bytes pulled from the channel by one read call.
    pub read_chunk_size: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Result of one non-blocking line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No complete line yet. Any partial line stays buffered.
    Empty,
    /// A complete line, newline included.
    Line(Bytes),
    /// The first `max_len` bytes of a longer line. The rest stays buffered
    /// and is returned by the next reads.
    Truncated(Bytes),
    /// Unterminated tail flushed because the channel broke. The error is
    /// reported by the next read.
    Partial(Bytes),
}

impl ReadOutcome {
    pub fn bytes(&self) -> &[u8] {
        match self {
            ReadOutcome::Empty => &[],
            ReadOutcome::Line(b) | ReadOutcome::Truncated(b) | ReadOutcome::Partial(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

/// Assembles newline-terminated lines from a [`PipeChannel`] without blocking.
///
/// Bytes already pulled from the channel but not yet returned are kept in a
/// per-reader accumulator, so a line split across polls is reassembled and
/// an over-long line is handed out in `max_len` pieces instead of being cut.
#[derive(Debug, Default)]
pub struct LineReader {
    pending: BytesMut,
    deferred: Option<TransportError>,
    config: LineConfig,
}

impl LineReader {
    pub fn new() -> Self {
        Self::with_config(LineConfig::default())
    }

    pub fn with_config(config: LineConfig) -> Self {
        Self {
            pending: BytesMut::new(),
            deferred: None,
            config,
        }
    }

    /// Read at most `max_len` bytes of the next line.
    ///
    /// Returns [`ReadOutcome::Empty`] when the channel has nothing to offer.
    /// Only ever reads as many bytes as the channel reports available.
    pub fn read_line<C: PipeChannel>(
        &mut self,
        channel: &mut C,
        max_len: usize,
    ) -> Result<ReadOutcome> {
        if max_len == 0 {
            return Err(LineError::InvalidArgument(
                "line buffer must hold at least one byte".into(),
            ));
        }

        if let Some(outcome) = self.take_ready(max_len) {
            return Ok(outcome);
        }

        if let Some(err) = self.deferred.take() {
            debug!(%err, "reporting deferred channel failure");
            return Err(err.into());
        }

        let chunk_size = self.config.read_chunk_size.max(1);
        loop {
            let available = match channel.bytes_available() {
                Ok(available) => available,
                Err(err) => return self.fail(err, max_len),
            };
            if available == 0 {
                return Ok(ReadOutcome::Empty);
            }

            let want = available.min(chunk_size);
            let start = self.pending.len();
            self.pending.resize(start + want, 0);

            let read = match channel.read_available(&mut self.pending[start..]) {
                Ok(read) => read,
                Err(err) => {
                    self.pending.truncate(start);
                    return self.fail(err, max_len);
                }
            };
            self.pending.truncate(start + read);
            trace!(available, read, pending = self.pending.len(), "pulled bytes");

            if let Some(outcome) = self.take_ready(max_len) {
                return Ok(outcome);
            }

            if read < want {
                // The remote wrote less than it announced; keep the partial.
                return Ok(ReadOutcome::Empty);
            }
        }
    }

    /// Bytes buffered but not yet returned.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered bytes and any deferred failure.
    pub fn discard(&mut self) {
        self.pending.clear();
        self.deferred = None;
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    fn take_ready(&mut self, max_len: usize) -> Option<ReadOutcome> {
        let window = self.pending.len().min(max_len);
        if let Some(pos) = self.pending[..window].iter().position(|&b| b == NEWLINE) {
            return Some(ReadOutcome::Line(self.pending.split_to(pos + 1).freeze()));
        }

        if self.pending.len() >= max_len {
            debug!(
                max_len,
                remaining = self.pending.len() - max_len,
                "line longer than buffer; returning prefix"
            );
            return Some(ReadOutcome::Truncated(
                self.pending.split_to(max_len).freeze(),
            ));
        }

        None
    }

    fn fail(&mut self, err: TransportError, max_len: usize) -> Result<ReadOutcome> {
        if self.pending.is_empty() {
            return Err(err.into());
        }

        let take = self.pending.len().min(max_len);
        debug!(%err, flushed = take, "channel failed with a partial line buffered");
        self.deferred = Some(err);
        Ok(ReadOutcome::Partial(self.pending.split_to(take).freeze()))
    }
}

#[cfg(test)]
mod tests {
    use pipebridge_transport::ErrorKind;

    use super::*;
    use crate::mock::ScriptedChannel;

    #[test]
    fn nothing_available_is_empty_not_error() {
        let mut channel = ScriptedChannel::default();
        let mut reader = LineReader::new();
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap(),
            ReadOutcome::Empty
        );
        assert_eq!(channel.read_calls, 0);
    }

    #[test]
    fn reads_one_complete_line() {
        let mut channel = ScriptedChannel::with_incoming(b"ping\n");
        let mut reader = LineReader::new();
        let outcome = reader.read_line(&mut channel, 64).unwrap();
        assert_eq!(outcome, ReadOutcome::Line(Bytes::from_static(b"ping\n")));
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn several_lines_from_one_read_come_out_one_at_a_time() {
        let mut channel = ScriptedChannel::with_incoming(b"one\ntwo\nthree\n");
        let mut reader = LineReader::new();

        assert_eq!(reader.read_line(&mut channel, 64).unwrap().bytes(), b"one\n");
        assert_eq!(channel.read_calls, 1);
        assert_eq!(reader.read_line(&mut channel, 64).unwrap().bytes(), b"two\n");
        assert_eq!(reader.read_line(&mut channel, 64).unwrap().bytes(), b"three\n");
        assert_eq!(channel.read_calls, 1, "buffered lines need no channel reads");
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap(),
            ReadOutcome::Empty
        );
    }

    #[test]
    fn over_long_line_is_split_without_loss() {
        let mut channel = ScriptedChannel::with_incoming(b"0123456789012345678\n");
        let mut reader = LineReader::new();

        // Capacity 8 at the C boundary leaves 7 data bytes.
        let first = reader.read_line(&mut channel, 7).unwrap();
        assert_eq!(first, ReadOutcome::Truncated(Bytes::from_static(b"0123456")));
        assert_eq!(reader.pending_len(), 13);

        let second = reader.read_line(&mut channel, 63).unwrap();
        assert_eq!(
            second,
            ReadOutcome::Line(Bytes::from_static(b"789012345678\n"))
        );
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn over_long_line_drains_in_buffer_sized_pieces() {
        let mut channel = ScriptedChannel::with_incoming(b"0123456789012345678\n");
        let mut reader = LineReader::new();

        let pieces: Vec<ReadOutcome> = (0..3)
            .map(|_| reader.read_line(&mut channel, 7).unwrap())
            .collect();
        assert_eq!(
            pieces,
            vec![
                ReadOutcome::Truncated(Bytes::from_static(b"0123456")),
                ReadOutcome::Truncated(Bytes::from_static(b"7890123")),
                ReadOutcome::Line(Bytes::from_static(b"45678\n")),
            ]
        );
    }

    #[test]
    fn line_exactly_filling_buffer_is_complete() {
        let mut channel = ScriptedChannel::with_incoming(b"abcdef\n");
        let mut reader = LineReader::new();
        let outcome = reader.read_line(&mut channel, 7).unwrap();
        assert_eq!(outcome, ReadOutcome::Line(Bytes::from_static(b"abcdef\n")));
    }

    #[test]
    fn newline_one_past_buffer_comes_back_alone() {
        let mut channel = ScriptedChannel::with_incoming(b"abcdefg\n");
        let mut reader = LineReader::new();
        assert_eq!(
            reader.read_line(&mut channel, 7).unwrap(),
            ReadOutcome::Truncated(Bytes::from_static(b"abcdefg"))
        );
        assert_eq!(
            reader.read_line(&mut channel, 7).unwrap(),
            ReadOutcome::Line(Bytes::from_static(b"\n"))
        );
    }

    #[test]
    fn short_read_keeps_partial_until_line_completes() {
        let mut channel = ScriptedChannel::with_incoming(b"{\"type\":");
        channel.overreport = 10;
        let mut reader = LineReader::new();

        assert_eq!(
            reader.read_line(&mut channel, 256).unwrap(),
            ReadOutcome::Empty
        );
        assert_eq!(reader.pending_len(), 8);

        channel.push(b"\"ack\"}\n");
        assert_eq!(
            reader.read_line(&mut channel, 256).unwrap(),
            ReadOutcome::Line(Bytes::from_static(b"{\"type\":\"ack\"}\n"))
        );
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn stalled_partial_survives_empty_polls() {
        let mut channel = ScriptedChannel::with_incoming(b"half");
        let mut reader = LineReader::new();

        assert_eq!(reader.read_line(&mut channel, 64).unwrap(), ReadOutcome::Empty);
        assert_eq!(reader.read_line(&mut channel, 64).unwrap(), ReadOutcome::Empty);
        assert_eq!(reader.pending_len(), 4);

        channel.push(b"-line\n");
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap().bytes(),
            b"half-line\n"
        );
    }

    #[test]
    fn small_chunks_loop_within_one_call() {
        let mut channel = ScriptedChannel::with_incoming(b"abcdefghij\n");
        let mut reader = LineReader::with_config(LineConfig { read_chunk_size: 3 });
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap().bytes(),
            b"abcdefghij\n"
        );
        assert_eq!(channel.read_calls, 4);
    }

    #[test]
    fn broken_channel_with_nothing_buffered_fails_now() {
        let mut channel = ScriptedChannel::default();
        channel.hangup_when_drained = true;
        let mut reader = LineReader::new();

        let err = reader.read_line(&mut channel, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn broken_channel_flushes_partial_then_fails() {
        let mut channel = ScriptedChannel::with_incoming(b"tail");
        let mut reader = LineReader::new();
        assert_eq!(reader.read_line(&mut channel, 64).unwrap(), ReadOutcome::Empty);

        channel.hangup_when_drained = true;
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap(),
            ReadOutcome::Partial(Bytes::from_static(b"tail"))
        );

        let err = reader.read_line(&mut channel, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn read_failure_after_peek_defers_error_behind_partial() {
        let mut channel = ScriptedChannel::with_incoming(b"abc");
        let mut reader = LineReader::new();
        assert_eq!(reader.read_line(&mut channel, 64).unwrap(), ReadOutcome::Empty);

        channel.push(b"def\n");
        channel.fail_reads = true;
        assert_eq!(
            reader.read_line(&mut channel, 64).unwrap(),
            ReadOutcome::Partial(Bytes::from_static(b"abc"))
        );
        assert!(reader.read_line(&mut channel, 64).is_err());
    }

    #[test]
    fn buffered_lines_drain_before_deferred_error() {
        let mut channel = ScriptedChannel::with_incoming(b"a\nb\n");
        channel.hangup_when_drained = true;
        let mut reader = LineReader::new();

        assert_eq!(reader.read_line(&mut channel, 64).unwrap().bytes(), b"a\n");
        assert_eq!(reader.read_line(&mut channel, 64).unwrap().bytes(), b"b\n");
        assert!(reader.read_line(&mut channel, 64).is_err());
    }

    #[test]
    fn zero_max_len_is_rejected_before_io() {
        let mut channel = ScriptedChannel::with_incoming(b"x\n");
        let mut reader = LineReader::new();
        assert!(matches!(
            reader.read_line(&mut channel, 0),
            Err(LineError::InvalidArgument(_))
        ));
        assert_eq!(channel.read_calls, 0);
    }

    #[test]
    fn discard_clears_partial_and_deferred_error() {
        let mut channel = ScriptedChannel::with_incoming(b"partial");
        let mut reader = LineReader::new();
        reader.read_line(&mut channel, 64).unwrap();
        assert_eq!(reader.pending_len(), 7);

        reader.discard();
        assert_eq!(reader.pending_len(), 0);
    }
}
