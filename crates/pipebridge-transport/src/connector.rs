use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::codes;
use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::traits::{PipeChannel, PipeEndpoint, Readiness};
use crate::{NativeChannel, NativeEndpoint};

/// Default time to wait for the listener.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Sleep between readiness checks while the pipe does not exist yet.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Upper bound on the whole connect call. Zero means a single check.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ConnectConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Connect to `name`, waiting at most `timeout` for the listener.
pub fn connect(name: &str, timeout: Duration) -> Result<NativeChannel> {
    connect_with_config(name, &ConnectConfig::with_timeout(timeout))
}

/// Connect with explicit configuration using the platform's native transport.
pub fn connect_with_config(name: &str, config: &ConnectConfig) -> Result<NativeChannel> {
    let name = PipeName::parse(name)?;
    connect_via(&NativeEndpoint, &name, config)
}

/// Connect through any [`PipeEndpoint`].
///
/// Waits for a free instance until the deadline, opens it, and switches it to
/// byte mode. A channel whose mode cannot be configured is closed before
/// `ConfigFailure` is returned.
pub fn connect_via<E: PipeEndpoint>(
    endpoint: &E,
    name: &PipeName,
    config: &ConnectConfig,
) -> Result<E::Channel> {
    let deadline = Instant::now() + config.timeout;
    let mut seen = false;
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);
        let remaining = deadline.saturating_duration_since(Instant::now());

        match endpoint.wait_ready(name, remaining)? {
            Readiness::Ready => {
                seen = true;
                match endpoint.open(name) {
                    Ok(channel) => return configure(channel, name, attempts),
                    Err(err) if err.is_not_ready() => {
                        debug!(%name, %err, "pipe instance not available yet");
                    }
                    Err(err) => return Err(err),
                }
            }
            Readiness::Busy => seen = true,
            Readiness::Missing => {}
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(%name, attempts, seen, "connect deadline reached");
            return Err(if seen {
                TransportError::Timeout {
                    name: name.to_string(),
                    timeout: config.timeout,
                    code: codes::TIMEOUT,
                }
            } else {
                TransportError::NotFound {
                    name: name.to_string(),
                    code: codes::NOT_FOUND,
                }
            });
        }

        std::thread::sleep(config.poll_interval.min(remaining));
    }
}

fn configure<C: PipeChannel>(mut channel: C, name: &PipeName, attempts: u32) -> Result<C> {
    if let Err(err) = channel.set_byte_mode() {
        let code = err.os_code();
        warn!(%name, code, "byte mode configuration failed; closing channel");
        drop(channel);
        return Err(TransportError::ConfigFailure {
            name: name.to_string(),
            code,
        });
    }

    debug!(%name, attempts, handle = channel.raw_handle(), "connected to pipe");
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug)]
    struct FakeChannel {
        fail_mode: bool,
        dropped: Arc<AtomicUsize>,
    }

    impl PipeChannel for FakeChannel {
        fn bytes_available(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn read_available(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Ok(0)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            Ok(buf.len())
        }

        fn set_byte_mode(&mut self) -> Result<()> {
            if self.fail_mode {
                Err(TransportError::Io(std::io::Error::from_raw_os_error(
                    codes::INVALID_ARGUMENT as i32,
                )))
            } else {
                Ok(())
            }
        }

        fn cancel_io(&mut self) -> Result<()> {
            Ok(())
        }

        fn raw_handle(&self) -> isize {
            42
        }
    }

    impl Drop for FakeChannel {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedEndpoint {
        readiness: RefCell<VecDeque<Readiness>>,
        busy_opens: Cell<usize>,
        opens: Cell<usize>,
        fail_mode: bool,
        dropped: Arc<AtomicUsize>,
    }

    impl ScriptedEndpoint {
        fn new(script: &[Readiness]) -> Self {
            Self {
                readiness: RefCell::new(script.iter().copied().collect()),
                busy_opens: Cell::new(0),
                opens: Cell::new(0),
                fail_mode: false,
                dropped: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PipeEndpoint for ScriptedEndpoint {
        type Channel = FakeChannel;

        fn wait_ready(&self, _name: &PipeName, _timeout: Duration) -> Result<Readiness> {
            Ok(self
                .readiness
                .borrow_mut()
                .pop_front()
                .unwrap_or(Readiness::Missing))
        }

        fn open(&self, name: &PipeName) -> Result<FakeChannel> {
            self.opens.set(self.opens.get() + 1);
            if self.busy_opens.get() > 0 {
                self.busy_opens.set(self.busy_opens.get() - 1);
                return Err(TransportError::Busy {
                    name: name.to_string(),
                    code: codes::PIPE_BUSY,
                });
            }
            Ok(FakeChannel {
                fail_mode: self.fail_mode,
                dropped: self.dropped.clone(),
            })
        }

        fn transport_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn fast_config(timeout_ms: u64) -> ConnectConfig {
        ConnectConfig {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn name() -> PipeName {
        PipeName::parse(r"\\.\pipe\scripted").unwrap()
    }

    #[test]
    fn missing_pipe_reports_not_found_after_deadline() {
        let endpoint = ScriptedEndpoint::new(&[]);
        let start = Instant::now();
        let err = connect_via(&endpoint, &name(), &fast_config(60)).unwrap_err();

        assert!(matches!(err, TransportError::NotFound { .. }));
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(endpoint.opens.get(), 0, "must not open a missing pipe");
    }

    #[test]
    fn busy_pipe_reports_timeout() {
        let endpoint = ScriptedEndpoint::new(&[Readiness::Busy; 64]);
        let err = connect_via(&endpoint, &name(), &fast_config(30)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
        assert_eq!(endpoint.opens.get(), 0);
    }

    #[test]
    fn late_listener_is_picked_up() {
        let endpoint = ScriptedEndpoint::new(&[
            Readiness::Missing,
            Readiness::Missing,
            Readiness::Ready,
        ]);
        let channel = connect_via(&endpoint, &name(), &fast_config(1000)).unwrap();
        assert_eq!(channel.raw_handle(), 42);
    }

    #[test]
    fn connect_results_format_with_debug() {
        let endpoint = ScriptedEndpoint::new(&[Readiness::Ready]);
        let connected = connect_via(&endpoint, &name(), &fast_config(100));
        assert!(format!("{connected:?}").starts_with("Ok(FakeChannel"));

        let missing = connect_via(&endpoint, &name(), &fast_config(0));
        assert!(format!("{missing:?}").starts_with("Err(NotFound"));
    }

    #[test]
    fn lost_instance_race_keeps_waiting() {
        let endpoint = ScriptedEndpoint::new(&[Readiness::Ready, Readiness::Ready]);
        endpoint.busy_opens.set(1);
        connect_via(&endpoint, &name(), &fast_config(1000)).unwrap();
        assert_eq!(endpoint.opens.get(), 2);
    }

    #[test]
    fn mode_failure_closes_channel_before_returning() {
        let mut endpoint = ScriptedEndpoint::new(&[Readiness::Ready]);
        endpoint.fail_mode = true;
        let err = connect_via(&endpoint, &name(), &fast_config(100)).unwrap_err();

        assert!(matches!(err, TransportError::ConfigFailure { .. }));
        assert_eq!(err.os_code(), codes::INVALID_ARGUMENT);
        assert_eq!(endpoint.dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_timeout_checks_once() {
        let endpoint = ScriptedEndpoint::new(&[Readiness::Missing, Readiness::Ready]);
        let err = connect_via(&endpoint, &name(), &fast_config(0)).unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));
        assert_eq!(endpoint.readiness.borrow().len(), 1);
    }

    #[test]
    fn invalid_name_is_rejected_before_waiting() {
        let err = connect_with_config("", &fast_config(1000)).unwrap_err();
        assert!(matches!(err, TransportError::InvalidArgument(_)));
    }
}
