use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pipebridge_line::{LineChannel, ReadOutcome};
use pipebridge_transport::ErrorKind;
use tracing::{debug, info};

use crate::cmd::{parse_duration, RecvArgs};
use crate::exit::{line_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_line, OutputFormat};

pub fn run(args: RecvArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let interval = parse_duration(&args.interval)?;
    if args.capacity < 2 {
        return Err(CliError::new(USAGE, "--capacity must be at least 2"));
    }
    let max_len = args.capacity - 1;

    let mut channel =
        LineChannel::connect(&args.name, timeout).map_err(|err| line_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let outcome = match channel.read_line(max_len) {
            Ok(outcome) => outcome,
            Err(err) if is_remote_closed(err.kind()) => {
                info!(pipe = %args.name, printed, "remote closed the pipe");
                break;
            }
            Err(err) => return Err(line_error("receive failed", err)),
        };

        if let ReadOutcome::Empty = outcome {
            std::thread::sleep(interval);
            continue;
        }

        printed = printed.saturating_add(1);
        print_line(&args.name, printed, &outcome, format);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    debug!(printed, pending = channel.pending_len(), "recv finished");
    channel.close();
    Ok(SUCCESS)
}

fn is_remote_closed(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::BrokenPipe | ErrorKind::NoRemoteProcess)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
