use std::time::Instant;

use pipebridge_line::{LineChannel, LineError};
use pipebridge_transport::{ErrorKind, NativeEndpoint, PipeEndpoint};
use tracing::debug;

use crate::cmd::{parse_duration, ProbeArgs};
use crate::exit::{kind_code, CliResult};
use crate::output::{print_probe, OutputFormat, ProbeReport};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let start = Instant::now();
    let result = LineChannel::connect(&args.name, timeout)
        .map(|mut channel| {
            debug!(pipe = %args.name, handle = ?channel.raw_handle(), "probe connected");
            channel.close();
        });
    let elapsed_ms = start.elapsed().as_millis();

    let (kind, report) = build_report(args.name, elapsed_ms, result.err());
    print_probe(&report, format);
    Ok(kind_code(kind))
}

fn build_report(pipe: String, elapsed_ms: u128, err: Option<LineError>) -> (ErrorKind, ProbeReport) {
    let kind = err.as_ref().map_or(ErrorKind::Ok, LineError::kind);
    let report = ProbeReport {
        pipe,
        transport: NativeEndpoint.transport_name(),
        connected: err.is_none(),
        elapsed_ms,
        kind: kind.as_str(),
        os_code: err.as_ref().map_or(0, LineError::os_code),
        message: err.map(|err| err.to_string()),
    };
    (kind, report)
}
