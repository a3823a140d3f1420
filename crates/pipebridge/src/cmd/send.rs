use std::fs;

use pipebridge_line::LineChannel;
use tracing::info;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{io_error, line_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = frame_payload(resolve_payload(&args)?);

    let mut channel =
        LineChannel::connect(&args.name, timeout).map_err(|err| line_error("connect failed", err))?;
    let written = channel
        .write_bytes(&payload)
        .map_err(|err| line_error("send failed", err))?;
    channel.close();

    info!(pipe = %args.name, written, "line sent");
    print_sent(&args.name, written, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "either --data or --file is required"))
}

/// Append the line delimiter unless the payload already ends with one.
fn frame_payload(mut payload: Vec<u8>) -> Vec<u8> {
    if payload.last() != Some(&b'\n') {
        payload.push(b'\n');
    }
    payload
}
