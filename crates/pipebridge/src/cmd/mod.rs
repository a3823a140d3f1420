use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod probe;
pub mod recv;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and write one line.
    Send(SendArgs),
    /// Poll a pipe and print received lines.
    Recv(RecvArgs),
    /// Attempt a connection and report the outcome.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Recv(args) => recv::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Pipe name (`\\.\pipe\name`, bare `name`, or a socket path on Unix).
    pub name: String,
    /// Text to send. A trailing newline is added if missing.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub data: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Connect timeout (e.g. 2s, 500ms).
    #[arg(long, env = "PIPEBRIDGE_TIMEOUT", default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct RecvArgs {
    /// Pipe name (`\\.\pipe\name`, bare `name`, or a socket path on Unix).
    pub name: String,
    /// Exit after printing N lines.
    #[arg(long)]
    pub count: Option<usize>,
    /// Poll cadence when no line is ready (e.g. 100ms, 1s).
    #[arg(long, env = "PIPEBRIDGE_INTERVAL", default_value = "100ms")]
    pub interval: String,
    /// Read buffer capacity in bytes, terminator included.
    #[arg(long, default_value_t = 4096)]
    pub capacity: usize,
    /// Connect timeout (e.g. 2s, 500ms).
    #[arg(long, env = "PIPEBRIDGE_TIMEOUT", default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Pipe name (`\\.\pipe\name`, bare `name`, or a socket path on Unix).
    pub name: String,
    /// Connect timeout (e.g. 2s, 500ms).
    #[arg(long, env = "PIPEBRIDGE_TIMEOUT", default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
