use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pipebridge_line::ReadOutcome;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LineOutput<'a> {
    pipe: &'a str,
    seq: usize,
    kind: &'static str,
    size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_line(pipe: &str, seq: usize, outcome: &ReadOutcome, format: OutputFormat) {
    let kind = outcome_kind(outcome);
    let bytes = outcome.bytes();

    match format {
        OutputFormat::Json => {
            let out = LineOutput {
                pipe,
                seq,
                kind,
                size: bytes.len(),
                payload: payload_text(bytes),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "KIND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    kind.to_string(),
                    bytes.len().to_string(),
                    payload_text(bytes),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{seq} {kind} size={} payload={}",
                bytes.len(),
                payload_text(bytes)
            );
        }
        OutputFormat::Raw => print_raw(bytes),
    }
}

#[derive(Serialize)]
struct SendOutput<'a> {
    pipe: &'a str,
    bytes_written: usize,
}

pub fn print_sent(pipe: &str, bytes_written: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SendOutput {
            pipe,
            bytes_written,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("sent {bytes_written} bytes to {pipe}");
        }
        OutputFormat::Raw => println!("{bytes_written}"),
    }
}

#[derive(Serialize)]
pub struct ProbeReport {
    pub pipe: String,
    pub transport: &'static str,
    pub connected: bool,
    pub elapsed_ms: u128,
    pub kind: &'static str,
    pub os_code: u32,
    pub message: Option<String>,
}

impl ProbeReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.elapsed_ms).unwrap_or(u64::MAX))
    }
}

pub fn print_probe(report: &ProbeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PIPE", "CONNECTED", "ELAPSED", "KIND", "CODE"])
                .add_row(vec![
                    report.pipe.clone(),
                    report.connected.to_string(),
                    format!("{:?}", report.elapsed()),
                    report.kind.to_string(),
                    report.os_code.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Probe:");
            println!("  Pipe:       {}", report.pipe);
            println!("  Transport:  {}", report.transport);
            println!("  Connected:  {}", report.connected);
            println!("  Elapsed:    {}ms", report.elapsed_ms);
            println!("  Kind:       {}", report.kind);
            println!("  OS code:    {}", report.os_code);
            if let Some(message) = &report.message {
                println!("  Message:    {message}");
            }
        }
        OutputFormat::Raw => println!("{}", report.kind),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn outcome_kind(outcome: &ReadOutcome) -> &'static str {
    match outcome {
        ReadOutcome::Empty => "empty",
        ReadOutcome::Line(_) => "line",
        ReadOutcome::Truncated(_) => "truncated",
        ReadOutcome::Partial(_) => "partial",
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn payload_text(payload: &[u8]) -> String {
    let trimmed = payload.strip_suffix(b"\n").unwrap_or(payload);
    match std::str::from_utf8(trimmed) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
