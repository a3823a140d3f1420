//! Newline-delimited text on top of a pipe channel.
//!
//! Outbound text is converted from UTF-16 to UTF-8 and written in full.
//! Inbound bytes are accumulated per connection and handed out one line at a
//! time, without ever blocking on the channel:
//! - complete lines include their `\n`
//! - lines longer than the caller's buffer come back in pieces, losslessly
//! - a partial line is kept until the rest arrives

pub mod channel;
pub mod encoding;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod mock;

pub use channel::LineChannel;
pub use encoding::{utf8_to_wide, wide_to_utf8};
pub use error::{LineError, Result};
pub use reader::{LineConfig, LineReader, ReadOutcome, DEFAULT_READ_CHUNK_SIZE, NEWLINE};
pub use writer::{write_all, write_wide};
