//! Serial channel access
//!
//! This module provides:
//! - The `Channel` abstraction over a timed, full-duplex byte stream
//! - `SerialConnection`, the owned serial port behind it
//! - `LineSource`, which turns the byte stream into trimmed text lines
//! - Serial port enumeration

pub mod lines;
pub mod port;

#[cfg(test)]
pub mod mock;

pub use lines::LineSource;
pub use port::{PortConfig, SerialConnection};

use std::io::{self, Read, Write};
use std::time::Duration;

/// A byte channel whose reads give up after a configurable timeout.
///
/// A read that times out must fail with `io::ErrorKind::TimedOut` (or
/// `WouldBlock`); a write that cannot complete within the channel's write
/// timeout must fail with `io::ErrorKind::TimedOut`.
pub trait Channel: Read + Write {
    /// Set the timeout used by subsequent reads
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}
