//! Line-oriented view of a serial channel
//!
//! Each call reads at most one newline-terminated record and never waits
//! longer than the timeout it was given, so callers can re-check their own
//! deadline between reads. Nothing is buffered between calls: bytes are
//! pulled from the channel one at a time and a record ends at `\n`.

use crate::serial::Channel;
use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

pub struct LineSource<C: Channel> {
    channel: C,
}

impl<C: Channel> LineSource<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Access the underlying channel (used for writing commands)
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Read one line within `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Bytes received
    /// before the timeout without a trailing newline are returned as a
    /// line. The result is decoded lossily and trimmed, so a bare `\r\n`
    /// yields `Some("")`. A closed channel is an `UnexpectedEof` error once
    /// any pending bytes have been returned.
    pub fn next_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.channel.set_timeout(remaining)?;

            match self.channel.read(&mut byte) {
                Ok(0) if buffer.is_empty() => {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "serial channel closed",
                    ))
                }
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        return Ok(Some(decode(&buffer)));
                    }
                    buffer.push(byte[0]);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if is_timeout(e) => break,
                Err(e) => return Err(e),
            }
        }

        if buffer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(decode(&buffer)))
        }
    }

    /// Discard everything the device has already sent.
    ///
    /// Reads with `timeout` until a read comes back empty and returns the
    /// number of lines thrown away.
    pub fn drain(&mut self, timeout: Duration) -> io::Result<usize> {
        let mut discarded = 0;
        while let Some(line) = self.next_line(timeout)? {
            log::trace!("Drained stale line: {:?}", line);
            discarded += 1;
        }
        if discarded > 0 {
            log::debug!("Drained {} stale line(s)", discarded);
        }
        Ok(discarded)
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
