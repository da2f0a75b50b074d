//! Deadline-bounded line polling
//!
//! The one loop both the startup wait and the command exchange run on.
//! Each iteration reads for at most `per_line`, so the loop overshoots its
//! deadline by no more than one read. A raised stop flag is noticed within
//! the same bound.

use crate::error::{HostError, Result};
use crate::interrupt::StopFlag;
use crate::serial::{Channel, LineSource};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

/// Feed non-empty lines to `on_line` until it breaks or `deadline` passes.
///
/// Returns `Some(value)` with the value `on_line` broke with, or `None`
/// when the deadline expired first. Empty reads and blank lines are
/// skipped without calling `on_line`. Fails with `HostError::Interrupted`
/// once `stop` is raised.
pub fn poll_lines<C, T, F>(
    source: &mut LineSource<C>,
    per_line: Duration,
    deadline: Duration,
    stop: &StopFlag,
    mut on_line: F,
) -> Result<Option<T>>
where
    C: Channel,
    F: FnMut(&str) -> ControlFlow<T>,
{
    let end = Instant::now() + deadline;

    while Instant::now() < end {
        if stop.is_raised() {
            return Err(HostError::Interrupted);
        }
        let line = match source.next_line(per_line)? {
            Some(line) if !line.is_empty() => line,
            _ => continue,
        };

        if let ControlFlow::Break(value) = on_line(&line) {
            return Ok(Some(value));
        }
    }

    Ok(None)
}
