//! Protocol reader
//!
//! Runs the two read loops of a session:
//! - the startup wait for the board's ready banner
//! - the per-command exchange, which also captures the prediction digit

use crate::config::HostConfig;
use crate::error::Result;
use crate::interrupt::StopFlag;
use crate::protocol::{poll_lines, LineClassifier, LineKind};
use crate::serial::{Channel, LineSource};
use chrono::Local;
use colored::Colorize;
use std::ops::ControlFlow;
use std::time::Duration;

/// Result of one command exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// A ready marker arrived before the deadline. `prediction` is the last
    /// digit line seen, if any.
    Completed { prediction: Option<u8> },
    /// The deadline passed without a ready marker. `captured` records a
    /// digit seen along the way; it is not trusted as a result.
    TimedOut { captured: Option<u8> },
}

impl ExchangeOutcome {
    pub fn ready_seen(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed { .. })
    }

    /// The prediction of a completed exchange
    pub fn prediction(&self) -> Option<u8> {
        match self {
            ExchangeOutcome::Completed { prediction } => *prediction,
            ExchangeOutcome::TimedOut { .. } => None,
        }
    }
}

/// Callback receiving every non-empty device line
pub type Echo = Box<dyn FnMut(&str)>;

pub struct ProtocolReader {
    exchange: LineClassifier,
    banner: LineClassifier,
    per_line: Duration,
    echo: Echo,
    stop: StopFlag,
}

impl ProtocolReader {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            exchange: LineClassifier::exchange(&config.ready_markers),
            banner: LineClassifier::banner(&config.banner_markers),
            per_line: config.per_line_timeout(),
            echo: Box::new(|line: &str| print_device_line(line, true)),
            stop: StopFlag::new(),
        }
    }

    /// Abandon reads once `stop` is raised
    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Replace the default console echo
    pub fn with_echo<F>(mut self, echo: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        self.echo = Box::new(echo);
        self
    }

    /// Read the response to a command until a ready marker or `deadline`.
    ///
    /// A later digit line overwrites an earlier one.
    pub fn read_until_ready<C: Channel>(
        &mut self,
        source: &mut LineSource<C>,
        deadline: Duration,
    ) -> Result<ExchangeOutcome> {
        let classifier = &self.exchange;
        let echo = &mut self.echo;
        let mut prediction = None;

        let finished = poll_lines(source, self.per_line, deadline, &self.stop, |line| {
            echo(line);
            match classifier.classify(line) {
                LineKind::Prediction(digit) => {
                    log::debug!("Captured prediction digit {}", digit);
                    prediction = Some(digit);
                    ControlFlow::Continue(())
                }
                LineKind::Ready => ControlFlow::Break(()),
                LineKind::Chatter => ControlFlow::Continue(()),
            }
        })?;

        Ok(match finished {
            Some(()) => ExchangeOutcome::Completed { prediction },
            None => {
                log::warn!("No ready marker within {:?}", deadline);
                ExchangeOutcome::TimedOut {
                    captured: prediction,
                }
            }
        })
    }

    /// Wait for the startup banner. Returns `false` if it never showed up,
    /// which callers treat as a warning.
    pub fn wait_for_banner<C: Channel>(
        &mut self,
        source: &mut LineSource<C>,
        deadline: Duration,
    ) -> Result<bool> {
        let classifier = &self.banner;
        let echo = &mut self.echo;

        let seen = poll_lines(source, self.per_line, deadline, &self.stop, |line| {
            echo(line);
            if classifier.classify(line) == LineKind::Ready {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        Ok(seen.is_some())
    }
}

/// Print a device line for the operator
pub fn print_device_line(line: &str, show_timestamps: bool) {
    let mut output = String::from("  ");
    if show_timestamps {
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        output.push_str(&format!("{} ", timestamp.to_string().dimmed()));
    }
    output.push_str(&format!("{} {}", "[Device]:".cyan(), line));
    println!("{}", output);
}
