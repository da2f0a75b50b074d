//! Ctrl+C handling
//!
//! The handler only raises a flag. Read loops and the menu look at it
//! between bounded waits and unwind normally, so the serial port is still
//! closed by its destructor.

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared request to stop the session
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    raised: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Raise `stop` when the operator presses Ctrl+C
pub fn install_handler(stop: &StopFlag) -> Result<()> {
    let stop = stop.clone();
    ctrlc::set_handler(move || {
        println!("\n{}", "Stopping...".yellow());
        stop.raise();
    })
    .with_context(|| "Failed to set Ctrl+C handler")
}
