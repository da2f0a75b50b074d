//! Device response protocol
//!
//! The board answers a command with free-form log lines. Somewhere in that
//! stream is a single-digit line carrying the predicted class, and the
//! exchange ends with a ready marker. This module classifies those lines and
//! runs the deadline-bounded read loops built on them.

pub mod classify;
pub mod poll;
pub mod reader;

pub use classify::{LineClassifier, LineKind};
pub use poll::poll_lines;
pub use reader::{ExchangeOutcome, ProtocolReader};
