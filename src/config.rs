//! Host configuration
//!
//! All timing knobs of the controller live here. Values come from the
//! built-in defaults, optionally overridden by a TOML file and then by
//! command-line flags.
//!
//! ```toml
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//! exchange_deadline_ms = 15000
//! ready_markers = ["READY", "Ready for next command"]
//! ```

use crate::error::{HostError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default serial port for an Arduino-class board on Linux
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate of the sensor firmware
pub const DEFAULT_BAUD: u32 = 115200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Serial port path (e.g., /dev/ttyACM0, COM9)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-read timeout while polling for lines
    pub per_line_timeout_ms: u64,
    /// Overall deadline for one command exchange. Must cover the board's
    /// capture window plus inference plus its log output.
    pub exchange_deadline_ms: u64,
    /// Write timeout for a command token
    pub write_timeout_ms: u64,
    /// Deadline for the ready banner after connecting
    pub startup_timeout_ms: u64,
    /// Pause after opening the port while the board resets
    pub settle_delay_ms: u64,
    /// Per-read timeout used when draining stale output
    pub drain_timeout_ms: u64,
    /// Substrings that identify the startup banner
    pub banner_markers: Vec<String>,
    /// Substrings that end a command exchange
    pub ready_markers: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD,
            per_line_timeout_ms: 200,
            exchange_deadline_ms: 12_000,
            write_timeout_ms: 2_000,
            startup_timeout_ms: 12_000,
            settle_delay_ms: 2_000,
            drain_timeout_ms: 50,
            banner_markers: vec!["Ready".to_string(), "READY".to_string()],
            ready_markers: vec![
                "READY".to_string(),
                "Ready for next command".to_string(),
            ],
        }
    }
}

impl HostConfig {
    /// Load a configuration file, filling missing keys with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            HostError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text and validate it
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| HostError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the serial port path
    pub fn with_port(mut self, port: &str) -> Self {
        self.port = port.to_string();
        self
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Check the timing relationships the read loop relies on
    pub fn validate(&self) -> Result<()> {
        if self.per_line_timeout_ms == 0 {
            return Err(HostError::Config(
                "per_line_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.drain_timeout_ms == 0 {
            return Err(HostError::Config(
                "drain_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(HostError::Config(
                "write_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.per_line_timeout_ms >= self.exchange_deadline_ms {
            return Err(HostError::Config(format!(
                "per_line_timeout_ms ({}) must be shorter than exchange_deadline_ms ({})",
                self.per_line_timeout_ms, self.exchange_deadline_ms
            )));
        }
        if self.per_line_timeout_ms >= self.startup_timeout_ms {
            return Err(HostError::Config(format!(
                "per_line_timeout_ms ({}) must be shorter than startup_timeout_ms ({})",
                self.per_line_timeout_ms, self.startup_timeout_ms
            )));
        }
        if self.ready_markers.iter().all(|m| m.is_empty()) {
            return Err(HostError::Config("ready_markers must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn per_line_timeout(&self) -> Duration {
        Duration::from_millis(self.per_line_timeout_ms)
    }

    pub fn exchange_deadline(&self) -> Duration {
        Duration::from_millis(self.exchange_deadline_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
