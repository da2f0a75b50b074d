//! Command dispatch
//!
//! The controller owns the channel for the whole session and runs one
//! exchange at a time: drain stale output, write the command token, then
//! read the response until the board reports ready.

use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::interrupt::StopFlag;
use crate::protocol::{ExchangeOutcome, ProtocolReader};
use crate::serial::{Channel, LineSource};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// Sensor the board should sample for one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensor {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

/// Registry of command codes accepted by the firmware
pub static SENSORS: Lazy<HashMap<&'static str, Sensor>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for sensor in Sensor::ALL {
        m.insert(sensor.code(), sensor);
    }
    m
});

impl Sensor {
    pub const ALL: [Sensor; 3] = [Sensor::Accelerometer, Sensor::Gyroscope, Sensor::Magnetometer];

    /// Single-character code the operator types and the board receives
    pub fn code(&self) -> &'static str {
        match self {
            Sensor::Accelerometer => "1",
            Sensor::Gyroscope => "2",
            Sensor::Magnetometer => "3",
        }
    }

    /// Bytes written to the board
    pub fn token(&self) -> &'static [u8] {
        match self {
            Sensor::Accelerometer => b"1\n",
            Sensor::Gyroscope => b"2\n",
            Sensor::Magnetometer => b"3\n",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Sensor::Accelerometer => "Accelerometer",
            Sensor::Gyroscope => "Gyroscope",
            Sensor::Magnetometer => "Magnetometer",
        }
    }

    /// Look up a sensor by its command code
    pub fn from_code(code: &str) -> Option<Sensor> {
        SENSORS.get(code).copied()
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.name())
    }
}

pub struct Controller<C: Channel> {
    source: LineSource<C>,
    reader: ProtocolReader,
    config: HostConfig,
}

impl<C: Channel> Controller<C> {
    pub fn new(channel: C, config: HostConfig, reader: ProtocolReader) -> Self {
        Self {
            source: LineSource::new(channel),
            reader,
            config,
        }
    }

    /// Stop flag shared with the read loops
    pub fn stop_flag(&self) -> &StopFlag {
        self.reader.stop_flag()
    }

    /// Let the board finish resetting, then wait for its ready banner.
    ///
    /// Returns `false` when no banner arrived in time; the session can still
    /// go ahead.
    pub fn startup(&mut self) -> Result<bool> {
        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            log::debug!("Waiting {:?} for board reset", settle);
            thread::sleep(settle);
        }

        let ready = self
            .reader
            .wait_for_banner(&mut self.source, self.config.startup_timeout())?;
        if !ready {
            log::warn!(
                "No ready banner within {:?}",
                self.config.startup_timeout()
            );
        }
        Ok(ready)
    }

    /// Run one command exchange.
    ///
    /// A write failure abandons the exchange before anything is read.
    /// Nothing is sent once a stop has been requested.
    pub fn exchange(&mut self, sensor: Sensor) -> Result<ExchangeOutcome> {
        if self.stop_flag().is_raised() {
            return Err(HostError::Interrupted);
        }
        self.source.drain(self.config.drain_timeout())?;
        self.send(sensor)?;
        log::debug!("Sent {} token", sensor.name());
        let outcome = self
            .reader
            .read_until_ready(&mut self.source, self.config.exchange_deadline())?;
        log::debug!("Exchange finished, ready seen: {}", outcome.ready_seen());
        Ok(outcome)
    }

    fn send(&mut self, sensor: Sensor) -> Result<()> {
        let timeout = self.config.write_timeout();
        let channel = self.source.channel_mut();
        channel
            .write_all(sensor.token())
            .map_err(|e| write_error(e, timeout))?;
        channel.flush().map_err(|e| write_error(e, timeout))
    }
}

fn write_error(e: io::Error, timeout: Duration) -> HostError {
    if e.kind() == io::ErrorKind::TimedOut {
        HostError::WriteTimeout(timeout)
    } else {
        HostError::Io(e)
    }
}
