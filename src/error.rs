//! Error types for the posture host controller
//!
//! Only a failure to open the serial port is fatal. `Interrupted` ends the
//! session through the normal return path. Every other variant is reported
//! to the operator and the command loop carries on.

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    /// The serial port could not be opened
    #[error("Failed to open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// The command token was not fully written within the write timeout
    #[error("Write timeout after {0:?}")]
    WriteTimeout(Duration),

    /// Prediction digit has no entry in the label table
    #[error("Out-of-range label '{0}'")]
    LabelOutOfRange(u8),

    /// Invalid configuration value or unreadable config file
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operator pressed Ctrl+C
    #[error("Interrupted by operator")]
    Interrupted,

    /// Any other channel failure
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_error_message() {
        let err = HostError::LabelOutOfRange(6);
        assert_eq!(err.to_string(), "Out-of-range label '6'");
    }

    #[test]
    fn test_io_conversion() {
        let err: HostError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, HostError::Io(_)));
    }
}
