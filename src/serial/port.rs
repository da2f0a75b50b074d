//! Serial port configuration and connection management
//!
//! Owns the single serial handle used for a whole session. The handle is
//! released when the `SerialConnection` is dropped, whichever way the
//! process leaves the command loop.

use crate::error::{HostError, Result};
use crate::serial::Channel;
use colored::Colorize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyACM0, COM9)
    pub port_path: String,
    /// Baud rate (default: 115200)
    pub baud_rate: u32,
    /// Data bits (default: 8)
    pub data_bits: DataBits,
    /// Parity (default: None)
    pub parity: Parity,
    /// Stop bits (default: 1)
    pub stop_bits: StopBits,
    /// Flow control (default: None)
    pub flow_control: FlowControl,
    /// Initial read timeout
    pub timeout: Duration,
    /// Timeout applied while writing
    pub write_timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from(crate::config::DEFAULT_PORT),
            baud_rate: crate::config::DEFAULT_BAUD,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: Duration::from_millis(200),
            write_timeout: Duration::from_secs(2),
        }
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }
}

/// Exclusive owner of the open serial port
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
    read_timeout: Duration,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.timeout)
            .open()
            .map_err(|source| HostError::Connection {
                port: config.port_path.clone(),
                source,
            })?;

        log::info!("Opened {} at {} baud", config.port_path, config.baud_rate);
        let read_timeout = config.timeout;
        Ok(Self {
            port,
            config,
            read_timeout,
        })
    }

    /// Get the port configuration
    pub fn config(&self) -> &PortConfig {
        &self.config
    }
}

impl Channel for SerialConnection {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        if timeout != self.read_timeout {
            self.port.set_timeout(timeout)?;
            self.read_timeout = timeout;
        }
        Ok(())
    }
}

impl Read for SerialConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_write_timeout(|port| port.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_write_timeout(|port| port.flush())
    }
}

impl SerialConnection {
    /// Run `op` under the write timeout, then put the read timeout back
    fn with_write_timeout<T, F>(&mut self, op: F) -> io::Result<T>
    where
        F: FnOnce(&mut Box<dyn SerialPort>) -> io::Result<T>,
    {
        self.port.set_timeout(self.config.write_timeout)?;
        let result = op(&mut self.port);
        let restored = self.port.set_timeout(self.read_timeout).map_err(io::Error::from);
        settle_write(result, restored)
    }
}

/// Combine a write result with the outcome of restoring the read timeout.
/// A failed write keeps its own error even if the restore failed too.
fn settle_write<T>(result: io::Result<T>, restored: io::Result<()>) -> io::Result<T> {
    match (result, restored) {
        (Err(e), Err(restore)) => {
            log::warn!("Could not restore read timeout after failed write: {}", restore);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(restore)) => Err(restore),
        (Ok(value), Ok(())) => Ok(value),
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        log::debug!("Releasing {}", self.config.port_path);
        println!("{} Serial port closed.", "[*]".cyan().bold());
    }
}

/// USB vendor IDs of boards and USB-serial bridges the classifier runs behind
const KNOWN_VENDORS: &[(u16, &str)] = &[
    (0x2341, "Arduino"),
    (0x2a03, "Arduino"),
    (0x1a86, "CH340"),
    (0x0403, "FTDI"),
    (0x10c4, "CP210x"),
];

/// A port the board could be attached to
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: String,
    /// One-line description, e.g. `USB 2341:805a Nano 33 BLE`
    pub description: String,
    /// Vendor name when the USB vendor ID is a known board or bridge
    pub vendor: Option<&'static str>,
}

/// Vendor name for a USB vendor ID the board is commonly seen behind
pub fn known_vendor(vid: u16) -> Option<&'static str> {
    KNOWN_VENDORS
        .iter()
        .find(|(known, _)| *known == vid)
        .map(|(_, name)| *name)
}

fn describe_usb(vid: u16, pid: u16, product: Option<&str>) -> String {
    match product {
        Some(product) => format!("USB {:04x}:{:04x} {}", vid, pid, product),
        None => format!("USB {:04x}:{:04x}", vid, pid),
    }
}

/// Order candidates so known boards come first, then by path
fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.vendor
            .is_none()
            .cmp(&b.vendor.is_none())
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Enumerate serial ports, known boards first
pub fn list_candidates() -> Result<Vec<Candidate>> {
    let ports = serialport::available_ports().map_err(io::Error::from)?;

    let mut candidates: Vec<Candidate> = ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(info) => Candidate {
                description: describe_usb(info.vid, info.pid, info.product.as_deref()),
                vendor: known_vendor(info.vid),
                path: p.port_name,
            },
            SerialPortType::PciPort => Candidate {
                path: p.port_name,
                description: "PCI serial".to_string(),
                vendor: None,
            },
            SerialPortType::BluetoothPort => Candidate {
                path: p.port_name,
                description: "Bluetooth".to_string(),
                vendor: None,
            },
            SerialPortType::Unknown => Candidate {
                path: p.port_name,
                description: "serial".to_string(),
                vendor: None,
            },
        })
        .collect();
    rank(&mut candidates);
    Ok(candidates)
}

/// Print the ports the board could be on
pub fn print_ports() -> Result<()> {
    let candidates = list_candidates()?;

    if candidates.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("  Connect the board over USB and check that your user may open it");
        println!("  (Linux: sudo usermod -aG dialout $USER)");
        return Ok(());
    }

    println!("{}", "Serial ports:".green().bold());
    for candidate in &candidates {
        match candidate.vendor {
            Some(vendor) => println!(
                "  {}  {} {}",
                candidate.path.white().bold(),
                candidate.description,
                format!("[{}]", vendor).green()
            ),
            None => println!("  {}  {}", candidate.path, candidate.description.dimmed()),
        }
    }

    if let Some(first) = candidates.iter().find(|c| c.vendor.is_some()) {
        println!(
            "\n{}",
            format!("Use: posture-host run -p {}", first.path).yellow()
        );
    }

    Ok(())
}
