//! Posture Host
//!
//! Host-side controller for a microcontroller posture classifier. The board
//! samples one of its motion sensors on request, runs inference, and prints
//! the predicted class as a single digit followed by a ready marker.
//!
//! # Usage
//!
//! ```bash
//! # List available serial ports
//! posture-host list
//!
//! # Interactive session
//! posture-host run -p /dev/ttyACM0
//!
//! # One prediction from the gyroscope, with settings from a file
//! posture-host --config posture.toml predict --sensor 2
//! ```

mod config;
mod dispatch;
mod error;
mod interrupt;
mod labels;
mod menu;
mod protocol;
mod report;
mod serial;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use config::HostConfig;
use dispatch::{Controller, Sensor};
use error::HostError;
use interrupt::StopFlag;
use protocol::reader::print_device_line;
use protocol::ProtocolReader;
use serial::{PortConfig, SerialConnection};

/// Posture Host
///
/// Drives a posture-classifier board over its serial console
#[derive(Parser)]
#[command(name = "posture-host")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Host-side serial controller for a microcontroller posture classifier")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    List,

    /// Connect and run the interactive prediction menu
    Run(ConnectArgs),

    /// Connect, request one prediction and exit
    Predict {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Sensor to sample: 1 accelerometer, 2 gyroscope, 3 magnetometer
        #[arg(short, long, value_parser = parse_sensor)]
        sensor: Sensor,
    },
}

#[derive(Args)]
struct ConnectArgs {
    /// Serial port path (e.g., /dev/ttyACM0, COM9)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Skip the startup wait for the board's ready banner
    #[arg(long)]
    no_wait: bool,

    /// Disable timestamps on device output
    #[arg(long)]
    no_timestamps: bool,
}

fn parse_sensor(value: &str) -> std::result::Result<Sensor, String> {
    Sensor::from_code(value.trim()).ok_or_else(|| format!("unknown sensor '{}', expected 1, 2 or 3", value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = match cli.config {
        Some(ref path) => HostConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => HostConfig::default(),
    };

    match cli.command {
        Commands::List => serial::port::print_ports()?,
        Commands::Run(connect) => {
            let stop = StopFlag::new();
            interrupt::install_handler(&stop)?;
            let mut controller = connect_to_board(config, &connect, stop)?;
            let input = menu::spawn_stdin_reader();
            menu::run(&mut controller, &input)?;
        }
        Commands::Predict { connect, sensor } => {
            let stop = StopFlag::new();
            interrupt::install_handler(&stop)?;
            let success = {
                let mut controller = connect_to_board(config, &connect, stop)?;
                menu::run_exchange(&mut controller, sensor).map_or(false, |r| r.is_prediction())
            };
            // The port is closed by now; exit skips destructors
            if !success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Open the port and wait for the board. Exits the process if the port
/// cannot be opened.
fn connect_to_board(
    config: HostConfig,
    args: &ConnectArgs,
    stop: StopFlag,
) -> Result<Controller<SerialConnection>> {
    let mut config = config;
    if let Some(ref port) = args.port {
        config = config.with_port(port);
    }
    if let Some(baud) = args.baud {
        config = config.with_baud_rate(baud);
    }
    config.validate()?;

    println!(
        "{} Connecting to {} @ {}...",
        "[*]".cyan().bold(),
        config.port.white().bold(),
        config.baud_rate
    );

    let port_config = PortConfig::new(&config.port)
        .with_baud_rate(config.baud_rate)
        .with_timeout(config.per_line_timeout())
        .with_write_timeout(config.write_timeout());

    let connection = match SerialConnection::open(port_config) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
    };
    println!(
        "{} Connected to {}",
        "[OK]".green().bold(),
        connection.config().port_path.white()
    );

    let show_timestamps = !args.no_timestamps;
    let reader = ProtocolReader::new(&config)
        .with_echo(move |line| print_device_line(line, show_timestamps))
        .with_stop(stop);
    let mut controller = Controller::new(connection, config, reader);

    if !args.no_wait {
        println!("{} Waiting for Ready...", "[*]".cyan().bold());
        match controller.startup() {
            Ok(true) => println!("{} Board is ready", "[OK]".green().bold()),
            Ok(false) => println!(
                "{} No initial Ready seen; proceeding anyway.",
                "[WARNING]".yellow().bold()
            ),
            // The caller sees the raised flag and winds down
            Err(HostError::Interrupted) => log::debug!("Startup wait interrupted"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(controller)
}
