//! Interactive command loop

use crate::dispatch::{Controller, Sensor};
use crate::interrupt::StopFlag;
use crate::report::Report;
use crate::serial::Channel;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How often a waiting prompt looks at the stop flag
const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Sensor(Sensor),
    Quit,
}

/// Parse one line of operator input. Case and surrounding whitespace are
/// ignored; anything unrecognised yields `None`.
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    let choice = input.trim().to_lowercase();
    if choice == "q" {
        return Some(MenuChoice::Quit);
    }
    Sensor::from_code(&choice).map(MenuChoice::Sensor)
}

fn print_menu() {
    println!("\n{}", "--- Real-Time Posture Prediction ---".cyan().bold());
    let entries: Vec<String> = Sensor::ALL.iter().map(|s| s.to_string()).collect();
    println!("{}    [q] Quit", entries.join("    "));
}

/// Prompt, dispatch and report until the operator quits, input ends or a
/// stop is requested.
///
/// Exchange failures are reported and the loop continues.
pub fn run<C: Channel>(controller: &mut Controller<C>, input: &Receiver<String>) -> Result<()> {
    loop {
        print_menu();
        print!("Enter choice: ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = next_input(input, controller.stop_flag()) else {
            println!();
            return Ok(());
        };

        let sensor = match parse_choice(&line) {
            Some(MenuChoice::Quit) => return Ok(()),
            Some(MenuChoice::Sensor(sensor)) => sensor,
            None => {
                println!("{}", "Invalid choice.".yellow());
                continue;
            }
        };

        run_exchange(controller, sensor);
        if controller.stop_flag().is_raised() {
            return Ok(());
        }
    }
}

/// Wait for the next line of operator input. `None` once input has ended
/// or `stop` is raised.
fn next_input(input: &Receiver<String>, stop: &StopFlag) -> Option<String> {
    while !stop.is_raised() {
        match input.recv_timeout(INPUT_POLL) {
            Ok(line) => return Some(line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
    None
}

/// Forward stdin lines from a background thread. The blocking read stays
/// off the main thread so a waiting prompt still sees Ctrl+C.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Stopped reading stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Run one exchange and print its result. Returns the report, or `None`
/// when the exchange failed before a response could be read.
pub fn run_exchange<C: Channel>(controller: &mut Controller<C>, sensor: Sensor) -> Option<Report> {
    println!(
        "{} Sending: {} ({})",
        "[TX]".cyan().bold(),
        sensor.code(),
        sensor.name()
    );

    match controller.exchange(sensor) {
        Ok(outcome) => {
            let report = Report::from_outcome(&outcome);
            report.print();
            Some(report)
        }
        Err(e) => {
            println!("{} {}", "[ERROR]".red().bold(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::protocol::ProtocolReader;
    use crate::serial::mock::ScriptedChannel;
    use std::time::Instant;

    /// Operator input that ends after `lines`
    fn input(lines: &[&str]) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        rx
    }

    fn controller(channel: ScriptedChannel) -> Controller<ScriptedChannel> {
        let config = HostConfig {
            per_line_timeout_ms: 10,
            exchange_deadline_ms: 200,
            settle_delay_ms: 0,
            drain_timeout_ms: 5,
            ..HostConfig::default()
        };
        let reader = ProtocolReader::new(&config).with_echo(|_| {});
        Controller::new(channel, config, reader)
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1"), Some(MenuChoice::Sensor(Sensor::Accelerometer)));
        assert_eq!(parse_choice(" 3 \n"), Some(MenuChoice::Sensor(Sensor::Magnetometer)));
        assert_eq!(parse_choice("q"), Some(MenuChoice::Quit));
        assert_eq!(parse_choice("Q\n"), Some(MenuChoice::Quit));
        assert_eq!(parse_choice("4"), None);
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("12"), None);
    }

    #[test]
    fn test_invalid_input_sends_nothing() {
        let channel = ScriptedChannel::new();
        let written = channel.written();
        let mut controller = controller(channel);

        run(&mut controller, &input(&["x", "9", "q"])).unwrap();
        assert!(written.borrow().is_empty());
    }

    #[test]
    fn test_loop_runs_exchanges_until_quit() {
        let channel = ScriptedChannel::new()
            .await_write()
            .line("Collecting...")
            .line("2")
            .line("READY");
        let written = channel.written();
        let mut controller = controller(channel);

        run(&mut controller, &input(&["2", "bogus", "1", "q", "4"])).unwrap();
        assert_eq!(written.borrow().as_slice(), b"2\n1\n");
    }

    #[test]
    fn test_end_of_input_quits() {
        let mut controller = controller(ScriptedChannel::new());
        run(&mut controller, &input(&[])).unwrap();
    }

    #[test]
    fn test_stop_while_waiting_for_input() {
        let channel = ScriptedChannel::new();
        let written = channel.written();
        let mut controller = controller(channel);
        let stop = controller.stop_flag().clone();
        let (tx, rx) = mpsc::channel::<String>();

        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.raise();
        });
        let start = Instant::now();
        run(&mut controller, &rx).unwrap();
        raiser.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(written.borrow().is_empty());
        drop(tx);
    }

    #[test]
    fn test_stop_during_exchange_ends_loop() {
        let config = HostConfig {
            per_line_timeout_ms: 10,
            exchange_deadline_ms: 5_000,
            settle_delay_ms: 0,
            drain_timeout_ms: 5,
            ..HostConfig::default()
        };
        let stop = StopFlag::new();
        let raise = stop.clone();
        let reader = ProtocolReader::new(&config)
            .with_echo(move |_| raise.raise())
            .with_stop(stop);
        let channel = ScriptedChannel::new().await_write().repeating("Collecting...");
        let calls = channel.write_calls();
        let mut controller = Controller::new(channel, config, reader);

        let start = Instant::now();
        run(&mut controller, &input(&["1", "2", "q"])).unwrap();

        assert_eq!(*calls.borrow(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_run_exchange_reports_prediction() {
        let channel = ScriptedChannel::new()
            .await_write()
            .line("Collecting...")
            .line("")
            .line("2")
            .line("READY");
        let mut controller = controller(channel);

        let report = run_exchange(&mut controller, Sensor::Gyroscope).unwrap();
        assert_eq!(report.to_string(), "PRONE (2)");
    }

    #[test]
    fn test_run_exchange_reports_timeout() {
        let channel = ScriptedChannel::new().await_write().repeating("Collecting...");
        let mut controller = controller(channel);

        let report = run_exchange(&mut controller, Sensor::Accelerometer).unwrap();
        assert_eq!(report, Report::TimedOut);
    }

    #[test]
    fn test_run_exchange_write_timeout() {
        let channel = ScriptedChannel::new().failing_writes(io::ErrorKind::TimedOut);
        let mut controller = controller(channel);

        assert_eq!(run_exchange(&mut controller, Sensor::Accelerometer), None);
    }
}
