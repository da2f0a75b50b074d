//! Operator-facing summary of an exchange

use crate::labels::label_for;
use crate::protocol::ExchangeOutcome;
use colored::Colorize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// A labelled prediction, e.g. `PRONE (2)`
    Prediction { label: &'static str, index: u8 },
    /// Ready arrived but no digit line came with it
    NoPrediction,
    /// The deadline passed without a ready marker
    TimedOut,
    /// The digit has no label
    LabelError(u8),
}

impl Report {
    pub fn from_outcome(outcome: &ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::TimedOut { captured } => {
                if let Some(digit) = captured {
                    log::debug!("Discarding digit {} captured before the timeout", digit);
                }
                Report::TimedOut
            }
            ExchangeOutcome::Completed { prediction: None } => Report::NoPrediction,
            ExchangeOutcome::Completed {
                prediction: Some(index),
            } => match label_for(*index) {
                Ok(label) => Report::Prediction {
                    label,
                    index: *index,
                },
                Err(e) => {
                    log::debug!("{}", e);
                    Report::LabelError(*index)
                }
            },
        }
    }

    pub fn is_prediction(&self) -> bool {
        matches!(self, Report::Prediction { .. })
    }

    /// Print the result line the operator sees
    pub fn print(&self) {
        match self {
            Report::Prediction { .. } => {
                println!("{} Prediction: {}", ">>>".green().bold(), self.to_string().white().bold())
            }
            _ => println!("{} Error: {}", ">>>".red().bold(), self),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Prediction { label, index } => {
                write!(f, "{} ({})", label.to_uppercase(), index)
            }
            Report::NoPrediction => write!(f, "Did not receive a valid prediction."),
            Report::TimedOut => write!(f, "Operation timed out before READY."),
            Report::LabelError(index) => write!(f, "out-of-range label '{}'", index),
        }
    }
}
