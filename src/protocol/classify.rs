//! Line classification
//!
//! Every non-empty line is classified exactly once. The read loops only
//! look at the resulting `LineKind`, so new markers can be added through
//! configuration without touching the loops.

/// What a single device line means to the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The device finished and accepts a new command
    Ready,
    /// A line consisting of exactly one decimal digit
    Prediction(u8),
    /// Anything else (progress, sensor dumps, debug prints)
    Chatter,
}

/// Classifier for one kind of read loop
#[derive(Debug, Clone)]
pub struct LineClassifier {
    ready_markers: Vec<String>,
    capture_digits: bool,
}

impl LineClassifier {
    /// Classifier for a command exchange: captures prediction digits
    pub fn exchange(ready_markers: &[String]) -> Self {
        Self {
            ready_markers: non_empty(ready_markers),
            capture_digits: true,
        }
    }

    /// Classifier for the startup banner: only looks for ready markers
    pub fn banner(banner_markers: &[String]) -> Self {
        Self {
            ready_markers: non_empty(banner_markers),
            capture_digits: false,
        }
    }

    pub fn classify(&self, line: &str) -> LineKind {
        if self.capture_digits {
            if let Some(digit) = single_digit(line) {
                return LineKind::Prediction(digit);
            }
        }
        if self.is_ready(line) {
            LineKind::Ready
        } else {
            LineKind::Chatter
        }
    }

    /// Case-sensitive substring match against the configured markers
    pub fn is_ready(&self, line: &str) -> bool {
        self.ready_markers.iter().any(|marker| line.contains(marker.as_str()))
    }
}

fn non_empty(markers: &[String]) -> Vec<String> {
    markers.iter().filter(|m| !m.is_empty()).cloned().collect()
}

fn single_digit(line: &str) -> Option<u8> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}
