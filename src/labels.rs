//! Posture class labels
//!
//! The board reports a 1-based index into this table.

use crate::error::{HostError, Result};

pub const CLASS_NAMES: [&str; 5] = ["supine", "prone", "side", "sitting", "unknown"];

/// Look up the label for a 1-based class index
pub fn label_for(index: u8) -> Result<&'static str> {
    usize::from(index)
        .checked_sub(1)
        .and_then(|i| CLASS_NAMES.get(i))
        .copied()
        .ok_or(HostError::LabelOutOfRange(index))
}
