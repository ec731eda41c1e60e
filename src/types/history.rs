use serde::{Deserialize, Serialize};

/// Enabled state of the back/forward buttons, derived from the history cursor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavButtons {
    pub back_enabled: bool,
    pub forward_enabled: bool,
}

impl NavButtons {
    /// Computes button state from the cursor and log length.
    pub fn from_cursor(cursor: usize, len: usize) -> Self {
        Self {
            back_enabled: cursor > 0,
            forward_enabled: cursor + 1 < len,
        }
    }
}
