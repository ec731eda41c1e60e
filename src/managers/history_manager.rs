//! History Manager for the preview overlay.
//!
//! Implements `HistoryManagerTrait`: a per-session linear navigation log with
//! browser-style back/forward and forward truncation. The log is never empty
//! and `entries[cursor]` is always the URL on screen.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::platform::Surface;
use crate::services::scheduler::{Scheduler, TimerId};
use crate::types::history::NavButtons;

/// How long the copy button shows its "copied" state.
pub const COPY_FEEDBACK: Duration = Duration::from_millis(1500);

/// Trait defining history log operations.
pub trait HistoryManagerTrait {
    fn go_back(&mut self) -> Option<Url>;
    fn go_forward(&mut self) -> Option<Url>;
    fn add_entry(&mut self, url: Url) -> bool;
    fn current(&self) -> &Url;
    fn nav_state(&self) -> NavButtons;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryManager {
    entries: Vec<Url>,
    cursor: usize,
}

impl HistoryManager {
    /// Starts a log holding only `seed`.
    pub fn new(seed: Url) -> Self {
        Self {
            entries: vec![seed],
            cursor: 0,
        }
    }

    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the current URL to the clipboard and flags the copy button
    /// until [`TimerId::CopyFeedback`] fires.
    ///
    /// Returns false if the clipboard refused the write; the button is left
    /// untouched in that case.
    pub fn copy_current_url(&self, surface: &mut dyn Surface, scheduler: &mut dyn Scheduler) -> bool {
        match surface.write_clipboard(self.current().as_str()) {
            Ok(()) => {
                surface.set_copy_feedback(true);
                scheduler.schedule(TimerId::CopyFeedback, COPY_FEEDBACK);
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to copy preview url");
                false
            }
        }
    }
}

impl HistoryManagerTrait for HistoryManager {
    fn go_back(&mut self) -> Option<Url> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    fn go_forward(&mut self) -> Option<Url> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Records `url` as the new current entry, dropping anything forward of
    /// the cursor. A URL equal to the current entry is ignored.
    fn add_entry(&mut self, url: Url) -> bool {
        if self.entries[self.cursor] == url {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(url);
        self.cursor = self.entries.len() - 1;
        debug!(cursor = self.cursor, len = self.entries.len(), "history entry added");
        true
    }

    fn current(&self) -> &Url {
        &self.entries[self.cursor]
    }

    fn nav_state(&self) -> NavButtons {
        NavButtons::from_cursor(self.cursor, self.entries.len())
    }
}
