//! Script injected into the previewed page.
//!
//! It runs inside the embedded iframe, so it cannot touch the overlay. It only
//! reports to the content context: close requests, link presses (which the
//! preview loads itself) and focus.

use crate::types::input::LinkTarget;
use crate::types::message::RuntimeMessage;
use crate::types::settings::{PreviewSettings, SettingsChange};

const DEFAULT_CLOSE_KEY: &str = "Escape";

/// Result of a pointer-down inside the iframe.
#[derive(Debug, Clone, PartialEq)]
pub struct IframeAction {
    pub message: Option<RuntimeMessage>,
    pub prevent_default: bool,
}

#[derive(Debug, Clone)]
pub struct IframeAgent {
    close_key: String,
}

impl Default for IframeAgent {
    fn default() -> Self {
        Self {
            close_key: DEFAULT_CLOSE_KEY.to_string(),
        }
    }
}

impl IframeAgent {
    pub fn new(settings: &PreviewSettings) -> Self {
        let mut agent = Self::default();
        if !settings.close_key.is_empty() {
            agent.close_key = settings.close_key.clone();
        }
        agent
    }

    pub fn close_key(&self) -> &str {
        &self.close_key
    }

    pub fn on_key_down(&self, key: &str) -> Option<RuntimeMessage> {
        (key == self.close_key).then_some(RuntimeMessage::ClosePreviewFromIframe)
    }

    /// Link presses are taken over: the preview navigates instead of the frame.
    pub fn on_pointer_down(&self, link: Option<&LinkTarget>) -> IframeAction {
        match link.filter(|l| l.is_previewable()) {
            Some(link) => IframeAction {
                message: Some(RuntimeMessage::UpdatePreviewUrl {
                    url: link.href.clone(),
                }),
                prevent_default: true,
            },
            None => IframeAction {
                message: None,
                prevent_default: false,
            },
        }
    }

    pub fn on_window_focus(&self) -> RuntimeMessage {
        RuntimeMessage::IFrameHasFocus
    }

    /// Follows `closeKey` changes made elsewhere.
    pub fn apply_settings_changes(&mut self, changes: &[SettingsChange]) {
        for change in changes.iter().filter(|c| c.key == "closeKey") {
            match change.new_value.as_str() {
                Some(key) if !key.is_empty() => self.close_key = key.to_string(),
                _ => self.close_key = DEFAULT_CLOSE_KEY.to_string(),
            }
        }
    }
}
