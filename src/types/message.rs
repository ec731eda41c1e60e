use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the browser tab a content or iframe context lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Message vocabulary shared by the content script, the injected iframe
/// script and the background coordinator.
///
/// Serialized as `{"action": "<name>", ...payload}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    PrepareToPreview { url: String },
    ClearPreview,
    Preconnect { url: String },
    UpdatePreviewUrl { url: String },
    IFrameHasFocus,
    FocusPreview,
    ClosePreviewFromIframe,
}

/// Which way a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ContentToBackground,
    IframeToContent,
}

impl RuntimeMessage {
    pub fn route(&self) -> Route {
        match self {
            RuntimeMessage::PrepareToPreview { .. }
            | RuntimeMessage::ClearPreview
            | RuntimeMessage::Preconnect { .. }
            | RuntimeMessage::FocusPreview => Route::ContentToBackground,
            RuntimeMessage::UpdatePreviewUrl { .. }
            | RuntimeMessage::IFrameHasFocus
            | RuntimeMessage::ClosePreviewFromIframe => Route::IframeToContent,
        }
    }

    /// Only the prepare handshake carries a response.
    pub fn expects_response(&self) -> bool {
        matches!(self, RuntimeMessage::PrepareToPreview { .. })
    }

    /// The wire name of the message.
    pub fn action(&self) -> &'static str {
        match self {
            RuntimeMessage::PrepareToPreview { .. } => "prepareToPreview",
            RuntimeMessage::ClearPreview => "clearPreview",
            RuntimeMessage::Preconnect { .. } => "preconnect",
            RuntimeMessage::UpdatePreviewUrl { .. } => "updatePreviewUrl",
            RuntimeMessage::IFrameHasFocus => "iFrameHasFocus",
            RuntimeMessage::FocusPreview => "focusPreview",
            RuntimeMessage::ClosePreviewFromIframe => "closePreviewFromIframe",
        }
    }
}

/// Response to `prepareToPreview`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrepareResponse {
    pub ready: bool,
}

/// A message queued by the content context for delivery to the background.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Fire-and-forget send.
    Send(RuntimeMessage),
    /// Send and await a response; the reply is fed back tagged with `generation`.
    Request {
        generation: u64,
        message: RuntimeMessage,
    },
}
