use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Lifecycle phase of the preview session controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Opening,
    Ready,
    Closing,
}

impl SessionPhase {
    /// Opening or Ready: an overlay is on screen and accepts navigation.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionPhase::Opening | SessionPhase::Ready)
    }
}

static IMAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpeg|jpg|gif|png)$").expect("static regex"));

/// What the overlay renders for a URL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentKind {
    Iframe,
    Image,
}

impl ContentKind {
    /// Image extensions render as an `<img>`, everything else in an iframe.
    pub fn for_url(url: &Url) -> Self {
        if IMAGE_URL.is_match(url.path()) {
            ContentKind::Image
        } else {
            ContentKind::Iframe
        }
    }
}

/// Scroll offset of the host document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

impl ScrollOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Readiness of the embedded document as observed from the parent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReadyState {
    /// The embedded document is not observable (e.g. mid cross-origin navigation).
    Unavailable,
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyState::Interactive | ReadyState::Complete)
    }
}

/// One open preview and its transient flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub active: bool,
    pub current_url: Url,
    pub content: ContentKind,
    pub is_focused: bool,
    pub is_dragging: bool,
    pub is_expanded: bool,
    pub pending_timer: Option<crate::services::scheduler::TimerId>,
}

impl Session {
    pub fn new(url: Url, is_expanded: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            active: true,
            content: ContentKind::for_url(&url),
            current_url: url,
            is_focused: false,
            is_dragging: false,
            is_expanded,
            pending_timer: None,
        }
    }
}

/// Result of an `open` request.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Opened,
    /// Another session (or its warning dialog) is already live.
    Rejected,
    /// An insecure URL was routed to the warning dialog.
    Warned,
}

/// Result of a `navigate` request.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigateOutcome {
    /// Only the fragment changed; the render target was updated in place.
    InPlace,
    /// The content was torn down and rendered again.
    Full,
    Warned,
    /// No live session to navigate.
    Ignored,
}

/// User-facing dialogs raised by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogKind {
    /// Offers "Cancel" or "Open in New Tab".
    InsecureLink { url: String },
    /// Offers "Dismiss" or "Reload Page".
    ContextExpired,
}

/// Button chosen in a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Dismiss,
    OpenInNewTab,
    ReloadPage,
}
