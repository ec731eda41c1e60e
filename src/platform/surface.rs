//! The rendering primitive the content context draws on.
//!
//! A `Surface` is the host page as seen from the content script: the document
//! body, the overlay's isolated DOM scope, the embedded iframe or image, and a
//! handful of window-level capabilities (clipboard, new tab, reload). The
//! controllers only talk to the page through this trait.

use url::Url;

use crate::types::errors::SurfaceError;
use crate::types::geometry::{GeometryState, Viewport};
use crate::types::history::NavButtons;
use crate::types::session::{ContentKind, DialogKind, ReadyState, ScrollOffset};
use crate::types::settings::{LoadingAnimation, Theme};

pub trait Surface {
    // --- host document ---

    /// Whether `document.body` exists yet.
    fn has_body(&self) -> bool;
    fn scroll_offset(&self) -> ScrollOffset;
    fn scroll_to(&mut self, offset: ScrollOffset);
    /// Sets (`Some`) or removes (`None`) an inline style property on the body.
    fn set_body_style(&mut self, property: &str, value: Option<&str>) -> Result<(), SurfaceError>;
    fn viewport(&self) -> Viewport;
    /// Hostname of the host page, used for site disabling.
    fn host_name(&self) -> String;

    // --- interaction pause ---

    /// Injects or removes the stylesheet that pauses host-page animations.
    fn inject_pause_style(&mut self, enabled: bool) -> Result<(), SurfaceError>;
    /// Dims the backdrop and activates the click interceptor around the overlay.
    fn set_backdrop(&mut self, active: bool) -> Result<(), SurfaceError>;

    // --- overlay ---

    /// Builds the overlay: backdrop, isolated root, chrome and resize handles.
    fn mount_overlay(&mut self, theme: Theme, url: &Url) -> Result<(), SurfaceError>;
    fn unmount_overlay(&mut self);
    fn play_exit_transition(&mut self);
    fn apply_geometry(&mut self, geometry: &GeometryState) -> Result<(), SurfaceError>;

    // --- embedded content ---

    /// Replaces the current content node with a fresh iframe or image.
    fn mount_content(&mut self, kind: ContentKind) -> Result<(), SurfaceError>;
    fn set_content_target(&mut self, url: &Url) -> Result<(), SurfaceError>;
    fn content_ready_state(&self) -> ReadyState;
    /// Fades the content in.
    fn reveal_content(&mut self);
    fn set_content_pointer_events(&mut self, enabled: bool);

    // --- chrome ---

    fn set_address(&mut self, url: &Url);
    fn set_nav_buttons(&mut self, buttons: NavButtons);
    /// Shows the given loading animation, or clears it with `None`.
    fn set_loading(&mut self, animation: Option<LoadingAnimation>);
    fn set_copy_feedback(&mut self, copied: bool);
    fn write_clipboard(&mut self, text: &str) -> Result<(), SurfaceError>;

    // --- dialogs and window ---

    fn show_dialog(&mut self, dialog: &DialogKind);
    fn dismiss_dialog(&mut self);
    fn open_tab(&mut self, url: &Url);
    fn reload_page(&mut self);
    fn focus_window(&mut self);
}
