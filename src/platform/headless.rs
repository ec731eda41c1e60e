//! In-memory [`Surface`] that records every effect.
//!
//! Drives the controllers without a browser: the test suites render into it
//! and then inspect its public fields.

use std::collections::BTreeMap;

use url::Url;

use super::surface::Surface;
use crate::types::errors::SurfaceError;
use crate::types::geometry::{GeometryState, Viewport};
use crate::types::history::NavButtons;
use crate::types::session::{ContentKind, DialogKind, ReadyState, ScrollOffset};
use crate::types::settings::{LoadingAnimation, Theme};

const CONTAINER_ID: &str = "preview-container";
const CONTENT_ID: &str = "preview-content";

/// The embedded iframe or image node.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessContent {
    pub kind: ContentKind,
    pub target: Option<Url>,
    pub ready_state: ReadyState,
    pub revealed: bool,
    pub pointer_events: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    pub body_present: bool,
    pub body_styles: BTreeMap<String, String>,
    pub scroll: ScrollOffset,
    pub viewport: Viewport,
    pub host: String,

    pub pause_style: bool,
    pub backdrop_active: bool,

    pub overlay_mounted: bool,
    pub theme: Option<Theme>,
    pub exit_transition_played: bool,
    pub geometry: Option<GeometryState>,
    pub content: Option<HeadlessContent>,
    /// Number of content nodes mounted since creation.
    pub content_mounts: usize,

    pub address: Option<Url>,
    pub nav: NavButtons,
    pub loading: Option<LoadingAnimation>,
    pub copy_feedback: bool,
    pub clipboard: Option<String>,
    /// When set, clipboard writes fail with this message.
    pub clipboard_denied: Option<String>,

    pub dialog: Option<DialogKind>,
    pub opened_tabs: Vec<Url>,
    pub reloads: usize,
    pub focus_count: usize,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(Viewport::new(1280.0, 800.0))
    }
}

impl HeadlessSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            body_present: true,
            body_styles: BTreeMap::new(),
            scroll: ScrollOffset::default(),
            viewport,
            host: "host.test".to_string(),
            pause_style: false,
            backdrop_active: false,
            overlay_mounted: false,
            theme: None,
            exit_transition_played: false,
            geometry: None,
            content: None,
            content_mounts: 0,
            address: None,
            nav: NavButtons::from_cursor(0, 1),
            loading: None,
            copy_feedback: false,
            clipboard: None,
            clipboard_denied: None,
            dialog: None,
            opened_tabs: Vec::new(),
            reloads: 0,
            focus_count: 0,
        }
    }

    /// A document whose body has not been parsed yet.
    pub fn without_body() -> Self {
        Self {
            body_present: false,
            ..Self::default()
        }
    }

    pub fn body_style(&self, property: &str) -> Option<&str> {
        self.body_styles.get(property).map(String::as_str)
    }

    /// Marks the embedded document as loaded.
    pub fn finish_loading(&mut self) {
        if let Some(content) = self.content.as_mut() {
            content.ready_state = ReadyState::Complete;
        }
    }

    pub fn content_target(&self) -> Option<&Url> {
        self.content.as_ref().and_then(|c| c.target.as_ref())
    }

    fn require_overlay(&self) -> Result<(), SurfaceError> {
        if self.overlay_mounted {
            Ok(())
        } else {
            Err(SurfaceError::MissingAnchor(CONTAINER_ID.to_string()))
        }
    }
}

impl Surface for HeadlessSurface {
    fn has_body(&self) -> bool {
        self.body_present
    }

    fn scroll_offset(&self) -> ScrollOffset {
        self.scroll
    }

    fn scroll_to(&mut self, offset: ScrollOffset) {
        self.scroll = offset;
    }

    fn set_body_style(&mut self, property: &str, value: Option<&str>) -> Result<(), SurfaceError> {
        if !self.body_present {
            return Err(SurfaceError::MissingBody);
        }
        match value {
            Some(v) => {
                // A fixed body no longer scrolls; the document offset collapses.
                if property == "position" && v == "fixed" {
                    self.scroll = ScrollOffset::default();
                }
                self.body_styles.insert(property.to_string(), v.to_string());
            }
            None => {
                self.body_styles.remove(property);
            }
        }
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn host_name(&self) -> String {
        self.host.clone()
    }

    fn inject_pause_style(&mut self, enabled: bool) -> Result<(), SurfaceError> {
        if !self.body_present {
            return Err(SurfaceError::MissingBody);
        }
        self.pause_style = enabled;
        Ok(())
    }

    fn set_backdrop(&mut self, active: bool) -> Result<(), SurfaceError> {
        if active {
            self.require_overlay()?;
        }
        self.backdrop_active = active;
        Ok(())
    }

    fn mount_overlay(&mut self, theme: Theme, url: &Url) -> Result<(), SurfaceError> {
        if !self.body_present {
            return Err(SurfaceError::MissingBody);
        }
        self.overlay_mounted = true;
        self.exit_transition_played = false;
        self.theme = Some(theme);
        self.address = Some(url.clone());
        Ok(())
    }

    fn unmount_overlay(&mut self) {
        self.overlay_mounted = false;
        self.theme = None;
        self.geometry = None;
        self.content = None;
        self.address = None;
        self.loading = None;
        self.copy_feedback = false;
        self.backdrop_active = false;
    }

    fn play_exit_transition(&mut self) {
        self.exit_transition_played = true;
    }

    fn apply_geometry(&mut self, geometry: &GeometryState) -> Result<(), SurfaceError> {
        self.require_overlay()?;
        self.geometry = Some(geometry.clone());
        Ok(())
    }

    fn mount_content(&mut self, kind: ContentKind) -> Result<(), SurfaceError> {
        self.require_overlay()?;
        self.content_mounts += 1;
        self.content = Some(HeadlessContent {
            kind,
            target: None,
            ready_state: ReadyState::Unavailable,
            revealed: false,
            pointer_events: true,
        });
        Ok(())
    }

    fn set_content_target(&mut self, url: &Url) -> Result<(), SurfaceError> {
        let content = self
            .content
            .as_mut()
            .ok_or_else(|| SurfaceError::MissingAnchor(CONTENT_ID.to_string()))?;
        content.target = Some(url.clone());
        content.ready_state = match content.kind {
            ContentKind::Iframe => ReadyState::Loading,
            ContentKind::Image => ReadyState::Complete,
        };
        Ok(())
    }

    fn content_ready_state(&self) -> ReadyState {
        self.content
            .as_ref()
            .map(|c| c.ready_state)
            .unwrap_or(ReadyState::Unavailable)
    }

    fn reveal_content(&mut self) {
        if let Some(content) = self.content.as_mut() {
            content.revealed = true;
        }
    }

    fn set_content_pointer_events(&mut self, enabled: bool) {
        if let Some(content) = self.content.as_mut() {
            content.pointer_events = enabled;
        }
    }

    fn set_address(&mut self, url: &Url) {
        self.address = Some(url.clone());
    }

    fn set_nav_buttons(&mut self, buttons: NavButtons) {
        self.nav = buttons;
    }

    fn set_loading(&mut self, animation: Option<LoadingAnimation>) {
        self.loading = animation;
    }

    fn set_copy_feedback(&mut self, copied: bool) {
        self.copy_feedback = copied;
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), SurfaceError> {
        if let Some(reason) = &self.clipboard_denied {
            return Err(SurfaceError::Clipboard(reason.clone()));
        }
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn show_dialog(&mut self, dialog: &DialogKind) {
        self.dialog = Some(dialog.clone());
    }

    fn dismiss_dialog(&mut self) {
        self.dialog = None;
    }

    fn open_tab(&mut self, url: &Url) {
        self.opened_tabs.push(url.clone());
    }

    fn reload_page(&mut self) {
        self.reloads += 1;
    }

    fn focus_window(&mut self) {
        self.focus_count += 1;
    }
}
