use serde::{Deserialize, Serialize};

use super::geometry::{Point, ResizeEdges};
use super::settings::ModifierKey;

/// Modifier keys held during a pointer or click event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(key: ModifierKey) -> Self {
        let mut m = Self::default();
        match key {
            ModifierKey::Shift => m.shift = true,
            ModifierKey::Ctrl => m.ctrl = true,
            ModifierKey::Alt => m.alt = true,
            ModifierKey::Meta => m.meta = true,
        }
        m
    }

    pub fn is_held(&self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::Shift => self.shift,
            ModifierKey::Ctrl => self.ctrl,
            ModifierKey::Alt => self.alt,
            ModifierKey::Meta => self.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// The closest enclosing `<a>` of an event target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkTarget {
    pub href: String,
}

impl LinkTarget {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// Empty hrefs and `javascript:` links never open a preview.
    pub fn is_previewable(&self) -> bool {
        !self.href.is_empty() && !self.href.trim_start().to_ascii_lowercase().starts_with("javascript:")
    }
}

/// Buttons in the overlay's address bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChromeButton {
    Back,
    Forward,
    Copy,
    Restore,
    OpenInTab,
    Close,
}

/// Which part of the page a pointer event landed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HitRegion {
    HostPage,
    /// The address bar outside its buttons; dragging starts here.
    AddressBar,
    ChromeButton(ChromeButton),
    ResizeHandle(ResizeEdges),
    /// The embedded iframe or image.
    Content,
    /// The dimmed area around the overlay.
    Interceptor,
}

impl HitRegion {
    pub fn is_inside_overlay(&self) -> bool {
        !matches!(self, HitRegion::HostPage | HitRegion::Interceptor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub link: Option<LinkTarget>,
    pub region: HitRegion,
}

impl PointerEvent {
    /// A primary-button press on the host page.
    pub fn on_host(position: Point, link: Option<LinkTarget>) -> Self {
        Self {
            position,
            button: MouseButton::Primary,
            modifiers: Modifiers::none(),
            link,
            region: HitRegion::HostPage,
        }
    }

    /// A primary-button press on a part of the overlay.
    pub fn on_overlay(position: Point, region: HitRegion) -> Self {
        Self {
            position,
            button: MouseButton::Primary,
            modifiers: Modifiers::none(),
            link: None,
            region,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A click on the host page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClickEvent {
    pub link: Option<LinkTarget>,
    pub modifiers: Modifiers,
}
