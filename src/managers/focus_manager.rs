//! Focus & scroll-lock controller.
//!
//! Tracks whether the host page or the preview owns user focus and applies
//! two independent page-level toggles:
//! - [`ScrollLock`] freezes the host document with the position-fixed
//!   technique and restores the exact offset on release.
//! - [`InteractionPause`] disables pointer events and animations on the host
//!   page and activates the overlay's backdrop and click interceptor.
//!
//! Both toggles are idempotent: asking for the state already in effect does
//! nothing, so offsets are never saved or restored twice.

use tracing::{debug, info};

use crate::platform::Surface;
use crate::types::errors::SurfaceError;
use crate::types::session::ScrollOffset;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollLock {
    locked: bool,
    saved: ScrollOffset,
}

impl ScrollLock {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn saved_offset(&self) -> ScrollOffset {
        self.saved
    }

    /// Engages (`true`) or releases (`false`) the lock.
    ///
    /// Returns `Ok(false)` when the lock is already in the requested state.
    /// Fails with [`SurfaceError::MissingBody`] before the body exists.
    pub fn toggle(&mut self, surface: &mut dyn Surface, lock: bool) -> Result<bool, SurfaceError> {
        if !surface.has_body() {
            return Err(SurfaceError::MissingBody);
        }
        if lock == self.locked {
            return Ok(false);
        }

        if lock {
            self.saved = surface.scroll_offset();
            let top = format!("-{}px", self.saved.y);
            surface.set_body_style("position", Some("fixed"))?;
            surface.set_body_style("overflow", Some("hidden"))?;
            surface.set_body_style("top", Some(&top))?;
            surface.set_body_style("width", Some("100%"))?;
        } else {
            for property in ["overflow", "position", "top", "width"] {
                surface.set_body_style(property, None)?;
            }
            surface.scroll_to(self.saved);
        }
        self.locked = lock;
        debug!(locked = lock, offset_y = self.saved.y, "scroll lock toggled");
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionPause {
    paused: bool,
}

impl InteractionPause {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes host-page interactivity. Same idempotence contract as
    /// [`ScrollLock::toggle`].
    pub fn toggle(&mut self, surface: &mut dyn Surface, pause: bool) -> Result<bool, SurfaceError> {
        if !surface.has_body() {
            return Err(SurfaceError::MissingBody);
        }
        if pause == self.paused {
            return Ok(false);
        }
        // Check the overlay anchor before touching the body.
        surface.set_backdrop(pause)?;
        surface.set_body_style("pointer-events", pause.then_some("none"))?;
        surface.inject_pause_style(pause)?;
        self.paused = pause;
        debug!(paused = pause, "interaction pause toggled");
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    ParentFocused,
    PreviewFocused,
}

/// Trait defining focus transitions driven by window and cross-frame events.
pub trait FocusManagerTrait {
    fn engage(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError>;
    fn release(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError>;
    fn on_iframe_focus(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError>;
    fn on_window_focus(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError>;
    fn on_window_blur(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError>;
    fn reevaluate(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError>;
}

#[derive(Debug, Clone)]
pub struct FocusController {
    state: FocusState,
    scroll: ScrollLock,
    pause: InteractionPause,
    /// Whether the most recent pointer-down landed inside the overlay.
    pointer_inside_preview: bool,
}

impl Default for FocusController {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusController {
    pub fn new() -> Self {
        Self {
            state: FocusState::ParentFocused,
            scroll: ScrollLock::default(),
            pause: InteractionPause::default(),
            pointer_inside_preview: false,
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll
    }

    pub fn interaction_pause(&self) -> &InteractionPause {
        &self.pause
    }

    pub fn note_pointer_down(&mut self, inside_preview: bool) {
        self.pointer_inside_preview = inside_preview;
    }

    fn enter(&mut self, state: FocusState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "focus moved");
            self.state = state;
        }
    }
}

impl FocusManagerTrait for FocusController {
    /// Session start: parent focused, scroll locked, and the page paused while
    /// the overlay is in stage geometry.
    fn engage(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError> {
        self.enter(FocusState::ParentFocused);
        self.pointer_inside_preview = false;
        self.scroll.toggle(surface, true)?;
        self.pause.toggle(surface, is_stage)?;
        Ok(())
    }

    /// Session end: everything back to the resting state.
    fn release(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        self.pause.toggle(surface, false)?;
        self.scroll.toggle(surface, false)?;
        self.enter(FocusState::ParentFocused);
        self.pointer_inside_preview = false;
        Ok(())
    }

    fn on_iframe_focus(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        self.enter(FocusState::PreviewFocused);
        self.scroll.toggle(surface, true)?;
        Ok(())
    }

    /// The host window regained focus. Stage geometry keeps the page locked.
    fn on_window_focus(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError> {
        self.enter(FocusState::ParentFocused);
        self.pointer_inside_preview = false;
        if !is_stage {
            self.scroll.toggle(surface, false)?;
        }
        Ok(())
    }

    fn on_window_blur(&mut self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        if self.pointer_inside_preview {
            self.enter(FocusState::PreviewFocused);
            self.scroll.toggle(surface, true)?;
        }
        Ok(())
    }

    /// Re-applies both toggles after a geometry change.
    fn reevaluate(&mut self, surface: &mut dyn Surface, is_stage: bool) -> Result<(), SurfaceError> {
        self.pause.toggle(surface, is_stage)?;
        let lock = is_stage || self.state == FocusState::PreviewFocused;
        self.scroll.toggle(surface, lock)?;
        Ok(())
    }
}
