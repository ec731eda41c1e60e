//! Trigger classification for host-page pointer input.
//!
//! Decides whether a pointer-down opens a preview now (modifier held), arms
//! the long-press timer, or does nothing; suppresses the default navigation
//! of modifier-clicks; redirects link clicks into the live preview; and
//! debounces hover preconnects.

use std::time::Duration;

use tracing::{debug, trace};

use crate::services::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::services::scheduler::{DebounceKey, Scheduler, TimerId};
use crate::types::input::{ClickEvent, LinkTarget, MouseButton, PointerEvent};
use crate::types::session::SessionPhase;
use crate::types::settings::PreviewSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerDownOutcome {
    Ignore,
    /// The modifier was held: open immediately and swallow the event.
    OpenNow { url: String },
    /// The long-press timer is running for this link.
    Armed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Let the browser handle the click.
    Default,
    /// Prevent the default navigation.
    Suppress,
    /// Prevent the default navigation and load the link in the preview.
    Redirect { url: String },
}

#[derive(Debug, Default)]
pub struct TriggerManager {
    armed_url: Option<String>,
    last_hovered: Option<String>,
    preconnect: Debouncer<String>,
}

impl TriggerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed_url.is_some()
    }

    fn previewable(link: Option<&LinkTarget>) -> Option<&LinkTarget> {
        link.filter(|l| l.is_previewable())
    }

    pub fn on_pointer_down(
        &mut self,
        scheduler: &mut dyn Scheduler,
        event: &PointerEvent,
        settings: &PreviewSettings,
        site_disabled: bool,
        phase: SessionPhase,
    ) -> PointerDownOutcome {
        if site_disabled || phase != SessionPhase::Idle || event.button != MouseButton::Primary {
            return PointerDownOutcome::Ignore;
        }
        let Some(link) = Self::previewable(event.link.as_ref()) else {
            return PointerDownOutcome::Ignore;
        };

        if event.modifiers.is_held(settings.modifier) {
            debug!(url = %link.href, "modifier press opens preview");
            self.cancel_long_press(scheduler);
            return PointerDownOutcome::OpenNow {
                url: link.href.clone(),
            };
        }

        self.armed_url = Some(link.href.clone());
        scheduler.schedule(TimerId::LongPress, Duration::from_millis(settings.duration));
        trace!(url = %link.href, duration = settings.duration, "long press armed");
        PointerDownOutcome::Armed
    }

    pub fn on_pointer_up(&mut self, scheduler: &mut dyn Scheduler) {
        self.cancel_long_press(scheduler);
    }

    pub fn cancel_long_press(&mut self, scheduler: &mut dyn Scheduler) {
        if self.armed_url.take().is_some() {
            scheduler.cancel(TimerId::LongPress);
        }
    }

    /// The long-press timer fired. Returns the URL to open.
    pub fn on_long_press_elapsed(&mut self) -> Option<String> {
        self.armed_url.take()
    }

    pub fn on_click(&self, click: &ClickEvent, settings: &PreviewSettings, phase: SessionPhase) -> ClickOutcome {
        let Some(link) = click.link.as_ref() else {
            return ClickOutcome::Default;
        };
        if click.modifiers.is_held(settings.modifier) {
            return ClickOutcome::Suppress;
        }
        if phase == SessionPhase::Ready && link.is_previewable() {
            return ClickOutcome::Redirect {
                url: link.href.clone(),
            };
        }
        ClickOutcome::Default
    }

    /// Restarts the preconnect debounce for a newly hovered link. Returns
    /// whether a preconnect was scheduled.
    pub fn on_mouse_over(
        &mut self,
        scheduler: &mut dyn Scheduler,
        link: Option<&LinkTarget>,
        site_disabled: bool,
    ) -> bool {
        if site_disabled {
            return false;
        }
        let Some(link) = link.filter(|l| !l.href.is_empty()) else {
            return false;
        };
        if self.last_hovered.as_deref() == Some(link.href.as_str()) {
            return false;
        }
        self.last_hovered = Some(link.href.clone());
        self.preconnect
            .trigger(scheduler, DebounceKey::Preconnect, DEFAULT_DEBOUNCE, link.href.clone());
        true
    }

    pub fn on_mouse_out(&mut self, scheduler: &mut dyn Scheduler, link: Option<&LinkTarget>) {
        if link.is_some() {
            self.preconnect.cancel(scheduler, DebounceKey::Preconnect);
            self.last_hovered = None;
        }
    }

    /// The preconnect debounce fired. Returns the URL to warm up.
    pub fn on_preconnect_elapsed(&mut self) -> Option<String> {
        self.preconnect.fire(DebounceKey::Preconnect)
    }
}
