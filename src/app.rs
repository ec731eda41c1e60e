//! Content-context core for the link previewer.
//!
//! `App` is the explicit context object of one host page: it owns the
//! rendering surface, the timer scheduler, the settings store and every
//! controller, and turns page events into controller calls one at a time.

use tracing::{debug, warn};

use crate::managers::geometry_manager::GeometryUpdates;
use crate::managers::preview_manager::{PreviewContext, PreviewController, PreviewManagerTrait};
use crate::managers::trigger_manager::{ClickOutcome, PointerDownOutcome, TriggerManager};
use crate::platform::Surface;
use crate::services::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::services::scheduler::{DebounceKey, Scheduler, TimerId};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::{MessagingError, PreviewError};
use crate::types::geometry::Point;
use crate::types::input::{ClickEvent, HitRegion, LinkTarget, PointerEvent};
use crate::types::message::{Outbound, PrepareResponse, RuntimeMessage};
use crate::types::session::{DialogAction, OpenOutcome};
use crate::types::settings::{PreviewSettings, SettingsChange};

/// Everything that can happen to the content context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    PointerDown(PointerEvent),
    PointerMove(Point),
    PointerUp,
    /// A click on the host page.
    Click(ClickEvent),
    /// A click on the overlay or its click interceptor.
    OverlayClick(HitRegion),
    MouseOver(Option<LinkTarget>),
    MouseOut(Option<LinkTarget>),
    KeyDown(String),
    WindowFocus,
    WindowBlur,
    WindowResized,
    Timer(TimerId),
    AnimationFrame,
    /// A message relayed from the embedded iframe.
    Message(RuntimeMessage),
    PrepareResolved {
        generation: u64,
        result: Result<PrepareResponse, MessagingError>,
    },
    Dialog(DialogAction),
    /// Settings written by another context.
    SettingsChanged(Vec<SettingsChange>),
    /// Open a preview without a pointer gesture.
    OpenRequested(String),
    Shutdown,
}

/// What the page should do with the DOM event that produced a
/// [`ContentEvent`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disposition {
    pub prevent_default: bool,
}

impl Disposition {
    fn prevent() -> Self {
        Self {
            prevent_default: true,
        }
    }
}

/// Payloads of debounced operations owned by the app.
#[derive(Debug, Clone, PartialEq)]
pub enum DebouncedOp {
    PersistGeometry(GeometryUpdates),
    BoundsCheck,
}

fn merge_ops(acc: &mut DebouncedOp, more: DebouncedOp) {
    match (acc, more) {
        (DebouncedOp::PersistGeometry(a), DebouncedOp::PersistGeometry(b)) => a.extend(b),
        (acc, more) => *acc = more,
    }
}

pub struct App<S: Surface, T: Scheduler> {
    surface: S,
    scheduler: T,
    settings: SettingsEngine,
    controller: PreviewController,
    trigger: TriggerManager,
    debouncer: Debouncer<DebouncedOp>,
    outbox: Vec<Outbound>,
}

impl<S: Surface, T: Scheduler> App<S, T> {
    pub fn new(surface: S, scheduler: T, settings: SettingsEngine) -> Self {
        Self {
            surface,
            scheduler,
            settings,
            controller: PreviewController::new(),
            trigger: TriggerManager::new(),
            debouncer: Debouncer::new(),
            outbox: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    pub fn controller(&self) -> &PreviewController {
        &self.controller
    }

    pub fn trigger(&self) -> &TriggerManager {
        &self.trigger
    }

    pub fn settings(&self) -> &PreviewSettings {
        self.settings.get_settings()
    }

    pub fn settings_engine(&self) -> &SettingsEngine {
        &self.settings
    }

    pub fn settings_engine_mut(&mut self) -> &mut SettingsEngine {
        &mut self.settings
    }

    pub fn is_site_disabled(&self) -> bool {
        self.settings.is_site_disabled(&self.surface.host_name())
    }

    /// Drains every message waiting for the background.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        let mut out = std::mem::take(&mut self.outbox);
        out.extend(self.controller.take_outbound());
        out
    }

    /// Splits the app into the controller, the trigger manager and a context
    /// over the remaining fields.
    fn parts(&mut self) -> (&mut PreviewController, &mut TriggerManager, PreviewContext<'_>) {
        let ctx = PreviewContext {
            surface: &mut self.surface,
            scheduler: &mut self.scheduler,
            settings: self.settings.get_settings(),
        };
        (&mut self.controller, &mut self.trigger, ctx)
    }

    pub fn open(&mut self, url: &str) -> Result<OpenOutcome, PreviewError> {
        let (controller, trigger, mut ctx) = self.parts();
        trigger.cancel_long_press(ctx.scheduler);
        controller.open(&mut ctx, url)
    }

    /// Handles one event to completion.
    pub fn handle(&mut self, event: ContentEvent) -> Result<Disposition, PreviewError> {
        let disposition = self.dispatch(event)?;
        self.flush_persist();
        Ok(disposition)
    }

    fn dispatch(&mut self, event: ContentEvent) -> Result<Disposition, PreviewError> {
        if let ContentEvent::SettingsChanged(changes) = &event {
            self.settings.apply_external_changes(changes)?;
        }
        let site_disabled = self.is_site_disabled();
        let (controller, trigger, mut ctx) = self.parts();
        let phase = controller.phase();

        match event {
            ContentEvent::PointerDown(ev) => {
                if ev.region != HitRegion::HostPage {
                    let started = controller.on_pointer_down(&mut ctx, &ev)?;
                    return Ok(Disposition {
                        prevent_default: started,
                    });
                }
                controller.on_pointer_down(&mut ctx, &ev)?;
                match trigger.on_pointer_down(ctx.scheduler, &ev, ctx.settings, site_disabled, phase) {
                    PointerDownOutcome::OpenNow { url } => {
                        let outcome = controller.open(&mut ctx, &url)?;
                        debug!(?outcome, "modifier open");
                        Ok(Disposition::prevent())
                    }
                    PointerDownOutcome::Armed | PointerDownOutcome::Ignore => Ok(Disposition::default()),
                }
            }
            ContentEvent::PointerMove(position) => {
                controller.on_pointer_move(&mut ctx, position)?;
                Ok(Disposition::default())
            }
            ContentEvent::PointerUp => {
                trigger.on_pointer_up(ctx.scheduler);
                controller.on_pointer_up(&mut ctx)?;
                Ok(Disposition::default())
            }
            ContentEvent::Click(click) => match trigger.on_click(&click, ctx.settings, phase) {
                ClickOutcome::Default => Ok(Disposition::default()),
                ClickOutcome::Suppress => Ok(Disposition::prevent()),
                ClickOutcome::Redirect { url } => {
                    controller.navigate(&mut ctx, &url, false)?;
                    Ok(Disposition::prevent())
                }
            },
            ContentEvent::OverlayClick(region) => {
                controller.on_overlay_click(&mut ctx, region)?;
                Ok(Disposition::default())
            }
            ContentEvent::MouseOver(link) => {
                trigger.on_mouse_over(ctx.scheduler, link.as_ref(), site_disabled);
                Ok(Disposition::default())
            }
            ContentEvent::MouseOut(link) => {
                trigger.on_mouse_out(ctx.scheduler, link.as_ref());
                Ok(Disposition::default())
            }
            ContentEvent::KeyDown(key) => Ok(Disposition {
                prevent_default: controller.on_key_down(&mut ctx, &key),
            }),
            ContentEvent::WindowFocus => {
                controller.on_window_focus(&mut ctx)?;
                Ok(Disposition::default())
            }
            ContentEvent::WindowBlur => {
                controller.on_window_blur(&mut ctx)?;
                Ok(Disposition::default())
            }
            ContentEvent::WindowResized => {
                if phase.is_live() {
                    self.debouncer.trigger(
                        &mut self.scheduler,
                        DebounceKey::BoundsCheck,
                        DEFAULT_DEBOUNCE,
                        DebouncedOp::BoundsCheck,
                    );
                }
                Ok(Disposition::default())
            }
            ContentEvent::Timer(timer) => {
                self.on_timer(timer)?;
                Ok(Disposition::default())
            }
            ContentEvent::AnimationFrame => {
                controller.on_animation_frame(&mut ctx);
                Ok(Disposition::default())
            }
            ContentEvent::Message(message) => {
                controller.on_runtime_message(&mut ctx, &message)?;
                Ok(Disposition::default())
            }
            ContentEvent::PrepareResolved { generation, result } => {
                controller.on_prepare_resolved(&mut ctx, generation, result)?;
                Ok(Disposition::default())
            }
            ContentEvent::Dialog(action) => {
                controller.on_dialog_action(&mut ctx, action);
                Ok(Disposition::default())
            }
            ContentEvent::SettingsChanged(changes) => {
                let keys: Vec<String> = changes.into_iter().map(|c| c.key).collect();
                controller.on_settings_changed(&mut ctx, &keys);
                Ok(Disposition::default())
            }
            ContentEvent::OpenRequested(url) => {
                trigger.cancel_long_press(ctx.scheduler);
                controller.open(&mut ctx, &url)?;
                Ok(Disposition::default())
            }
            ContentEvent::Shutdown => Ok(Disposition::default()),
        }
    }

    fn on_timer(&mut self, timer: TimerId) -> Result<(), PreviewError> {
        match timer {
            TimerId::LongPress => {
                if let Some(url) = self.trigger.on_long_press_elapsed() {
                    self.open(&url)?;
                }
            }
            TimerId::Debounce(DebounceKey::Preconnect) => {
                if let Some(url) = self.trigger.on_preconnect_elapsed() {
                    self.outbox.push(Outbound::Send(RuntimeMessage::Preconnect { url }));
                }
            }
            TimerId::Debounce(key) => match self.debouncer.fire(key) {
                Some(DebouncedOp::PersistGeometry(updates)) => {
                    self.settings.set_many(&updates)?;
                }
                Some(DebouncedOp::BoundsCheck) => {
                    let (controller, _, mut ctx) = self.parts();
                    controller.check_in_bounds(&mut ctx)?;
                }
                None => {}
            },
            TimerId::CloseAnimation => {
                let (controller, _, mut ctx) = self.parts();
                controller.on_close_delay_elapsed(&mut ctx)?;
            }
            TimerId::LoaderHide => {
                let (controller, _, mut ctx) = self.parts();
                controller.on_loader_hide(&mut ctx);
            }
            TimerId::CopyFeedback => {
                let (controller, _, mut ctx) = self.parts();
                controller.on_copy_feedback_elapsed(&mut ctx);
            }
        }
        Ok(())
    }

    /// Feeds geometry updates from the controller into the persistence
    /// debounce, merging with any write still pending.
    fn flush_persist(&mut self) {
        let updates = self.controller.take_persist();
        if updates.is_empty() {
            return;
        }
        self.debouncer.trigger_merge(
            &mut self.scheduler,
            DebounceKey::PersistGeometry,
            DEFAULT_DEBOUNCE,
            DebouncedOp::PersistGeometry(updates),
            merge_ops,
        );
    }

    /// Forces any pending geometry write to storage now.
    pub fn flush_pending_writes(&mut self) {
        if let Some(DebouncedOp::PersistGeometry(updates)) = self.debouncer.fire(DebounceKey::PersistGeometry) {
            self.scheduler.cancel(TimerId::Debounce(DebounceKey::PersistGeometry));
            if let Err(e) = self.settings.set_many(&updates) {
                warn!(error = %e, "failed to persist geometry on shutdown");
            }
        }
    }
}
