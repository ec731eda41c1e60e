//! Preview session controller.
//!
//! Owns the lifecycle of the single overlay preview:
//! `Idle -> Opening -> Ready -> Closing -> Idle`. It builds the overlay,
//! renders content (iframe after the prepare handshake, images directly),
//! polls the embedded document once per frame until it is interactive,
//! routes navigation through the history log, and tears everything down
//! after the exit transition.
//!
//! The controller never talks to the background directly. Outgoing messages
//! are queued as [`Outbound`] and handshake replies come back through
//! [`PreviewController::on_prepare_resolved`] tagged with the render
//! generation that asked for them, so replies for a superseded render are
//! dropped.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::focus_manager::{FocusController, FocusManagerTrait};
use super::geometry_manager::{GeometryController, GeometryUpdates};
use super::history_manager::{HistoryManager, HistoryManagerTrait};
use crate::platform::Surface;
use crate::services::scheduler::{Scheduler, TimerId};
use crate::types::errors::{MessagingError, PreviewError, SurfaceError};
use crate::types::geometry::Point;
use crate::types::input::{ChromeButton, HitRegion, PointerEvent};
use crate::types::message::{Outbound, PrepareResponse, RuntimeMessage};
use crate::types::session::{
    ContentKind, DialogAction, DialogKind, NavigateOutcome, OpenOutcome, Session, SessionPhase,
};
use crate::types::settings::{LoadingAnimation, PreviewSettings};

/// Delay between the exit transition and overlay removal.
pub const CLOSE_DELAY: Duration = Duration::from_millis(200);
/// The loading animation stays up at least this long after a render starts.
pub const MIN_LOADING_DISPLAY: Duration = Duration::from_millis(1000);

/// Everything a controller call may touch besides its own state.
pub struct PreviewContext<'a> {
    pub surface: &'a mut dyn Surface,
    pub scheduler: &'a mut dyn Scheduler,
    pub settings: &'a PreviewSettings,
}

/// Trait defining the session operations.
pub trait PreviewManagerTrait {
    fn open(&mut self, ctx: &mut PreviewContext<'_>, url: &str) -> Result<OpenOutcome, PreviewError>;
    fn navigate(
        &mut self,
        ctx: &mut PreviewContext<'_>,
        url: &str,
        from_iframe: bool,
    ) -> Result<NavigateOutcome, PreviewError>;
    fn go_back(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError>;
    fn go_forward(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError>;
    fn close(&mut self, ctx: &mut PreviewContext<'_>) -> bool;
}

/// State that exists only while an overlay is on screen.
#[derive(Debug, Clone)]
pub struct ActivePreview {
    pub session: Session,
    pub history: HistoryManager,
    pub geometry: GeometryController,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenDialog {
    pub kind: DialogKind,
    /// Raised by `open`; blocks further opens until dismissed.
    pub from_open: bool,
}

#[derive(Debug, Clone, Default)]
struct RenderState {
    generation: u64,
    started: Option<Instant>,
    polling: bool,
    polls: u64,
}

#[derive(Debug)]
pub struct PreviewController {
    phase: SessionPhase,
    active: Option<ActivePreview>,
    focus: FocusController,
    dialog: Option<OpenDialog>,
    render: RenderState,
    outbox: Vec<Outbound>,
    persist: GeometryUpdates,
}

impl Default for PreviewController {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_url(raw: &str) -> Result<Url, PreviewError> {
    Url::parse(raw).map_err(|e| PreviewError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn is_insecure(url: &Url) -> bool {
    url.scheme() == "http"
}

/// Same document: only the fragment may differ.
fn same_document(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && a.path() == b.path() && a.query() == b.query()
}

impl PreviewController {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            active: None,
            focus: FocusController::new(),
            dialog: None,
            render: RenderState::default(),
            outbox: Vec::new(),
            persist: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn history(&self) -> Option<&HistoryManager> {
        self.active.as_ref().map(|a| &a.history)
    }

    pub fn geometry(&self) -> Option<&GeometryController> {
        self.active.as_ref().map(|a| &a.geometry)
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn dialog(&self) -> Option<&OpenDialog> {
        self.dialog.as_ref()
    }

    pub fn render_generation(&self) -> u64 {
        self.render.generation
    }

    pub fn is_polling(&self) -> bool {
        self.render.polling
    }

    /// Readiness polls run for the current render. Diagnostic only.
    pub fn poll_count(&self) -> u64 {
        self.render.polls
    }

    /// Drains messages queued for the background.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Drains settings updates produced by drag, resize and restore.
    pub fn take_persist(&mut self) -> GeometryUpdates {
        std::mem::take(&mut self.persist)
    }

    fn is_stage(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| a.geometry.is_centered_stage())
            .unwrap_or(false)
    }

    fn raise_dialog(&mut self, ctx: &mut PreviewContext<'_>, kind: DialogKind, from_open: bool) {
        info!(dialog = ?kind, from_open, "showing dialog");
        ctx.surface.show_dialog(&kind);
        self.dialog = Some(OpenDialog { kind, from_open });
    }

    /// Undoes a partially built overlay after a failed open.
    fn abort_open(&mut self, ctx: &mut PreviewContext<'_>) {
        if let Err(e) = self.focus.release(ctx.surface) {
            warn!(error = %e, "failed to release focus after aborted open");
        }
        ctx.surface.unmount_overlay();
        self.active = None;
        self.render.polling = false;
        self.render.generation += 1;
        self.phase = SessionPhase::Idle;
    }

    fn build_overlay(&mut self, ctx: &mut PreviewContext<'_>, url: Url) -> Result<(), PreviewError> {
        let geometry = GeometryController::from_settings(ctx.settings);
        ctx.surface.mount_overlay(ctx.settings.theme, &url)?;
        ctx.surface.apply_geometry(geometry.state())?;

        let history = HistoryManager::new(url.clone());
        ctx.surface.set_nav_buttons(history.nav_state());
        let is_stage = geometry.is_centered_stage();
        self.active = Some(ActivePreview {
            session: Session::new(url.clone(), geometry.is_expanded()),
            history,
            geometry,
        });

        self.focus.engage(ctx.surface, is_stage)?;
        self.render(ctx, &url)
    }

    /// Replaces the content node and starts loading `url` into it.
    fn render(&mut self, ctx: &mut PreviewContext<'_>, url: &Url) -> Result<(), PreviewError> {
        self.render.generation += 1;
        self.render.started = Some(Instant::now());
        self.render.polling = false;
        self.render.polls = 0;
        ctx.scheduler.cancel(TimerId::LoaderHide);

        let kind = ContentKind::for_url(url);
        if let Some(active) = self.active.as_mut() {
            active.session.content = kind;
            active.session.current_url = url.clone();
        }

        ctx.surface.set_address(url);
        ctx.surface.mount_content(kind)?;
        let animation = ctx.settings.loading_animation;
        ctx.surface
            .set_loading((animation != LoadingAnimation::Off).then_some(animation));

        debug!(%url, ?kind, generation = self.render.generation, "rendering content");
        match kind {
            ContentKind::Image => {
                ctx.surface.set_content_target(url)?;
                self.start_polling(ctx);
            }
            ContentKind::Iframe => self.outbox.push(Outbound::Request {
                generation: self.render.generation,
                message: RuntimeMessage::PrepareToPreview { url: url.to_string() },
            }),
        }
        Ok(())
    }

    fn start_polling(&mut self, ctx: &mut PreviewContext<'_>) {
        self.render.polling = true;
        ctx.scheduler.request_frame();
    }

    /// Loads `url` into the live session. `record` is false for back/forward
    /// replays.
    fn load(
        &mut self,
        ctx: &mut PreviewContext<'_>,
        url: Url,
        record: bool,
    ) -> Result<NavigateOutcome, PreviewError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(NavigateOutcome::Ignored);
        };
        let in_place = same_document(&active.session.current_url, &url);
        if record {
            active.history.add_entry(url.clone());
        }
        ctx.surface.set_nav_buttons(active.history.nav_state());

        if in_place {
            if active.session.content == ContentKind::Iframe {
                ctx.surface.set_content_target(&url)?;
            }
            ctx.surface.set_address(&url);
            active.session.current_url = url;
            return Ok(NavigateOutcome::InPlace);
        }

        self.render(ctx, &url)?;
        Ok(NavigateOutcome::Full)
    }

    /// Handles the background's answer to `prepareToPreview`.
    ///
    /// Answers for an older render are ignored. A refusal or transport
    /// failure raises the context-expired dialog; the session stays
    /// closable. Returns true if the content target was set.
    pub fn on_prepare_resolved(
        &mut self,
        ctx: &mut PreviewContext<'_>,
        generation: u64,
        result: Result<PrepareResponse, MessagingError>,
    ) -> Result<bool, PreviewError> {
        if generation != self.render.generation || !self.phase.is_live() {
            debug!(generation, current = self.render.generation, "dropping stale prepare reply");
            return Ok(false);
        }
        let failure = match result {
            Ok(PrepareResponse { ready: true }) => None,
            Ok(PrepareResponse { ready: false }) => Some(MessagingError::NotReady),
            Err(e) => Some(e),
        };
        if let Some(e) = failure {
            warn!(error = %e, "prepare handshake failed");
            ctx.surface.set_loading(None);
            self.raise_dialog(ctx, DialogKind::ContextExpired, false);
            return Ok(false);
        }

        let Some(url) = self.active.as_ref().map(|a| a.session.current_url.clone()) else {
            return Ok(false);
        };
        ctx.surface.set_content_target(&url)?;
        self.start_polling(ctx);
        Ok(true)
    }

    /// One readiness poll. Reveals the content once the embedded document is
    /// interactive, otherwise asks for another frame. Returns true on reveal.
    pub fn on_animation_frame(&mut self, ctx: &mut PreviewContext<'_>) -> bool {
        if !self.render.polling || !self.phase.is_live() {
            return false;
        }
        self.render.polls += 1;
        if !ctx.surface.content_ready_state().is_ready() {
            ctx.scheduler.request_frame();
            return false;
        }

        self.render.polling = false;
        ctx.surface.reveal_content();
        let elapsed = self.render.started.map(|s| s.elapsed()).unwrap_or_default();
        ctx.scheduler
            .schedule(TimerId::LoaderHide, MIN_LOADING_DISPLAY.saturating_sub(elapsed));
        if self.phase == SessionPhase::Opening {
            self.phase = SessionPhase::Ready;
            info!(polls = self.render.polls, "preview ready");
        }
        true
    }

    pub fn on_loader_hide(&mut self, ctx: &mut PreviewContext<'_>) {
        ctx.surface.set_loading(None);
    }

    pub fn on_copy_feedback_elapsed(&mut self, ctx: &mut PreviewContext<'_>) {
        ctx.surface.set_copy_feedback(false);
    }

    /// Second half of `close`: removes the overlay once the exit transition
    /// has played.
    pub fn on_close_delay_elapsed(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError> {
        if self.phase != SessionPhase::Closing {
            return Ok(false);
        }
        let released = self.focus.release(ctx.surface);
        ctx.surface.unmount_overlay();
        ctx.scheduler.cancel(TimerId::LoaderHide);
        ctx.scheduler.cancel(TimerId::CopyFeedback);
        self.outbox.push(Outbound::Send(RuntimeMessage::ClearPreview));
        self.active = None;
        self.render.polling = false;
        self.render.generation += 1;
        self.phase = SessionPhase::Idle;
        ctx.surface.focus_window();
        info!("preview closed");
        released?;
        Ok(true)
    }

    pub fn on_chrome_button(&mut self, ctx: &mut PreviewContext<'_>, button: ChromeButton) -> Result<(), PreviewError> {
        if !self.phase.is_live() {
            return Ok(());
        }
        match button {
            ChromeButton::Back => {
                self.go_back(ctx)?;
            }
            ChromeButton::Forward => {
                self.go_forward(ctx)?;
            }
            ChromeButton::Copy => {
                if let Some(active) = self.active.as_ref() {
                    active.history.copy_current_url(ctx.surface, ctx.scheduler);
                }
            }
            ChromeButton::Restore => {
                let Some(active) = self.active.as_mut() else {
                    return Ok(());
                };
                let updates = active.geometry.restore_stage(ctx.surface)?;
                active.session.is_expanded = true;
                self.persist.extend(updates);
                self.focus.reevaluate(ctx.surface, true)?;
            }
            ChromeButton::OpenInTab => {
                if let Some(active) = self.active.as_ref() {
                    ctx.surface.open_tab(&active.session.current_url);
                }
                self.close(ctx);
            }
            ChromeButton::Close => {
                self.close(ctx);
            }
        }
        Ok(())
    }

    /// A click inside the overlay or on the interceptor around it.
    pub fn on_overlay_click(&mut self, ctx: &mut PreviewContext<'_>, region: HitRegion) -> Result<(), PreviewError> {
        if !self.phase.is_live() {
            return Ok(());
        }
        match region {
            HitRegion::HostPage => Ok(()),
            HitRegion::Interceptor | HitRegion::ChromeButton(ChromeButton::Close) => {
                self.close(ctx);
                Ok(())
            }
            HitRegion::ChromeButton(button) => {
                self.outbox.push(Outbound::Send(RuntimeMessage::FocusPreview));
                self.on_chrome_button(ctx, button)
            }
            HitRegion::AddressBar | HitRegion::Content | HitRegion::ResizeHandle(_) => {
                self.outbox.push(Outbound::Send(RuntimeMessage::FocusPreview));
                Ok(())
            }
        }
    }

    /// Pointer-down while a session is live. Starts a drag on the address bar
    /// or a resize on a handle. Returns true if an interaction started.
    pub fn on_pointer_down(&mut self, ctx: &mut PreviewContext<'_>, event: &PointerEvent) -> Result<bool, PreviewError> {
        if !self.phase.is_live() {
            return Ok(false);
        }
        self.focus.note_pointer_down(event.region.is_inside_overlay());
        let Some(active) = self.active.as_mut() else {
            return Ok(false);
        };
        let started = match event.region {
            HitRegion::AddressBar => active.geometry.begin_drag(ctx.surface, event)?,
            HitRegion::ResizeHandle(edges) => active.geometry.begin_resize(ctx.surface, event, edges)?,
            _ => false,
        };
        active.session.is_dragging = active.geometry.is_interacting();
        Ok(started)
    }

    pub fn on_pointer_move(&mut self, ctx: &mut PreviewContext<'_>, position: Point) -> Result<bool, PreviewError> {
        match self.active.as_mut() {
            Some(active) => Ok(active.geometry.pointer_move(ctx.surface, position)?),
            None => Ok(false),
        }
    }

    /// Ends a drag or resize: queues the geometry for persistence and
    /// re-evaluates the page toggles against the new geometry.
    pub fn on_pointer_up(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(false);
        };
        let Some(updates) = active.geometry.end_interaction(ctx.surface) else {
            return Ok(false);
        };
        active.session.is_dragging = false;
        active.session.is_expanded = false;
        self.persist.extend(updates);
        let is_stage = active.geometry.is_centered_stage();
        self.focus.reevaluate(ctx.surface, is_stage)?;
        Ok(true)
    }

    /// Debounced window-resize handler.
    pub fn check_in_bounds(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, SurfaceError> {
        match self.active.as_mut() {
            Some(active) if self.phase.is_live() => active.geometry.check_in_bounds(ctx.surface),
            _ => Ok(false),
        }
    }

    pub fn on_window_focus(&mut self, ctx: &mut PreviewContext<'_>) -> Result<(), PreviewError> {
        if !self.phase.is_live() {
            return Ok(());
        }
        let is_stage = self.is_stage();
        self.focus.on_window_focus(ctx.surface, is_stage)?;
        if let Some(active) = self.active.as_mut() {
            active.session.is_focused = false;
        }
        Ok(())
    }

    pub fn on_window_blur(&mut self, ctx: &mut PreviewContext<'_>) -> Result<(), PreviewError> {
        if !self.phase.is_live() {
            return Ok(());
        }
        self.focus.on_window_blur(ctx.surface)?;
        let focused = self.focus.state() == super::focus_manager::FocusState::PreviewFocused;
        if let Some(active) = self.active.as_mut() {
            active.session.is_focused = focused;
        }
        Ok(())
    }

    /// A message relayed from the embedded iframe.
    pub fn on_runtime_message(&mut self, ctx: &mut PreviewContext<'_>, message: &RuntimeMessage) -> Result<(), PreviewError> {
        match message {
            RuntimeMessage::UpdatePreviewUrl { url } => {
                self.navigate(ctx, url, true)?;
            }
            RuntimeMessage::ClosePreviewFromIframe => {
                self.close(ctx);
            }
            RuntimeMessage::IFrameHasFocus => {
                if self.phase.is_live() {
                    self.focus.on_iframe_focus(ctx.surface)?;
                    if let Some(active) = self.active.as_mut() {
                        active.session.is_focused = true;
                    }
                }
            }
            other => debug!(action = other.action(), "ignoring message not addressed to content"),
        }
        Ok(())
    }

    /// Document-level keydown. A dialog takes the key first.
    pub fn on_key_down(&mut self, ctx: &mut PreviewContext<'_>, key: &str) -> bool {
        if self.dialog.is_some() {
            if key == "Escape" || key == ctx.settings.close_key {
                self.on_dialog_action(ctx, DialogAction::Dismiss);
                return true;
            }
            return false;
        }
        if key == ctx.settings.close_key {
            return self.close(ctx);
        }
        false
    }

    /// Applies the button chosen in the open dialog. Returns false if no
    /// dialog was showing.
    pub fn on_dialog_action(&mut self, ctx: &mut PreviewContext<'_>, action: DialogAction) -> bool {
        let Some(dialog) = self.dialog.take() else {
            return false;
        };
        match (&dialog.kind, action) {
            (DialogKind::InsecureLink { url }, DialogAction::OpenInNewTab) => match Url::parse(url) {
                Ok(url) => ctx.surface.open_tab(&url),
                Err(e) => warn!(%url, error = %e, "cannot open insecure link"),
            },
            (DialogKind::ContextExpired, DialogAction::ReloadPage) => ctx.surface.reload_page(),
            _ => {}
        }
        ctx.surface.dismiss_dialog();
        debug!(?action, "dialog dismissed");
        true
    }

    /// Settings-store values written by another context.
    pub fn on_settings_changed(&mut self, ctx: &mut PreviewContext<'_>, changed_keys: &[String]) {
        if changed_keys.iter().any(|k| k == "loadingAnimation")
            && self.render.polling
            && ctx.settings.loading_animation == LoadingAnimation::Off
        {
            ctx.surface.set_loading(None);
        }
    }
}

impl PreviewManagerTrait for PreviewController {
    /// Opens a preview for `url`.
    ///
    /// Returns `Rejected` while another session or an open-time dialog is up,
    /// and `Warned` for plain-HTTP targets. On a precondition failure the
    /// partially built overlay is removed before the error is returned.
    fn open(&mut self, ctx: &mut PreviewContext<'_>, url: &str) -> Result<OpenOutcome, PreviewError> {
        if self.phase != SessionPhase::Idle || self.dialog.as_ref().map_or(false, |d| d.from_open) {
            debug!(%url, phase = ?self.phase, "open rejected");
            return Ok(OpenOutcome::Rejected);
        }
        ctx.scheduler.cancel(TimerId::LongPress);

        let url = parse_url(url)?;
        if is_insecure(&url) {
            self.raise_dialog(ctx, DialogKind::InsecureLink { url: url.to_string() }, true);
            return Ok(OpenOutcome::Warned);
        }
        if !ctx.surface.has_body() {
            return Err(PreviewError::Precondition(SurfaceError::MissingBody));
        }

        info!(%url, "opening preview");
        self.phase = SessionPhase::Opening;
        if let Err(e) = self.build_overlay(ctx, url) {
            warn!(error = %e, "open failed");
            self.abort_open(ctx);
            return Err(e);
        }
        Ok(OpenOutcome::Opened)
    }

    fn navigate(
        &mut self,
        ctx: &mut PreviewContext<'_>,
        url: &str,
        from_iframe: bool,
    ) -> Result<NavigateOutcome, PreviewError> {
        if !self.phase.is_live() {
            return Ok(NavigateOutcome::Ignored);
        }
        let url = parse_url(url)?;
        if is_insecure(&url) {
            self.raise_dialog(ctx, DialogKind::InsecureLink { url: url.to_string() }, false);
            return Ok(NavigateOutcome::Warned);
        }
        debug!(%url, from_iframe, "navigating preview");
        self.load(ctx, url, true)
    }

    fn go_back(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError> {
        if !self.phase.is_live() {
            return Ok(false);
        }
        match self.active.as_mut().and_then(|a| a.history.go_back()) {
            Some(url) => {
                self.load(ctx, url, false)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn go_forward(&mut self, ctx: &mut PreviewContext<'_>) -> Result<bool, PreviewError> {
        if !self.phase.is_live() {
            return Ok(false);
        }
        match self.active.as_mut().and_then(|a| a.history.go_forward()) {
            Some(url) => {
                self.load(ctx, url, false)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Starts the exit transition. No-op unless a session is Opening or
    /// Ready, so a second close while Closing does nothing.
    fn close(&mut self, ctx: &mut PreviewContext<'_>) -> bool {
        if !self.phase.is_live() {
            return false;
        }
        if let Some(active) = self.active.as_mut() {
            active.geometry.cancel_interaction(ctx.surface);
            active.session.active = false;
            active.session.is_dragging = false;
            active.session.pending_timer = Some(TimerId::CloseAnimation);
        }
        self.render.polling = false;
        ctx.surface.play_exit_transition();
        ctx.scheduler.schedule(TimerId::CloseAnimation, CLOSE_DELAY);
        self.phase = SessionPhase::Closing;
        info!("closing preview");
        true
    }
}
