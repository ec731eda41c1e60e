//! Unit tests for the preview session controller.
//!
//! Every test drives a `PreviewController` against a headless surface and a
//! manual scheduler, firing timers and animation frames by hand.

use std::time::Duration;

use serde_json::json;
use url::Url;

use link_previewer::managers::focus_manager::FocusState;
use link_previewer::managers::preview_manager::{
    PreviewContext, PreviewController, PreviewManagerTrait, CLOSE_DELAY, MIN_LOADING_DISPLAY,
};
use link_previewer::platform::HeadlessSurface;
use link_previewer::services::scheduler::{ManualScheduler, TimerId};
use link_previewer::types::errors::{MessagingError, PreviewError, SurfaceError};
use link_previewer::types::geometry::Point;
use link_previewer::types::input::{ChromeButton, HitRegion, PointerEvent};
use link_previewer::types::message::{Outbound, PrepareResponse, RuntimeMessage};
use link_previewer::types::session::{
    ContentKind, DialogAction, DialogKind, NavigateOutcome, OpenOutcome, ScrollOffset, SessionPhase,
};
use link_previewer::types::settings::{LoadingAnimation, PreviewSettings};

struct Harness {
    surface: HeadlessSurface,
    scheduler: ManualScheduler,
    settings: PreviewSettings,
    ctl: PreviewController,
}

impl Harness {
    fn new() -> Self {
        let mut surface = HeadlessSurface::default();
        surface.scroll = ScrollOffset::new(0.0, 300.0);
        Self {
            surface,
            scheduler: ManualScheduler::new(),
            settings: PreviewSettings::default(),
            ctl: PreviewController::new(),
        }
    }

    fn run<R>(&mut self, f: impl FnOnce(&mut PreviewController, &mut PreviewContext<'_>) -> R) -> R {
        let mut ctx = PreviewContext {
            surface: &mut self.surface,
            scheduler: &mut self.scheduler,
            settings: &self.settings,
        };
        f(&mut self.ctl, &mut ctx)
    }

    fn open(&mut self, url: &str) -> Result<OpenOutcome, PreviewError> {
        self.run(|c, ctx| c.open(ctx, url))
    }

    /// Answers the pending handshake and polls until the content is revealed.
    fn complete_load(&mut self) {
        let generation = self.ctl.render_generation();
        self.run(|c, ctx| c.on_prepare_resolved(ctx, generation, Ok(PrepareResponse { ready: true })))
            .unwrap();
        self.surface.finish_loading();
        self.frame();
    }

    fn frame(&mut self) -> bool {
        if !self.scheduler.take_frame_request() {
            return false;
        }
        self.run(|c, ctx| c.on_animation_frame(ctx))
    }

    fn close_fully(&mut self) {
        assert!(self.run(|c, ctx| c.close(ctx)));
        assert!(self.scheduler.take(TimerId::CloseAnimation));
        self.run(|c, ctx| c.on_close_delay_elapsed(ctx)).unwrap();
    }
}

fn u(s: &str) -> Url {
    Url::parse(s).unwrap()
}

// ─── Open ───

#[test]
fn test_open_builds_overlay_and_requests_handshake() {
    let mut h = Harness::new();
    assert_eq!(h.open("https://a.test/page").unwrap(), OpenOutcome::Opened);

    assert_eq!(h.ctl.phase(), SessionPhase::Opening);
    assert!(h.surface.overlay_mounted);
    assert_eq!(h.surface.address, Some(u("https://a.test/page")));
    assert_eq!(h.surface.loading, Some(LoadingAnimation::Blue));
    let content = h.surface.content.as_ref().expect("content mounted");
    assert_eq!(content.kind, ContentKind::Iframe);
    assert_eq!(content.target, None, "target waits for the handshake");

    assert!(h.ctl.focus().scroll_lock().is_locked());
    assert!(h.ctl.focus().interaction_pause().is_paused());
    assert_eq!(
        h.ctl.take_outbound(),
        vec![Outbound::Request {
            generation: 1,
            message: RuntimeMessage::PrepareToPreview {
                url: "https://a.test/page".to_string()
            },
        }]
    );
}

#[test]
fn test_handshake_then_polling_reveals_content() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();

    assert!(h
        .run(|c, ctx| c.on_prepare_resolved(ctx, 1, Ok(PrepareResponse { ready: true })))
        .unwrap());
    assert_eq!(h.surface.content_target(), Some(&u("https://a.test/")));
    assert!(h.ctl.is_polling());

    assert!(!h.frame(), "still loading");
    assert!(!h.frame(), "another frame was requested");
    assert_eq!(h.ctl.phase(), SessionPhase::Opening);

    h.surface.finish_loading();
    assert!(h.frame());
    assert_eq!(h.ctl.phase(), SessionPhase::Ready);
    assert!(h.surface.content.as_ref().unwrap().revealed);
    assert!(!h.ctl.is_polling());
    assert_eq!(h.ctl.poll_count(), 3);
    assert!(h.scheduler.is_pending(TimerId::LoaderHide));

    h.run(|c, ctx| c.on_loader_hide(ctx));
    assert_eq!(h.surface.loading, None);
}

#[tokio::test(start_paused = true)]
async fn test_loader_stays_up_for_the_rest_of_the_minimum() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    tokio::time::advance(Duration::from_millis(400)).await;

    h.complete_load();
    assert_eq!(h.ctl.phase(), SessionPhase::Ready);
    assert_eq!(h.scheduler.delay_of(TimerId::LoaderHide), Some(Duration::from_millis(600)));

    h.run(|c, ctx| c.navigate(ctx, "https://a.test/other", false)).unwrap();
    tokio::time::advance(MIN_LOADING_DISPLAY * 2).await;
    h.complete_load();
    assert_eq!(h.scheduler.delay_of(TimerId::LoaderHide), Some(Duration::ZERO));
}

#[test]
fn test_stale_handshake_reply_is_dropped() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.run(|c, ctx| c.navigate(ctx, "https://b.test/", false)).unwrap();
    assert_eq!(h.ctl.render_generation(), 2);

    assert!(!h
        .run(|c, ctx| c.on_prepare_resolved(ctx, 1, Ok(PrepareResponse { ready: true })))
        .unwrap());
    assert_eq!(h.surface.content_target(), None);
}

#[test]
fn test_failed_handshake_raises_context_expired_dialog() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();

    h.run(|c, ctx| c.on_prepare_resolved(ctx, 1, Err(MessagingError::ContextInvalidated)))
        .unwrap();
    assert_eq!(h.surface.dialog, Some(DialogKind::ContextExpired));
    assert_eq!(h.surface.loading, None);
    assert!(h.ctl.phase().is_live(), "the session stays closable");

    assert!(h.run(|c, ctx| c.on_dialog_action(ctx, DialogAction::ReloadPage)));
    assert_eq!(h.surface.reloads, 1);
    assert_eq!(h.surface.dialog, None);
}

#[test]
fn test_not_ready_answer_counts_as_failure() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.run(|c, ctx| c.on_prepare_resolved(ctx, 1, Ok(PrepareResponse { ready: false })))
        .unwrap();
    assert_eq!(h.surface.dialog, Some(DialogKind::ContextExpired));
}

#[test]
fn test_images_skip_the_handshake() {
    let mut h = Harness::new();
    h.open("https://img.test/cat.png").unwrap();

    assert!(h.ctl.take_outbound().is_empty());
    assert_eq!(h.surface.content.as_ref().unwrap().kind, ContentKind::Image);
    assert!(h.frame());
    assert_eq!(h.ctl.phase(), SessionPhase::Ready);
}

#[test]
fn test_second_open_is_rejected() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    assert_eq!(h.open("https://b.test/").unwrap(), OpenOutcome::Rejected);
    assert_eq!(h.ctl.session().unwrap().current_url, u("https://a.test/"));
}

#[test]
fn test_insecure_open_warns_and_blocks_until_dismissed() {
    let mut h = Harness::new();
    assert_eq!(h.open("http://plain.test/").unwrap(), OpenOutcome::Warned);
    assert_eq!(h.ctl.phase(), SessionPhase::Idle);
    assert_eq!(
        h.surface.dialog,
        Some(DialogKind::InsecureLink {
            url: "http://plain.test/".to_string()
        })
    );
    assert_eq!(h.open("https://a.test/").unwrap(), OpenOutcome::Rejected);

    assert!(h.run(|c, ctx| c.on_dialog_action(ctx, DialogAction::OpenInNewTab)));
    assert_eq!(h.surface.opened_tabs, vec![u("http://plain.test/")]);
    assert_eq!(h.open("https://a.test/").unwrap(), OpenOutcome::Opened);
}

#[test]
fn test_open_without_body_fails_cleanly() {
    let mut h = Harness::new();
    h.surface = HeadlessSurface::without_body();
    let err = h.open("https://a.test/").unwrap_err();
    assert!(matches!(err, PreviewError::Precondition(SurfaceError::MissingBody)));
    assert_eq!(h.ctl.phase(), SessionPhase::Idle);
    assert!(!h.surface.overlay_mounted);
}

#[test]
fn test_open_rejects_unparseable_url() {
    let mut h = Harness::new();
    assert!(matches!(h.open("not a url"), Err(PreviewError::InvalidUrl(_))));
    assert_eq!(h.ctl.phase(), SessionPhase::Idle);
}

// ─── Navigation ───

#[test]
fn test_fragment_change_updates_in_place() {
    let mut h = Harness::new();
    h.open("https://a.test/doc").unwrap();
    h.complete_load();
    h.ctl.take_outbound();

    let outcome = h
        .run(|c, ctx| c.navigate(ctx, "https://a.test/doc#section-2", true))
        .unwrap();
    assert_eq!(outcome, NavigateOutcome::InPlace);
    assert_eq!(h.surface.content_mounts, 1, "content node kept");
    assert_eq!(h.surface.content_target(), Some(&u("https://a.test/doc#section-2")));
    assert!(h.ctl.take_outbound().is_empty());
    assert_eq!(h.ctl.history().unwrap().len(), 2);
    assert!(h.surface.nav.back_enabled);
}

#[test]
fn test_full_navigation_and_back_forward() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.complete_load();

    let outcome = h.run(|c, ctx| c.navigate(ctx, "https://b.test/", false)).unwrap();
    assert_eq!(outcome, NavigateOutcome::Full);
    assert_eq!(h.surface.content_mounts, 2);
    assert_eq!(h.surface.address, Some(u("https://b.test/")));

    assert!(h.run(|c, ctx| c.go_back(ctx)).unwrap());
    assert_eq!(h.ctl.session().unwrap().current_url, u("https://a.test/"));
    assert!(h.surface.nav.forward_enabled);
    assert_eq!(h.ctl.history().unwrap().len(), 2, "replays are not recorded");

    assert!(h.run(|c, ctx| c.go_forward(ctx)).unwrap());
    assert_eq!(h.ctl.session().unwrap().current_url, u("https://b.test/"));
    assert!(!h.run(|c, ctx| c.go_forward(ctx)).unwrap());
}

#[test]
fn test_insecure_navigation_warns_without_blocking_session() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    let outcome = h.run(|c, ctx| c.navigate(ctx, "http://plain.test/", true)).unwrap();
    assert_eq!(outcome, NavigateOutcome::Warned);
    assert_eq!(h.ctl.session().unwrap().current_url, u("https://a.test/"));
    assert!(!h.ctl.dialog().unwrap().from_open);
}

#[test]
fn test_navigate_without_session_is_ignored() {
    let mut h = Harness::new();
    let outcome = h.run(|c, ctx| c.navigate(ctx, "https://a.test/", false)).unwrap();
    assert_eq!(outcome, NavigateOutcome::Ignored);
}

// ─── Close ───

#[test]
fn test_close_plays_transition_then_tears_down() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.complete_load();
    h.ctl.take_outbound();

    assert!(h.run(|c, ctx| c.close(ctx)));
    assert_eq!(h.ctl.phase(), SessionPhase::Closing);
    assert!(h.surface.exit_transition_played);
    assert_eq!(h.scheduler.delay_of(TimerId::CloseAnimation), Some(CLOSE_DELAY));
    assert!(!h.run(|c, ctx| c.close(ctx)), "second close is a no-op");
    assert!(h.surface.overlay_mounted, "overlay stays until the delay elapses");

    assert!(h.scheduler.take(TimerId::CloseAnimation));
    assert!(h.run(|c, ctx| c.on_close_delay_elapsed(ctx)).unwrap());
    assert_eq!(h.ctl.phase(), SessionPhase::Idle);
    assert!(!h.surface.overlay_mounted);
    assert!(h.ctl.session().is_none());
    assert_eq!(h.ctl.take_outbound(), vec![Outbound::Send(RuntimeMessage::ClearPreview)]);
    assert_eq!(h.surface.focus_count, 1);
    assert!(h.surface.body_styles.is_empty());
    assert_eq!(h.surface.scroll, ScrollOffset::new(0.0, 300.0));
    assert!(!h.surface.backdrop_active);
}

#[test]
fn test_reopen_after_close() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.close_fully();
    assert_eq!(h.open("https://b.test/").unwrap(), OpenOutcome::Opened);
    assert_eq!(h.ctl.history().unwrap().len(), 1, "history is per session");
}

#[test]
fn test_close_key_and_dialog_precedence() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.run(|c, ctx| c.navigate(ctx, "http://plain.test/", false)).unwrap();

    assert!(h.run(|c, ctx| c.on_key_down(ctx, "Escape")));
    assert!(h.ctl.dialog().is_none());
    assert!(h.ctl.phase().is_live(), "first Escape only dismissed the dialog");

    assert!(!h.run(|c, ctx| c.on_key_down(ctx, "a")));
    assert!(h.run(|c, ctx| c.on_key_down(ctx, "Escape")));
    assert_eq!(h.ctl.phase(), SessionPhase::Closing);
}

// ─── Overlay chrome ───

#[test]
fn test_interceptor_click_closes_and_content_click_requests_focus() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.ctl.take_outbound();

    h.run(|c, ctx| c.on_overlay_click(ctx, HitRegion::Content)).unwrap();
    assert_eq!(h.ctl.take_outbound(), vec![Outbound::Send(RuntimeMessage::FocusPreview)]);
    assert!(h.ctl.phase().is_live());

    h.run(|c, ctx| c.on_overlay_click(ctx, HitRegion::Interceptor)).unwrap();
    assert_eq!(h.ctl.phase(), SessionPhase::Closing);
}

#[test]
fn test_copy_and_open_in_tab_buttons() {
    let mut h = Harness::new();
    h.open("https://a.test/x").unwrap();

    h.run(|c, ctx| c.on_chrome_button(ctx, ChromeButton::Copy)).unwrap();
    assert_eq!(h.surface.clipboard.as_deref(), Some("https://a.test/x"));
    assert!(h.surface.copy_feedback);
    h.run(|c, ctx| c.on_copy_feedback_elapsed(ctx));
    assert!(!h.surface.copy_feedback);

    h.run(|c, ctx| c.on_chrome_button(ctx, ChromeButton::OpenInTab)).unwrap();
    assert_eq!(h.surface.opened_tabs, vec![u("https://a.test/x")]);
    assert_eq!(h.ctl.phase(), SessionPhase::Closing);
}

#[test]
fn test_drag_leaves_stage_and_restore_returns() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    assert!(h.surface.backdrop_active);

    let grab = PointerEvent::on_overlay(Point::new(200.0, 50.0), HitRegion::AddressBar);
    assert!(h.run(|c, ctx| c.on_pointer_down(ctx, &grab)).unwrap());
    assert!(h.ctl.session().unwrap().is_dragging);
    h.run(|c, ctx| c.on_pointer_move(ctx, Point::new(180.0, 70.0))).unwrap();
    assert!(h.run(|c, ctx| c.on_pointer_up(ctx)).unwrap());

    let persisted = h.ctl.take_persist();
    assert!(persisted.contains(&("userTop".to_string(), json!("60px"))));
    assert!(persisted.contains(&("isExpanded".to_string(), json!(false))));
    assert!(!h.ctl.focus().interaction_pause().is_paused());
    assert!(!h.surface.backdrop_active);
    assert!(!h.ctl.session().unwrap().is_dragging);

    h.run(|c, ctx| c.on_chrome_button(ctx, ChromeButton::Restore)).unwrap();
    assert!(h.ctl.geometry().unwrap().is_centered_stage());
    assert!(h.ctl.focus().interaction_pause().is_paused());
    assert!(h.ctl.take_persist().contains(&("isExpanded".to_string(), json!(true))));
}

// ─── Iframe messages and focus ───

#[test]
fn test_iframe_messages() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();

    h.run(|c, ctx| c.on_runtime_message(ctx, &RuntimeMessage::IFrameHasFocus))
        .unwrap();
    assert_eq!(h.ctl.focus().state(), FocusState::PreviewFocused);
    assert!(h.ctl.session().unwrap().is_focused);

    h.run(|c, ctx| {
        c.on_runtime_message(
            ctx,
            &RuntimeMessage::UpdatePreviewUrl {
                url: "https://a.test/next".to_string(),
            },
        )
    })
    .unwrap();
    assert_eq!(h.ctl.session().unwrap().current_url, u("https://a.test/next"));

    h.run(|c, ctx| c.on_runtime_message(ctx, &RuntimeMessage::ClosePreviewFromIframe))
        .unwrap();
    assert_eq!(h.ctl.phase(), SessionPhase::Closing);
}

#[test]
fn test_window_focus_returns_focus_to_parent() {
    let mut h = Harness::new();
    h.open("https://a.test/").unwrap();
    h.run(|c, ctx| c.on_runtime_message(ctx, &RuntimeMessage::IFrameHasFocus))
        .unwrap();

    h.run(|c, ctx| c.on_window_focus(ctx)).unwrap();
    assert_eq!(h.ctl.focus().state(), FocusState::ParentFocused);
    assert!(!h.ctl.session().unwrap().is_focused);
    assert!(h.ctl.focus().scroll_lock().is_locked(), "stage keeps the page locked");
}

#[test]
fn test_loading_animation_turned_off_mid_load() {
    let mut h = Harness::new();
    h.open("https://img.test/a.gif").unwrap();
    assert!(h.surface.loading.is_some());

    h.settings.loading_animation = LoadingAnimation::Off;
    h.run(|c, ctx| c.on_settings_changed(ctx, &["loadingAnimation".to_string()]));
    assert_eq!(h.surface.loading, None);
}
