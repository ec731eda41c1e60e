//! Tests for the tokio actors wiring the content, iframe and background
//! contexts together. Time is paused so timers and frame callbacks advance
//! deterministically.

use std::time::Duration;

use tokio::sync::mpsc;

use link_previewer::app::ContentEvent;
use link_previewer::database::Database;
use link_previewer::platform::HeadlessSurface;
use link_previewer::services::background::{BackgroundCoordinator, Reply};
use link_previewer::services::iframe_agent::IframeAgent;
use link_previewer::services::runtime::{BackgroundActor, ContentActor, IframeContext, TokioScheduler};
use link_previewer::services::scheduler::{Scheduler, TimerId};
use link_previewer::services::settings_engine::SettingsEngine;
use link_previewer::types::errors::MessagingError;
use link_previewer::types::input::LinkTarget;
use link_previewer::types::message::{PrepareResponse, RuntimeMessage, TabId};
use link_previewer::types::session::SessionPhase;
use link_previewer::types::settings::PreviewSettings;

fn settings() -> SettingsEngine {
    SettingsEngine::new(Database::open_in_memory().unwrap())
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// === Scheduler ===

#[tokio::test(start_paused = true)]
async fn test_scheduler_fires_timer_after_delay() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scheduler = TokioScheduler::new(tx);
    scheduler.schedule(TimerId::LongPress, Duration::from_millis(500));

    settle(499).await;
    assert!(rx.try_recv().is_err());
    settle(2).await;
    assert_eq!(rx.try_recv().unwrap(), ContentEvent::Timer(TimerId::LongPress));
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_cancel_and_reschedule() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scheduler = TokioScheduler::new(tx);

    scheduler.schedule(TimerId::CopyFeedback, Duration::from_millis(100));
    scheduler.cancel(TimerId::CopyFeedback);
    scheduler.schedule(TimerId::LoaderHide, Duration::from_millis(100));
    scheduler.schedule(TimerId::LoaderHide, Duration::from_millis(300));

    settle(1000).await;
    assert_eq!(rx.try_recv().unwrap(), ContentEvent::Timer(TimerId::LoaderHide));
    assert!(rx.try_recv().is_err(), "cancelled and replaced timers stay silent");
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_frame_request() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scheduler = TokioScheduler::new(tx);
    scheduler.request_frame();
    assert_eq!(rx.recv().await, Some(ContentEvent::AnimationFrame));
}

// === Background ===

#[tokio::test(start_paused = true)]
async fn test_background_prepare_installs_rule() {
    let (bg, join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    let response = bg.prepare(TabId(1), "https://a.test/page").await.unwrap();
    assert_eq!(response, PrepareResponse { ready: true });

    let reply = bg.request(TabId(1), RuntimeMessage::ClearPreview).await.unwrap();
    assert_eq!(reply, Reply::Ack);
    bg.send(TabId(1), RuntimeMessage::Preconnect {
        url: "https://b.test/x".into(),
    })
    .unwrap();

    drop(bg);
    let coordinator = join.await.unwrap();
    assert!(coordinator.rule_for(TabId(1)).is_none());
    assert_eq!(coordinator.preconnected().collect::<Vec<_>>(), vec!["https://b.test"]);
}

#[tokio::test(start_paused = true)]
async fn test_invalidated_background_refuses_prepare() {
    let (bg, _join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    bg.invalidate().unwrap();
    assert_eq!(
        bg.prepare(TabId(1), "https://a.test/").await,
        Err(MessagingError::ContextInvalidated)
    );
}

#[tokio::test(start_paused = true)]
async fn test_stopped_background_invalidates_requests() {
    let (bg, join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    join.abort();
    let _ = join.await;
    assert_eq!(
        bg.prepare(TabId(1), "https://a.test/").await,
        Err(MessagingError::ContextInvalidated)
    );
    assert_eq!(
        bg.send(TabId(1), RuntimeMessage::ClearPreview),
        Err(MessagingError::ContextInvalidated)
    );
}

#[tokio::test(start_paused = true)]
async fn test_forward_without_content_context_fails() {
    let (bg, _join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    let result = bg
        .request(TabId(9), RuntimeMessage::ClosePreviewFromIframe)
        .await;
    assert_eq!(result, Err(MessagingError::ContextInvalidated));
}

// === Content actor ===

#[tokio::test(start_paused = true)]
async fn test_content_actor_opens_and_polls() {
    let (bg, bg_join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    let (actor, content) = ContentActor::new(TabId(4), HeadlessSurface::default(), settings(), bg.clone());
    let running = tokio::spawn(actor.run());

    content
        .send(ContentEvent::OpenRequested("https://a.test/doc".into()))
        .unwrap();
    settle(100).await;
    content.shutdown().unwrap();
    let app = running.await.unwrap();

    assert_eq!(app.controller().phase(), SessionPhase::Opening);
    assert!(app.controller().is_polling(), "headless content never finishes loading");
    assert!(app.controller().poll_count() > 1);
    assert_eq!(app.surface().content_target().map(|u| u.as_str()), Some("https://a.test/doc"));

    drop(bg);
    drop(app);
    let coordinator = bg_join.await.unwrap();
    assert_eq!(coordinator.rule_for(TabId(4)).unwrap().host, "a.test");
}

#[tokio::test(start_paused = true)]
async fn test_iframe_close_reaches_content_and_clears_rule() {
    let (bg, bg_join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    let (actor, content) = ContentActor::new(TabId(2), HeadlessSurface::default(), settings(), bg.clone());
    let running = tokio::spawn(actor.run());

    content
        .send(ContentEvent::OpenRequested("https://a.test/".into()))
        .unwrap();
    settle(50).await;

    let iframe = IframeContext::new(TabId(2), IframeAgent::new(&PreviewSettings::default()), bg.clone());
    assert!(!iframe.key_down("a").unwrap());
    assert!(iframe.key_down("Escape").unwrap());
    settle(500).await;

    content.shutdown().unwrap();
    let app = running.await.unwrap();
    assert_eq!(app.controller().phase(), SessionPhase::Idle);
    assert!(!app.surface().overlay_mounted);

    drop((bg, iframe, app));
    let coordinator = bg_join.await.unwrap();
    assert!(coordinator.rule_for(TabId(2)).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_iframe_link_press_is_taken_over() {
    let (bg, _join) = BackgroundActor::spawn(BackgroundCoordinator::new());
    let (actor, content) = ContentActor::new(TabId(3), HeadlessSurface::default(), settings(), bg.clone());
    let running = tokio::spawn(actor.run());
    content
        .send(ContentEvent::OpenRequested("https://a.test/".into()))
        .unwrap();
    settle(50).await;

    let iframe = IframeContext::new(TabId(3), IframeAgent::default(), bg.clone());
    let link = LinkTarget::new("https://a.test/next");
    assert!(iframe.pointer_down(Some(&link)).unwrap());
    assert!(!iframe.pointer_down(None).unwrap());
    settle(50).await;

    content.shutdown().unwrap();
    let app = running.await.unwrap();
    assert_eq!(
        app.controller().session().unwrap().current_url.as_str(),
        "https://a.test/next"
    );
}
