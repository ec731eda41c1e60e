//! Unit tests for pointer trigger classification and hover preconnect.

use std::time::Duration;

use rstest::rstest;

use link_previewer::managers::trigger_manager::{ClickOutcome, PointerDownOutcome, TriggerManager};
use link_previewer::services::debounce::DEFAULT_DEBOUNCE;
use link_previewer::services::scheduler::{DebounceKey, ManualScheduler, TimerId};
use link_previewer::types::geometry::Point;
use link_previewer::types::input::{ClickEvent, LinkTarget, Modifiers, MouseButton, PointerEvent};
use link_previewer::types::session::SessionPhase;
use link_previewer::types::settings::{ModifierKey, PreviewSettings};

fn press(href: &str) -> PointerEvent {
    PointerEvent::on_host(Point::new(10.0, 10.0), Some(LinkTarget::new(href)))
}

// ─── Pointer down ───

#[test]
fn test_plain_press_arms_long_press() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let settings = PreviewSettings::default();

    let outcome = t.on_pointer_down(&mut s, &press("https://a.test/"), &settings, false, SessionPhase::Idle);
    assert_eq!(outcome, PointerDownOutcome::Armed);
    assert!(t.is_armed());
    assert_eq!(s.delay_of(TimerId::LongPress), Some(Duration::from_millis(500)));

    assert_eq!(t.on_long_press_elapsed(), Some("https://a.test/".to_string()));
    assert!(!t.is_armed());
}

#[test]
fn test_release_before_threshold_cancels() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    t.on_pointer_down(&mut s, &press("https://a.test/"), &PreviewSettings::default(), false, SessionPhase::Idle);

    t.on_pointer_up(&mut s);
    assert!(!s.is_pending(TimerId::LongPress));
    assert_eq!(t.on_long_press_elapsed(), None);
}

#[rstest]
#[case(ModifierKey::Shift)]
#[case(ModifierKey::Ctrl)]
#[case(ModifierKey::Alt)]
#[case(ModifierKey::Meta)]
fn test_configured_modifier_opens_immediately(#[case] key: ModifierKey) {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let settings = PreviewSettings {
        modifier: key,
        ..PreviewSettings::default()
    };
    let ev = press("https://a.test/").with_modifiers(Modifiers::with(key));

    let outcome = t.on_pointer_down(&mut s, &ev, &settings, false, SessionPhase::Idle);
    assert_eq!(
        outcome,
        PointerDownOutcome::OpenNow {
            url: "https://a.test/".to_string()
        }
    );
    assert!(!s.is_pending(TimerId::LongPress));
}

#[test]
fn test_other_modifier_only_arms() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let ev = press("https://a.test/").with_modifiers(Modifiers::with(ModifierKey::Alt));
    let outcome = t.on_pointer_down(&mut s, &ev, &PreviewSettings::default(), false, SessionPhase::Idle);
    assert_eq!(outcome, PointerDownOutcome::Armed);
}

#[rstest]
#[case("")]
#[case("javascript:void(0)")]
#[case("  JavaScript:alert(1)")]
fn test_unpreviewable_links_are_ignored(#[case] href: &str) {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let outcome = t.on_pointer_down(&mut s, &press(href), &PreviewSettings::default(), false, SessionPhase::Idle);
    assert_eq!(outcome, PointerDownOutcome::Ignore);
    assert_eq!(s.pending_count(), 0);
}

#[test]
fn test_ignored_when_disabled_busy_or_not_primary() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let settings = PreviewSettings::default();

    let ev = press("https://a.test/");
    assert_eq!(t.on_pointer_down(&mut s, &ev, &settings, true, SessionPhase::Idle), PointerDownOutcome::Ignore);
    assert_eq!(t.on_pointer_down(&mut s, &ev, &settings, false, SessionPhase::Ready), PointerDownOutcome::Ignore);
    let mut middle = ev.clone();
    middle.button = MouseButton::Middle;
    assert_eq!(t.on_pointer_down(&mut s, &middle, &settings, false, SessionPhase::Idle), PointerDownOutcome::Ignore);
    let no_link = PointerEvent::on_host(Point::new(0.0, 0.0), None);
    assert_eq!(t.on_pointer_down(&mut s, &no_link, &settings, false, SessionPhase::Idle), PointerDownOutcome::Ignore);
}

// ─── Click ───

#[test]
fn test_click_classification() {
    let t = TriggerManager::new();
    let settings = PreviewSettings::default();
    let link = Some(LinkTarget::new("https://b.test/"));

    let modifier_click = ClickEvent {
        link: link.clone(),
        modifiers: Modifiers::with(ModifierKey::Shift),
    };
    assert_eq!(t.on_click(&modifier_click, &settings, SessionPhase::Idle), ClickOutcome::Suppress);

    let plain = ClickEvent {
        link: link.clone(),
        modifiers: Modifiers::none(),
    };
    assert_eq!(t.on_click(&plain, &settings, SessionPhase::Idle), ClickOutcome::Default);
    assert_eq!(t.on_click(&plain, &settings, SessionPhase::Opening), ClickOutcome::Default);
    assert_eq!(
        t.on_click(&plain, &settings, SessionPhase::Ready),
        ClickOutcome::Redirect {
            url: "https://b.test/".to_string()
        }
    );

    let no_link = ClickEvent {
        link: None,
        modifiers: Modifiers::none(),
    };
    assert_eq!(t.on_click(&no_link, &settings, SessionPhase::Ready), ClickOutcome::Default);
}

// ─── Hover preconnect ───

#[test]
fn test_hover_debounces_preconnect() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let a = LinkTarget::new("https://a.test/");
    let b = LinkTarget::new("https://b.test/");

    assert!(t.on_mouse_over(&mut s, Some(&a), false));
    assert!(!t.on_mouse_over(&mut s, Some(&a), false), "same link does not restart");
    assert!(t.on_mouse_over(&mut s, Some(&b), false));
    let timer = TimerId::Debounce(DebounceKey::Preconnect);
    assert_eq!(s.delay_of(timer), Some(DEFAULT_DEBOUNCE));

    assert_eq!(t.on_preconnect_elapsed(), Some("https://b.test/".to_string()));
    assert_eq!(t.on_preconnect_elapsed(), None);
}

#[test]
fn test_mouse_out_cancels_preconnect() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    let a = LinkTarget::new("https://a.test/");
    t.on_mouse_over(&mut s, Some(&a), false);

    t.on_mouse_out(&mut s, Some(&a));
    assert!(!s.is_pending(TimerId::Debounce(DebounceKey::Preconnect)));
    assert_eq!(t.on_preconnect_elapsed(), None);
    assert!(t.on_mouse_over(&mut s, Some(&a), false), "re-entering the link hovers again");
}

#[test]
fn test_hover_on_disabled_site_does_nothing() {
    let mut s = ManualScheduler::new();
    let mut t = TriggerManager::new();
    assert!(!t.on_mouse_over(&mut s, Some(&LinkTarget::new("https://a.test/")), true));
    assert!(!t.on_mouse_over(&mut s, None, false));
    assert_eq!(s.pending_count(), 0);
}
