//! Unit tests for the background request handler.

use std::sync::Mutex;

use serde_json::{json, Value};
use tempfile::TempDir;

use link_previewer::rpc_handler::{handle_message, BackgroundState};
use link_previewer::services::background::FOCUS_REQUEST_CAPACITY;
use link_previewer::services::settings_engine::SettingsEngine;

fn state(dir: &TempDir) -> Mutex<BackgroundState> {
    let engine = SettingsEngine::open(Some(dir.path().join("storage.db"))).unwrap();
    Mutex::new(BackgroundState::new(engine))
}

fn call(state: &Mutex<BackgroundState>, method: &str, params: Value) -> Result<Value, String> {
    handle_message(state, method, &params)
}

#[test]
fn test_ping_and_unknown_method() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    assert_eq!(call(&s, "ping", json!({})).unwrap(), json!({"pong": true}));
    assert_eq!(
        call(&s, "tabs.list", json!({})).unwrap_err(),
        "unknown method: tabs.list"
    );
}

// ─── Runtime messages ───

#[test]
fn test_prepare_installs_rule_and_clear_removes_it() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);

    let reply = call(&s, "prepareToPreview", json!({"tab": 5, "url": "https://a.test/p"})).unwrap();
    assert_eq!(reply, json!({"ready": true}));

    let rules = call(&s, "rules.list", json!({})).unwrap();
    assert_eq!(
        rules,
        json!([{
            "id": 1,
            "tab": 5,
            "host": "a.test",
            "removedHeaders": ["x-frame-options", "content-security-policy"]
        }])
    );

    assert_eq!(call(&s, "clearPreview", json!({"tab": 5})).unwrap(), json!({"ok": true}));
    assert_eq!(call(&s, "rules.list", json!({})).unwrap(), json!([]));
}

#[test]
fn test_preconnect_reports_fresh_origins() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    let first = call(&s, "preconnect", json!({"tab": 1, "url": "https://b.test/one"})).unwrap();
    assert_eq!(first, json!({"ok": true, "fresh": true}));
    let again = call(&s, "preconnect", json!({"tab": 2, "url": "https://b.test/two"})).unwrap();
    assert_eq!(again["fresh"], json!(false));
    assert_eq!(call(&s, "preconnect.list", json!({})).unwrap(), json!(["https://b.test"]));
}

#[test]
fn test_iframe_messages_are_forwarded() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    let reply = call(&s, "updatePreviewUrl", json!({"tab": 3, "url": "https://a.test/n"})).unwrap();
    assert_eq!(
        reply,
        json!({"forward": {"action": "updatePreviewUrl", "url": "https://a.test/n"}, "tab": 3})
    );
    let reply = call(&s, "closePreviewFromIframe", json!({"tab": 3})).unwrap();
    assert_eq!(reply["forward"], json!({"action": "closePreviewFromIframe"}));
}

#[test]
fn test_focus_requests_are_recorded() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    call(&s, "focusPreview", json!({"tab": 8})).unwrap();
    call(&s, "focusPreview", json!({"tab": 2})).unwrap();
    assert_eq!(call(&s, "focus.list", json!({})).unwrap(), json!([8, 2]));
}

#[test]
fn test_focus_list_stays_bounded() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    for _ in 0..10_000 {
        call(&s, "focusPreview", json!({"tab": 1})).unwrap();
    }
    call(&s, "focusPreview", json!({"tab": 7})).unwrap();

    let list = call(&s, "focus.list", json!({})).unwrap();
    let tabs = list.as_array().unwrap();
    assert_eq!(tabs.len(), FOCUS_REQUEST_CAPACITY);
    assert_eq!(tabs.last(), Some(&json!(7)));
}

#[test]
fn test_bad_params_are_rejected() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    assert_eq!(call(&s, "clearPreview", json!({})).unwrap_err(), "missing tab");
    assert_eq!(call(&s, "prepareToPreview", json!({"tab": 1})).unwrap_err(), "missing url");
    assert_eq!(
        call(&s, "clearPreview", json!({"tab": 1u64 << 40})).unwrap_err(),
        format!("invalid tab: {}", 1u64 << 40)
    );
    assert!(call(&s, "prepareToPreview", json!({"tab": 1, "url": "not a url"})).is_err());
}

// ─── Settings ───

#[test]
fn test_settings_get_set_reset() {
    let dir = TempDir::new().unwrap();
    let s = state(&dir);
    assert_eq!(call(&s, "settings.get", json!({})).unwrap()["closeKey"], json!("Escape"));

    let reply = call(&s, "settings.set", json!({"key": "closeKey", "value": "q"})).unwrap();
    assert_eq!(reply["ok"], json!(true));
    assert_eq!(reply["changes"][0]["key"], json!("closeKey"));
    assert_eq!(call(&s, "settings.get", json!({})).unwrap()["closeKey"], json!("q"));

    assert!(call(&s, "settings.set", json!({"key": "bogus", "value": 1})).is_err());
    assert_eq!(call(&s, "settings.set", json!({"value": 1})).unwrap_err(), "missing key");

    call(&s, "settings.reset", json!({})).unwrap();
    assert_eq!(call(&s, "settings.get", json!({})).unwrap()["closeKey"], json!("Escape"));
}
