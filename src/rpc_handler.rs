//! Request handler for the background coordinator protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdin.
//! Requests carry a `method` (a runtime message action or a maintenance
//! method) and `params`; message actions take the sending `tab` and, where
//! the action needs one, a `url`.

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::services::background::{BackgroundCoordinator, Reply};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::message::{RuntimeMessage, TabId};

/// Everything the background process owns.
pub struct BackgroundState {
    pub coordinator: BackgroundCoordinator,
    pub settings: SettingsEngine,
}

impl BackgroundState {
    pub fn new(settings: SettingsEngine) -> Self {
        Self {
            coordinator: BackgroundCoordinator::new(),
            settings,
        }
    }
}

fn tab_param(params: &Value) -> Result<TabId, String> {
    let tab = params.get("tab").and_then(|v| v.as_u64()).ok_or("missing tab")?;
    u32::try_from(tab).map(TabId).map_err(|_| format!("invalid tab: {}", tab))
}

fn url_param(params: &Value) -> Result<String, String> {
    params
        .get("url")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| "missing url".to_string())
}

/// Builds the runtime message named by `method`, if it is one.
fn message_for(method: &str, params: &Value) -> Result<Option<RuntimeMessage>, String> {
    let message = match method {
        "prepareToPreview" => RuntimeMessage::PrepareToPreview { url: url_param(params)? },
        "clearPreview" => RuntimeMessage::ClearPreview,
        "preconnect" => RuntimeMessage::Preconnect { url: url_param(params)? },
        "updatePreviewUrl" => RuntimeMessage::UpdatePreviewUrl { url: url_param(params)? },
        "iFrameHasFocus" => RuntimeMessage::IFrameHasFocus,
        "focusPreview" => RuntimeMessage::FocusPreview,
        "closePreviewFromIframe" => RuntimeMessage::ClosePreviewFromIframe,
        _ => return Ok(None),
    };
    Ok(Some(message))
}

/// Dispatch one request.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Iframe messages come back as `{"forward": <message>, "tab": n}` so the
/// caller can deliver them to the content context of that tab.
pub fn handle_message(state: &Mutex<BackgroundState>, method: &str, params: &Value) -> Result<Value, String> {
    if let Some(message) = message_for(method, params)? {
        let tab = tab_param(params)?;
        if let RuntimeMessage::Preconnect { url } = &message {
            // The caller warms the origin up only when it is new.
            let mut s = state.lock().map_err(|e| e.to_string())?;
            let fresh = s.coordinator.preconnect(url).map_err(|e| e.to_string())?;
            return Ok(json!({"ok": true, "fresh": fresh}));
        }
        let mut s = state.lock().map_err(|e| e.to_string())?;
        let reply = s.coordinator.handle(tab, &message).map_err(|e| e.to_string())?;
        return match reply {
            Reply::Prepared(response) => serde_json::to_value(response).map_err(|e| e.to_string()),
            Reply::Ack => Ok(json!({"ok": true})),
            Reply::Forward(forwarded) => {
                let message = serde_json::to_value(forwarded).map_err(|e| e.to_string())?;
                Ok(json!({"forward": message, "tab": tab.0}))
            }
        };
    }

    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Coordinator state ───
        "rules.list" => {
            let s = state.lock().map_err(|e| e.to_string())?;
            let rules: Vec<Value> = s
                .coordinator
                .rules()
                .map(|r| json!({"id": r.id, "tab": r.tab.0, "host": r.host, "removedHeaders": r.removed_headers}))
                .collect();
            Ok(json!(rules))
        }
        "preconnect.list" => {
            let s = state.lock().map_err(|e| e.to_string())?;
            let origins: Vec<&str> = s.coordinator.preconnected().collect();
            Ok(json!(origins))
        }
        "focus.list" => {
            let s = state.lock().map_err(|e| e.to_string())?;
            let tabs: Vec<u32> = s.coordinator.focus_requests().map(|t| t.0).collect();
            Ok(json!(tabs))
        }

        // ─── Settings ───
        "settings.get" => {
            let s = state.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(s.settings.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut s = state.lock().map_err(|e| e.to_string())?;
            let changes = s.settings.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "changes": changes}))
        }
        "settings.reset" => {
            let mut s = state.lock().map_err(|e| e.to_string())?;
            let changes = s.settings.reset().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "changes": changes}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
