use serde::{Deserialize, Serialize};

/// Persisted preview settings.
///
/// Field names serialize to the camelCase storage keys shared with the
/// options page, e.g. `closeKey`, `disabledSites`, `userWidth`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewSettings {
    /// Long-press threshold in milliseconds.
    pub duration: u64,
    pub modifier: ModifierKey,
    pub theme: Theme,
    pub close_key: String,
    pub width: String,
    pub height: String,
    pub top: String,
    pub left: String,
    pub user_width: String,
    pub user_height: String,
    pub user_top: String,
    pub user_left: String,
    pub is_expanded: bool,
    pub disabled_sites: Vec<String>,
    pub loading_animation: LoadingAnimation,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            duration: 500,
            modifier: ModifierKey::Shift,
            theme: Theme::Light,
            close_key: "Escape".to_string(),
            width: "90vw".to_string(),
            height: "90vh".to_string(),
            top: "50%".to_string(),
            left: "50%".to_string(),
            user_width: "640px".to_string(),
            user_height: "800px".to_string(),
            user_top: "10%".to_string(),
            user_left: "50%".to_string(),
            is_expanded: false,
            disabled_sites: Vec::new(),
            loading_animation: LoadingAnimation::Blue,
        }
    }
}

impl PreviewSettings {
    /// Every storage key understood by the settings store.
    pub const KEYS: [&'static str; 15] = [
        "duration",
        "modifier",
        "theme",
        "closeKey",
        "width",
        "height",
        "top",
        "left",
        "userWidth",
        "userHeight",
        "userTop",
        "userLeft",
        "isExpanded",
        "disabledSites",
        "loadingAnimation",
    ];

    /// Returns true if previews are disabled on the given hostname.
    pub fn is_site_disabled(&self, host: &str) -> bool {
        self.disabled_sites.iter().any(|site| site == host)
    }
}

/// Modifier key that opens a preview immediately on pointer-down.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModifierKey {
    #[serde(rename = "shiftKey")]
    Shift,
    #[serde(rename = "ctrlKey")]
    Ctrl,
    #[serde(rename = "altKey")]
    Alt,
    #[serde(rename = "metaKey")]
    Meta,
}

/// Color theme of the overlay chrome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn class_name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Address-bar loading animation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadingAnimation {
    Blue,
    Orange,
    Magenta,
    Off,
}

impl LoadingAnimation {
    /// CSS class applied to the address bar, `None` when disabled.
    pub fn class_name(&self) -> Option<&'static str> {
        match self {
            LoadingAnimation::Blue => Some("ocean-blue"),
            LoadingAnimation::Orange => Some("ocean-orange"),
            LoadingAnimation::Magenta => Some("ocean-magenta"),
            LoadingAnimation::Off => None,
        }
    }
}

/// A single key change reported by the settings store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsChange {
    pub key: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: serde_json::Value,
}
