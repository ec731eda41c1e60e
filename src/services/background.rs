// Link previewer background coordinator
// Serves the content and iframe contexts of every tab: installs per-tab
// header rules before a preview loads, tracks preconnect origins and focus
// requests, and forwards iframe messages to the content context.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::errors::MessagingError;
use crate::types::message::{PrepareResponse, Route, RuntimeMessage, TabId};

/// Response headers stripped from sub-frame responses of the previewed host.
pub const STRIPPED_HEADERS: [&str; 2] = ["x-frame-options", "content-security-policy"];

/// How many preconnected origins are remembered.
pub const PRECONNECT_CAPACITY: usize = 32;

/// How many recent focus requests are remembered.
pub const FOCUS_REQUEST_CAPACITY: usize = 64;

/// A header-rewriting rule scoped to one tab's preview.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeaderRule {
    pub id: u32,
    pub tab: TabId,
    pub host: String,
    pub removed_headers: Vec<String>,
}

/// Outcome of a message handled by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Prepared(PrepareResponse),
    Ack,
    /// Deliver this message to the content context of the sending tab.
    Forward(RuntimeMessage),
}

#[derive(Debug, Default)]
pub struct BackgroundCoordinator {
    next_rule_id: u32,
    rules: BTreeMap<TabId, HeaderRule>,
    preconnected: VecDeque<String>,
    focus_requests: VecDeque<TabId>,
    invalidated: bool,
}

impl BackgroundCoordinator {
    pub fn new() -> Self {
        Self {
            next_rule_id: 1,
            ..Self::default()
        }
    }

    fn check_alive(&self) -> Result<(), MessagingError> {
        if self.invalidated {
            Err(MessagingError::ContextInvalidated)
        } else {
            Ok(())
        }
    }

    /// Installs the header rule for `tab`, replacing any earlier one.
    pub fn prepare_to_preview(&mut self, tab: TabId, url: &str) -> Result<PrepareResponse, MessagingError> {
        self.check_alive()?;
        let parsed = Url::parse(url).map_err(|e| MessagingError::Protocol(format!("bad url {}: {}", url, e)))?;
        let Some(host) = parsed.host_str() else {
            return Err(MessagingError::Protocol(format!("url has no host: {}", url)));
        };

        let rule = HeaderRule {
            id: self.next_rule_id,
            tab,
            host: host.to_string(),
            removed_headers: STRIPPED_HEADERS.iter().map(|h| h.to_string()).collect(),
        };
        self.next_rule_id += 1;
        if let Some(old) = self.rules.insert(tab, rule) {
            debug!(%tab, rule = old.id, "replaced header rule");
        }
        info!(%tab, %host, "prepared preview");
        Ok(PrepareResponse { ready: true })
    }

    /// Removes the tab's header rule. Returns whether one existed.
    pub fn clear_preview(&mut self, tab: TabId) -> bool {
        let removed = self.rules.remove(&tab).is_some();
        debug!(%tab, removed, "cleared preview");
        removed
    }

    /// Records a preconnect target by origin. Returns true if the origin is
    /// new and should be warmed up.
    pub fn preconnect(&mut self, url: &str) -> Result<bool, MessagingError> {
        self.check_alive()?;
        let parsed = Url::parse(url).map_err(|e| MessagingError::Protocol(format!("bad url {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Ok(false);
        }
        let origin = parsed.origin().ascii_serialization();
        if self.preconnected.iter().any(|o| *o == origin) {
            return Ok(false);
        }
        if self.preconnected.len() == PRECONNECT_CAPACITY {
            self.preconnected.pop_front();
        }
        self.preconnected.push_back(origin);
        Ok(true)
    }

    /// Records a focus request, keeping only the most recent ones.
    pub fn focus_preview(&mut self, tab: TabId) {
        if self.focus_requests.len() == FOCUS_REQUEST_CAPACITY {
            self.focus_requests.pop_front();
        }
        self.focus_requests.push_back(tab);
    }

    /// Simulates an extension reload: every later request fails.
    pub fn invalidate(&mut self) {
        warn!("background context invalidated");
        self.invalidated = true;
        self.rules.clear();
    }

    pub fn rule_for(&self, tab: TabId) -> Option<&HeaderRule> {
        self.rules.get(&tab)
    }

    pub fn rules(&self) -> impl Iterator<Item = &HeaderRule> {
        self.rules.values()
    }

    pub fn preconnected(&self) -> impl Iterator<Item = &str> {
        self.preconnected.iter().map(String::as_str)
    }

    /// Recent focus requests, oldest first.
    pub fn focus_requests(&self) -> impl Iterator<Item = TabId> + '_ {
        self.focus_requests.iter().copied()
    }

    /// Dispatches one message sent from `tab`.
    pub fn handle(&mut self, tab: TabId, message: &RuntimeMessage) -> Result<Reply, MessagingError> {
        if message.route() == Route::IframeToContent {
            self.check_alive()?;
            return Ok(Reply::Forward(message.clone()));
        }
        match message {
            RuntimeMessage::PrepareToPreview { url } => self.prepare_to_preview(tab, url).map(Reply::Prepared),
            RuntimeMessage::ClearPreview => {
                self.clear_preview(tab);
                Ok(Reply::Ack)
            }
            RuntimeMessage::Preconnect { url } => {
                self.preconnect(url)?;
                Ok(Reply::Ack)
            }
            RuntimeMessage::FocusPreview => {
                self.focus_preview(tab);
                Ok(Reply::Ack)
            }
            other => Err(MessagingError::Protocol(format!(
                "unexpected message for background: {}",
                other.action()
            ))),
        }
    }
}
