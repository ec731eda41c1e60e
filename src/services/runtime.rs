//! Tokio runtime for the three execution contexts.
//!
//! Each context is an actor with its own queue and no shared state:
//! - [`BackgroundActor`] owns the [`BackgroundCoordinator`] and routes
//!   iframe-originated messages to the content actor of the same tab.
//! - [`ContentActor`] owns one [`App`] and handles its events strictly one at
//!   a time. Timers, animation frames and handshake replies are fed back into
//!   the same queue.
//! - [`IframeContext`] turns iframe input into messages for the background.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::background::{BackgroundCoordinator, Reply};
use super::iframe_agent::IframeAgent;
use super::scheduler::{Scheduler, TimerId};
use super::settings_engine::SettingsEngine;
use crate::app::{App, ContentEvent};
use crate::platform::Surface;
use crate::types::errors::MessagingError;
use crate::types::input::LinkTarget;
use crate::types::message::{Outbound, PrepareResponse, RuntimeMessage, TabId};
use crate::types::settings::SettingsChange;

/// How long a request waits for the background before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Cadence of animation-frame callbacks.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

// === Scheduler ===

/// [`Scheduler`] backed by tokio sleeps that post back into a content queue.
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<ContentEvent>,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: mpsc::UnboundedSender<ContentEvent>) -> Self {
        Self {
            events,
            timers: HashMap::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, timer: TimerId, delay: Duration) {
        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ContentEvent::Timer(timer));
        });
        if let Some(previous) = self.timers.insert(timer, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
        }
    }

    fn request_frame(&mut self) {
        let tx = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(FRAME_INTERVAL).await;
            let _ = tx.send(ContentEvent::AnimationFrame);
        });
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

// === Background ===

enum BackgroundCommand {
    Deliver {
        tab: TabId,
        message: RuntimeMessage,
        reply: Option<oneshot::Sender<Result<Reply, MessagingError>>>,
    },
    RegisterContent {
        tab: TabId,
        events: mpsc::UnboundedSender<ContentEvent>,
    },
    Invalidate,
}

/// Cloneable address of the background actor.
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::UnboundedSender<BackgroundCommand>,
    timeout: Duration,
}

impl BackgroundHandle {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `message` and waits for the coordinator's answer.
    ///
    /// A background that is gone, or drops the request, yields
    /// `ContextInvalidated`; no answer within the timeout yields `Timeout`.
    pub async fn request(&self, tab: TabId, message: RuntimeMessage) -> Result<Reply, MessagingError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BackgroundCommand::Deliver {
                tab,
                message,
                reply: Some(reply),
            })
            .map_err(|_| MessagingError::ContextInvalidated)?;
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MessagingError::ContextInvalidated),
            Err(_) => Err(MessagingError::Timeout),
        }
    }

    /// The prepare handshake.
    pub async fn prepare(&self, tab: TabId, url: &str) -> Result<PrepareResponse, MessagingError> {
        match self
            .request(tab, RuntimeMessage::PrepareToPreview { url: url.to_string() })
            .await?
        {
            Reply::Prepared(response) => Ok(response),
            other => Err(MessagingError::Protocol(format!("unexpected reply {:?}", other))),
        }
    }

    /// Fire-and-forget send.
    pub fn send(&self, tab: TabId, message: RuntimeMessage) -> Result<(), MessagingError> {
        self.tx
            .send(BackgroundCommand::Deliver {
                tab,
                message,
                reply: None,
            })
            .map_err(|_| MessagingError::ContextInvalidated)
    }

    pub fn register_content(&self, tab: TabId, events: mpsc::UnboundedSender<ContentEvent>) -> Result<(), MessagingError> {
        self.tx
            .send(BackgroundCommand::RegisterContent { tab, events })
            .map_err(|_| MessagingError::ContextInvalidated)
    }

    /// Marks the background as reloaded; later requests fail.
    pub fn invalidate(&self) -> Result<(), MessagingError> {
        self.tx
            .send(BackgroundCommand::Invalidate)
            .map_err(|_| MessagingError::ContextInvalidated)
    }
}

pub struct BackgroundActor {
    coordinator: BackgroundCoordinator,
    contents: HashMap<TabId, mpsc::UnboundedSender<ContentEvent>>,
    rx: mpsc::UnboundedReceiver<BackgroundCommand>,
}

impl BackgroundActor {
    /// Spawns the actor. The join handle yields the coordinator once every
    /// handle has been dropped.
    pub fn spawn(coordinator: BackgroundCoordinator) -> (BackgroundHandle, JoinHandle<BackgroundCoordinator>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            coordinator,
            contents: HashMap::new(),
            rx,
        };
        let handle = BackgroundHandle {
            tx,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        (handle, tokio::spawn(actor.run()))
    }

    async fn run(mut self) -> BackgroundCoordinator {
        while let Some(command) = self.rx.recv().await {
            match command {
                BackgroundCommand::Deliver { tab, message, reply } => {
                    let result = self.deliver(tab, &message);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    } else if let Err(e) = result {
                        warn!(%tab, action = message.action(), error = %e, "message failed");
                    }
                }
                BackgroundCommand::RegisterContent { tab, events } => {
                    debug!(%tab, "content context registered");
                    self.contents.insert(tab, events);
                }
                BackgroundCommand::Invalidate => self.coordinator.invalidate(),
            }
        }
        info!("background actor stopped");
        self.coordinator
    }

    fn deliver(&mut self, tab: TabId, message: &RuntimeMessage) -> Result<Reply, MessagingError> {
        match self.coordinator.handle(tab, message)? {
            Reply::Forward(forwarded) => {
                let target = self.contents.get(&tab).ok_or(MessagingError::ContextInvalidated)?;
                target
                    .send(ContentEvent::Message(forwarded))
                    .map_err(|_| MessagingError::ChannelClosed)?;
                Ok(Reply::Ack)
            }
            reply => Ok(reply),
        }
    }
}

// === Content ===

/// Cloneable address of a content actor.
#[derive(Clone)]
pub struct ContentHandle {
    tx: mpsc::UnboundedSender<ContentEvent>,
}

impl ContentHandle {
    pub fn send(&self, event: ContentEvent) -> Result<(), MessagingError> {
        self.tx.send(event).map_err(|_| MessagingError::ChannelClosed)
    }

    pub fn shutdown(&self) -> Result<(), MessagingError> {
        self.send(ContentEvent::Shutdown)
    }
}

pub struct ContentActor<S: Surface> {
    tab: TabId,
    app: App<S, TokioScheduler>,
    background: BackgroundHandle,
    tx: mpsc::UnboundedSender<ContentEvent>,
    rx: mpsc::UnboundedReceiver<ContentEvent>,
}

impl<S: Surface + Send + 'static> ContentActor<S> {
    pub fn new(tab: TabId, surface: S, settings: SettingsEngine, background: BackgroundHandle) -> (Self, ContentHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(surface, TokioScheduler::new(tx.clone()), settings);
        let handle = ContentHandle { tx: tx.clone() };
        (
            Self {
                tab,
                app,
                background,
                tx,
                rx,
            },
            handle,
        )
    }

    /// Registers with the background and processes events until shutdown.
    /// Returns the app so callers can inspect its final state.
    pub async fn run(mut self) -> App<S, TokioScheduler> {
        if let Err(e) = self.background.register_content(self.tab, self.tx.clone()) {
            warn!(tab = %self.tab, error = %e, "background unavailable at start-up");
        }
        while let Some(event) = self.rx.recv().await {
            if event == ContentEvent::Shutdown {
                break;
            }
            if let Err(e) = self.app.handle(event) {
                if e.is_recoverable() {
                    warn!(tab = %self.tab, error = %e, "recoverable preview error");
                } else {
                    error!(tab = %self.tab, error = %e, "preview error");
                }
            }
            self.dispatch_outbound();
        }
        self.app.flush_pending_writes();
        info!(tab = %self.tab, "content actor stopped");
        self.app
    }

    fn dispatch_outbound(&mut self) {
        for outbound in self.app.take_outbound() {
            match outbound {
                Outbound::Send(message) => {
                    if let Err(e) = self.background.send(self.tab, message) {
                        warn!(tab = %self.tab, error = %e, "send to background failed");
                    }
                }
                Outbound::Request { generation, message } => {
                    let background = self.background.clone();
                    let events = self.tx.clone();
                    let tab = self.tab;
                    tokio::spawn(async move {
                        let result = match background.request(tab, message).await {
                            Ok(Reply::Prepared(response)) => Ok(response),
                            Ok(other) => Err(MessagingError::Protocol(format!("unexpected reply {:?}", other))),
                            Err(e) => Err(e),
                        };
                        let _ = events.send(ContentEvent::PrepareResolved { generation, result });
                    });
                }
            }
        }
    }
}

// === Iframe ===

/// The script running inside the previewed page of one tab.
pub struct IframeContext {
    tab: TabId,
    agent: IframeAgent,
    background: BackgroundHandle,
}

impl IframeContext {
    pub fn new(tab: TabId, agent: IframeAgent, background: BackgroundHandle) -> Self {
        Self { tab, agent, background }
    }

    /// Returns true if the key was the close key.
    pub fn key_down(&self, key: &str) -> Result<bool, MessagingError> {
        match self.agent.on_key_down(key) {
            Some(message) => self.background.send(self.tab, message).map(|_| true),
            None => Ok(false),
        }
    }

    /// Returns whether the page's default action must be prevented.
    pub fn pointer_down(&self, link: Option<&LinkTarget>) -> Result<bool, MessagingError> {
        let action = self.agent.on_pointer_down(link);
        if let Some(message) = action.message {
            self.background.send(self.tab, message)?;
        }
        Ok(action.prevent_default)
    }

    pub fn window_focus(&self) -> Result<(), MessagingError> {
        self.background.send(self.tab, self.agent.on_window_focus())
    }

    pub fn settings_changed(&mut self, changes: &[SettingsChange]) {
        self.agent.apply_settings_changes(changes);
    }
}
