//! Timer abstraction for the content context.
//!
//! Components never sleep. They ask a [`Scheduler`] to deliver a
//! [`TimerId`] back to the event loop after a delay, or to deliver the next
//! animation frame. Scheduling an id that is already pending restarts it.

use std::collections::HashMap;
use std::time::Duration;

/// Operations that are debounced on a trailing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    /// Write drag/resize/restore geometry to the settings store.
    PersistGeometry,
    /// Re-fit the overlay into the viewport after a window resize.
    BoundsCheck,
    /// Ask the background to warm a connection for a hovered link.
    Preconnect,
}

/// Every timer the content context can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    LongPress,
    CloseAnimation,
    LoaderHide,
    CopyFeedback,
    Debounce(DebounceKey),
}

pub trait Scheduler {
    /// Arms `timer` to fire after `delay`, replacing any pending instance.
    fn schedule(&mut self, timer: TimerId, delay: Duration);
    /// Disarms `timer`. No-op if it is not pending.
    fn cancel(&mut self, timer: TimerId);
    /// Requests one animation-frame callback.
    fn request_frame(&mut self);
}

/// Scheduler that only records requests; the owner fires them by hand.
///
/// Used by synchronous drivers and tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: HashMap<TimerId, Duration>,
    frame_requested: bool,
    scheduled_count: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, timer: TimerId) -> bool {
        self.pending.contains_key(&timer)
    }

    pub fn delay_of(&self, timer: TimerId) -> Option<Duration> {
        self.pending.get(&timer).copied()
    }

    /// Removes `timer` from the pending set, returning whether it was armed.
    pub fn take(&mut self, timer: TimerId) -> bool {
        self.pending.remove(&timer).is_some()
    }

    /// Consumes a pending frame request.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total number of `schedule` calls, restarts included.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled_count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, timer: TimerId, delay: Duration) {
        self.scheduled_count += 1;
        self.pending.insert(timer, delay);
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.remove(&timer);
    }

    fn request_frame(&mut self) {
        self.frame_requested = true;
    }
}
