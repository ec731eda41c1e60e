//! Trailing-edge debounce keyed by operation.
//!
//! Each trigger replaces the pending payload for its key and restarts the
//! key's timer, so at most one invocation happens per quiet period.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use super::scheduler::{DebounceKey, Scheduler, TimerId};

/// Quiet period used by every debounced operation in the content context.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct Debouncer<A> {
    pending: HashMap<DebounceKey, A>,
}

impl<A> Default for Debouncer<A> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<A> Debouncer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `args` for `key`, dropping any earlier payload, and restarts the timer.
    pub fn trigger(&mut self, scheduler: &mut dyn Scheduler, key: DebounceKey, delay: Duration, args: A) {
        trace!(?key, ?delay, "debounce restart");
        self.pending.insert(key, args);
        scheduler.schedule(TimerId::Debounce(key), delay);
    }

    /// Like [`trigger`](Self::trigger) but folds `args` into a pending payload
    /// with `merge` instead of replacing it.
    pub fn trigger_merge<F>(
        &mut self,
        scheduler: &mut dyn Scheduler,
        key: DebounceKey,
        delay: Duration,
        args: A,
        merge: F,
    ) where
        F: FnOnce(&mut A, A),
    {
        match self.pending.get_mut(&key) {
            Some(existing) => merge(existing, args),
            None => {
                self.pending.insert(key, args);
            }
        }
        scheduler.schedule(TimerId::Debounce(key), delay);
    }

    /// Cancels the pending invocation for `key`.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler, key: DebounceKey) {
        if self.pending.remove(&key).is_some() {
            scheduler.cancel(TimerId::Debounce(key));
        }
    }

    /// Called when the key's timer fires. Returns the payload to run with.
    pub fn fire(&mut self, key: DebounceKey) -> Option<A> {
        self.pending.remove(&key)
    }

    pub fn is_pending(&self, key: DebounceKey) -> bool {
        self.pending.contains_key(&key)
    }
}
