//! Host-pumped cooperative event loop.
//!
//! IconTags never owns the real event loop: the host application does. The
//! host calls [`EventLoop::process_expired`] from its own idle/timeout hook
//! and uses [`EventLoop::time_until_next`] to decide when to wake up. Every
//! deferred callback therefore runs on the host's thread, one at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Result;
use crate::logging::targets;
use crate::timer::{TimerId, TimerManager};

/// Deferred-callback scheduler shared by every component of the plugin.
///
/// Cloning is cheap; clones share the same timer queue.
///
/// # Example
///
/// ```
/// use icontags_core::EventLoop;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let event_loop = EventLoop::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let fired_clone = fired.clone();
/// event_loop.start_one_shot(Duration::from_millis(500), move || {
///     fired_clone.store(true, Ordering::SeqCst);
/// });
///
/// event_loop.process_expired_at(Instant::now() + Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Clone, Default)]
pub struct EventLoop {
    timers: Arc<Mutex<TimerManager>>,
}

impl EventLoop {
    /// Create an event loop with no pending work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once, `delay` from now.
    pub fn start_one_shot<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        self.timers.lock().start_one_shot(delay, Box::new(callback))
    }

    /// Cancel a pending callback.
    pub fn stop(&self, id: TimerId) -> Result<()> {
        self.timers.lock().stop(id)
    }

    /// Check whether a callback is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.lock().is_active(id)
    }

    /// Number of pending callbacks.
    pub fn pending_count(&self) -> usize {
        self.timers.lock().active_count()
    }

    /// How long the host may sleep before the next callback is due.
    pub fn time_until_next(&self) -> Option<Duration> {
        self.timers.lock().time_until_next_at(Instant::now())
    }

    /// Run every callback that is due now.
    pub fn process_expired(&self) -> usize {
        self.process_expired_at(Instant::now())
    }

    /// Run every callback due at `now`.
    ///
    /// Callbacks run after the timer lock is released, so they may schedule
    /// further callbacks; those are not run in the same pass.
    pub fn process_expired_at(&self, now: Instant) -> usize {
        let expired = self.timers.lock().take_expired_at(now);
        let count = expired.len();
        for (id, callback) in expired {
            tracing::trace!(target: targets::EVENT_LOOP, ?id, "running deferred callback");
            callback();
        }
        count
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending_count())
            .finish()
    }
}
