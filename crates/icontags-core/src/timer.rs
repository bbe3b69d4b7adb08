//! One-shot timers for deferred callbacks.
//!
//! The host's event loop owns the clock; this module only keeps track of what
//! is due. [`TimerManager::take_expired_at`] hands back the callbacks whose
//! deadline has passed and the caller runs them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, TimerError};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// A boxed timer callback.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Internal timer data.
struct TimerData {
    /// When this timer should fire.
    deadline: Instant,
    /// The callback to run; taken when the timer fires.
    callback: TimerCallback,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Manages pending one-shot timers.
pub struct TimerManager {
    /// All pending timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending timer fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Start a one-shot timer that fires `delay` after `now`.
    ///
    /// Returns the timer ID that can be used to cancel the timer.
    pub fn start_one_shot_at(
        &mut self,
        now: Instant,
        delay: Duration,
        callback: TimerCallback,
    ) -> TimerId {
        let deadline = now + delay;
        let id = self.timers.insert(TimerData { deadline, callback });
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: deadline,
        });
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "timer started");
        id
    }

    /// Start a one-shot timer that fires after `delay`.
    pub fn start_one_shot(&mut self, delay: Duration, callback: TimerCallback) -> TimerId {
        self.start_one_shot_at(Instant::now(), delay, callback)
    }

    /// Stop and remove a pending timer.
    ///
    /// Returns an error if the timer already fired or was never started.
    pub fn stop(&mut self, id: TimerId) -> Result<()> {
        if self.timers.remove(id).is_some() {
            Ok(())
        } else {
            Err(TimerError::InvalidTimerId.into())
        }
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next_at(&mut self, now: Instant) -> Option<Duration> {
        // Drop stopped timers from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }

        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Remove and return every callback due at `now`, in deadline order.
    #[tracing::instrument(skip(self), target = "icontags_core::timer", level = "trace")]
    pub fn take_expired_at(&mut self, now: Instant) -> Vec<(TimerId, TimerCallback)> {
        let mut expired = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            // Stopped timers leave stale queue entries behind.
            let Some(timer) = self.timers.remove(entry.id) else {
                continue;
            };
            debug_assert!(timer.deadline <= now);
            tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
            expired.push((entry.id, timer.callback));
        }

        expired
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}
