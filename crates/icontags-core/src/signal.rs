//! Signal/slot system for IconTags.
//!
//! Signals are the typed replacement for dynamically connected host callbacks.
//! A producer owns a [`Signal<Args>`]; consumers connect slots (closures) and
//! keep either the returned [`ConnectionId`] or, preferably, a
//! [`ConnectionGuard`] that disconnects when dropped.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//! - [`Subscriptions`] - A bag of guards released together on teardown
//!
//! # Execution Model
//!
//! Slots are always invoked directly on the emitting thread. The host drives
//! a single cooperative event loop, so there is no queued delivery. The
//! connection lock is released before slots run, which means a slot may
//! connect to or disconnect from the signal it is handling.
//!
//! # Example
//!
//! ```
//! use icontags_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::SignalError;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

/// A connected slot, shared so emission can run without holding the lock.
type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(String, i32)` for multiple arguments.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use icontags_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` will do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking every connected slot once.
    ///
    /// Slots run in slot-map order, which is not connection order once a
    /// slot has been disconnected and its entry reused. If the signal is
    /// blocked, this does nothing.
    #[tracing::instrument(skip_all, target = "icontags_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args: 'static> Signal<Args> {
    /// Connect a slot with automatic disconnection when the guard is dropped.
    ///
    /// The guard only holds a weak reference to the signal, so dropping it
    /// after the signal is gone is harmless.
    ///
    /// # Example
    ///
    /// ```
    /// use icontags_core::Signal;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let signal = Arc::new(Signal::<i32>::new());
    /// let counter = Arc::new(AtomicI32::new(0));
    /// {
    ///     let counter_clone = counter.clone();
    ///     let _guard = signal.connect_scoped(move |&n| {
    ///         counter_clone.fetch_add(n, Ordering::SeqCst);
    ///     });
    ///     signal.emit(42);
    /// }
    /// signal.emit(43);
    /// assert_eq!(counter.load(Ordering::SeqCst), 42);
    /// ```
    pub fn connect_scoped<F>(self: &Arc<Self>, slot: F) -> ConnectionGuard
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let emitter: Arc<dyn SignalEmitter> = self.clone();
        ConnectionGuard {
            signal: Arc::downgrade(&emitter),
            id,
            released: false,
        }
    }
}

/// Type-erased view of a signal, which lets [`ConnectionGuard`] stay
/// non-generic.
pub trait SignalEmitter: Send + Sync {
    /// Disconnect a connection by ID.
    fn disconnect(&self, id: ConnectionId) -> bool;
}

impl<Args: 'static> SignalEmitter for Signal<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        Signal::disconnect(self, id)
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`].
pub struct ConnectionGuard {
    signal: Weak<dyn SignalEmitter>,
    id: ConnectionId,
    released: bool,
}

impl ConnectionGuard {
    /// The connection this guard owns.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` while the signal is alive and the slot still connected.
    pub fn is_connected(&self) -> bool {
        !self.released && self.signal.strong_count() > 0
    }

    /// Disconnect now instead of waiting for drop.
    pub fn disconnect(&mut self) -> Result<(), SignalError> {
        if self.released {
            return Err(SignalError::InvalidConnection);
        }
        self.released = true;
        let signal = self.signal.upgrade().ok_or(SignalError::SignalDropped)?;
        if signal.disconnect(self.id) {
            Ok(())
        } else {
            Err(SignalError::InvalidConnection)
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.disconnect();
        }
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// A set of scoped connections released together.
///
/// Components that subscribe to several host signals keep one of these and
/// call [`Subscriptions::release`] (or simply drop it) on teardown, so no
/// callback outlives its owner.
#[derive(Debug, Default)]
pub struct Subscriptions {
    guards: Vec<ConnectionGuard>,
}

impl Subscriptions {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a guard.
    pub fn push(&mut self, guard: ConnectionGuard) {
        self.guards.push(guard);
    }

    /// Number of held connections.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Disconnect everything now.
    pub fn release(&mut self) {
        self.guards.clear();
    }
}
