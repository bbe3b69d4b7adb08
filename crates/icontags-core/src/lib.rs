//! Core runtime for IconTags.
//!
//! This crate provides the small cooperative runtime the IconTags plugin is
//! built on:
//!
//! - **Signal/Slot System**: Typed notifications with scoped subscriptions
//! - **Timers**: One-shot deferred callbacks
//! - **Event Loop**: A host-pumped scheduler for those callbacks
//! - **Logging**: `tracing` targets for every subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use icontags_core::{Signal, Subscriptions};
//! use std::sync::Arc;
//!
//! let page_changed = Arc::new(Signal::<String>::new());
//!
//! let mut subscriptions = Subscriptions::new();
//! subscriptions.push(page_changed.connect_scoped(|page| {
//!     println!("{page} changed");
//! }));
//!
//! page_changed.emit("Journal:2024".to_string());
//!
//! // Teardown: no callback survives this.
//! subscriptions.release();
//! assert_eq!(page_changed.connection_count(), 0);
//! ```

mod error;
mod event_loop;
pub mod logging;
pub mod signal;
mod timer;

pub use error::{CoreError, Result, SignalError, TimerError};
pub use event_loop::EventLoop;
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal, SignalEmitter, Subscriptions};
pub use timer::{TimerCallback, TimerId, TimerManager};
