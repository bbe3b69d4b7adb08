//! Logging facilities for IconTags.
//!
//! IconTags uses the `tracing` crate for instrumentation. To see logs, the
//! host (or a test) installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("icontags=debug")
//!     .init();
//! ```
//!
//! Every event carries one of the [`targets`] so a single subsystem can be
//! switched on without the rest.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "icontags_core::signal";
    /// Timer system target.
    pub const TIMER: &str = "icontags_core::timer";
    /// Deferred callback processing.
    pub const EVENT_LOOP: &str = "icontags_core::event_loop";
    /// Icon registry loading.
    pub const REGISTRY: &str = "icontags::registry";
    /// Icon index store (database table).
    pub const STORE: &str = "icontags::store";
    /// Page-event indexer.
    pub const INDEXER: &str = "icontags::indexer";
    /// Resolution cache.
    pub const CACHE: &str = "icontags::cache";
    /// Page tree model and filter.
    pub const MODEL: &str = "icontags::model";
    /// UI state and preferences.
    pub const SETTINGS: &str = "icontags::settings";
    /// Plugin lifecycle.
    pub const PLUGIN: &str = "icontags::plugin";
}

/// A performance span for timing operations.
///
/// The span stays entered until the guard is dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "icontags::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
