//! Memoized row resolutions.
//!
//! Entries are invalidated one page at a time when a page's tags or stored
//! icon change, and all at once on reindex. The cache is bounded by a lazy
//! sweep: a write schedules a one-shot check on the event loop, and the
//! check empties the cache if it has grown past [`CACHE_CEILING`]. At most
//! one check is pending at a time.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use icontags_core::EventLoop;
use icontags_core::logging::targets;
use parking_lot::Mutex;

use crate::page::PageId;
use crate::resolve::Resolution;

/// Size above which a sweep clears the cache.
pub const CACHE_CEILING: usize = 200;
/// Delay between a write and the sweep it schedules.
pub const SWEEP_DELAY: Duration = Duration::from_millis(500);

#[derive(Default)]
struct CacheInner {
    entries: HashMap<PageId, Resolution>,
    sweep_pending: bool,
}

/// Page → [`Resolution`] cache.
///
/// Cloning shares the same entries.
#[derive(Clone)]
pub struct ResolutionCache {
    inner: Arc<Mutex<CacheInner>>,
    event_loop: EventLoop,
}

impl ResolutionCache {
    /// A cache whose sweeps run on `event_loop`.
    pub fn new(event_loop: EventLoop) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            event_loop,
        }
    }

    pub fn get(&self, page: &PageId) -> Option<Resolution> {
        self.inner.lock().entries.get(page).cloned()
    }

    /// Store a resolution and schedule a sweep if none is pending.
    pub fn put(&self, page: PageId, resolution: Resolution) {
        let schedule = {
            let mut inner = self.inner.lock();
            inner.entries.insert(page, resolution);
            !std::mem::replace(&mut inner.sweep_pending, true)
        };
        if schedule {
            let weak = Arc::downgrade(&self.inner);
            self.event_loop.start_one_shot(SWEEP_DELAY, move || sweep(&weak));
        }
    }

    /// Drop the entry of `page`. Returns whether there was one.
    pub fn invalidate(&self, page: &PageId) -> bool {
        self.inner.lock().entries.remove(page).is_some()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.lock().entries.clear();
        tracing::trace!(target: targets::CACHE, "cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Whether a sweep is scheduled and has not run yet.
    pub fn sweep_pending(&self) -> bool {
        self.inner.lock().sweep_pending
    }
}

fn sweep(inner: &Weak<Mutex<CacheInner>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut inner = inner.lock();
    inner.sweep_pending = false;
    if inner.entries.len() > CACHE_CEILING {
        tracing::debug!(target: targets::CACHE, size = inner.entries.len(), "cache over ceiling, clearing");
        inner.entries.clear();
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResolutionCache")
            .field("len", &inner.entries.len())
            .field("sweep_pending", &inner.sweep_pending)
            .finish()
    }
}
