//! Keeps the icon table in sync with page content.
//!
//! Subscribes to the host's page events while active and writes only when
//! a page's shortcode differs from what is stored.

use std::sync::Arc;

use icontags_core::logging::targets;
use icontags_core::{PerfSpan, Subscriptions};
use parking_lot::Mutex;

use crate::error::Result;
use crate::host::{HostEvents, Notebook, PageChange};
use crate::index::IconIndexStore;
use crate::page::PageId;
use crate::shortcode::{self, Token};

/// Lifecycle of the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Never enabled, or detached without dropping the table.
    Uninitialized,
    /// Listening to page events.
    Active,
    /// Turned off; the table was dropped.
    Disabled,
}

/// What a reconcile pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The stored value already matched.
    Unchanged,
    /// A row was inserted or replaced.
    Stored(String),
    /// The row was deleted.
    Removed,
    /// Nothing was done: indexer inactive or the database failed.
    Skipped,
}

struct IndexerInner {
    store: Arc<IconIndexStore>,
    state: Mutex<IndexerState>,
}

impl IndexerInner {
    fn is_active(&self) -> bool {
        *self.state.lock() == IndexerState::Active
    }

    fn reconcile(&self, page: &PageId, content: &[Token]) -> Reconciled {
        if !self.is_active() {
            return Reconciled::Skipped;
        }

        let extracted = shortcode::extract(content);
        let wanted = extracted.stored_value();

        let stored = match self.store.get(page) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(target: targets::INDEXER, page = %page, error = %e, "could not read stored icon");
                return Reconciled::Skipped;
            }
        };
        if stored.as_deref() == wanted {
            return Reconciled::Unchanged;
        }

        let outcome = match wanted {
            Some(icon) => self
                .store
                .upsert(page, icon)
                .map(|()| Reconciled::Stored(icon.to_string())),
            None => self.store.remove(page).map(|_| Reconciled::Removed),
        };
        outcome.unwrap_or_else(|e| {
            tracing::error!(
                target: targets::INDEXER,
                page = %page,
                icon = wanted.unwrap_or("<remove>"),
                error = %e,
                "could not update icon index"
            );
            Reconciled::Skipped
        })
    }

    fn forget(&self, page: &PageId) -> Reconciled {
        if !self.is_active() {
            return Reconciled::Skipped;
        }
        match self.store.remove(page) {
            Ok(true) => Reconciled::Removed,
            Ok(false) => Reconciled::Unchanged,
            Err(e) => {
                tracing::warn!(target: targets::INDEXER, page = %page, error = %e, "could not remove icon");
                Reconciled::Skipped
            }
        }
    }
}

/// Reacts to page changes and deletions by updating the icon table.
pub struct Indexer {
    inner: Arc<IndexerInner>,
    subscriptions: Subscriptions,
}

impl Indexer {
    pub fn new(store: Arc<IconIndexStore>) -> Self {
        Self {
            inner: Arc::new(IndexerInner {
                store,
                state: Mutex::new(IndexerState::Uninitialized),
            }),
            subscriptions: Subscriptions::new(),
        }
    }

    pub fn state(&self) -> IndexerState {
        *self.inner.state.lock()
    }

    /// Whether the indexer is listening and the table is usable.
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn store(&self) -> &Arc<IconIndexStore> {
        &self.inner.store
    }

    /// Create the table, start listening, and optionally ask the host for a
    /// full reindex so existing pages are picked up.
    ///
    /// # Errors
    ///
    /// If the table cannot be created the indexer ends up
    /// [`Disabled`](IndexerState::Disabled) and the error is returned.
    pub fn enable(
        &mut self,
        events: &HostEvents,
        notebook: &dyn Notebook,
        reindex: bool,
    ) -> Result<()> {
        if let Err(e) = self.inner.store.initialize() {
            tracing::error!(target: targets::INDEXER, error = %e, "icon index could not be created");
            self.subscriptions.release();
            *self.inner.state.lock() = IndexerState::Disabled;
            return Err(e);
        }

        self.subscriptions.release();
        let inner = self.inner.clone();
        self.subscriptions
            .push(events.page_changed.connect_scoped(move |change: &PageChange| {
                inner.reconcile(&change.page, &change.content);
            }));
        let inner = self.inner.clone();
        self.subscriptions
            .push(events.page_deleted.connect_scoped(move |page: &PageId| {
                inner.forget(page);
            }));

        *self.inner.state.lock() = IndexerState::Active;
        tracing::info!(target: targets::INDEXER, reindex, "indexer enabled");

        if reindex {
            let _span = PerfSpan::new("request_reindex");
            notebook.request_reindex();
        }
        Ok(())
    }

    /// Stop listening and drop the table.
    pub fn disable(&mut self) -> Result<()> {
        self.subscriptions.release();
        *self.inner.state.lock() = IndexerState::Disabled;
        self.inner.store.teardown()?;
        tracing::info!(target: targets::INDEXER, "indexer disabled");
        Ok(())
    }

    /// Stop listening but keep the table for the next session.
    pub fn detach(&mut self) {
        self.subscriptions.release();
        let mut state = self.inner.state.lock();
        if *state == IndexerState::Active {
            *state = IndexerState::Uninitialized;
        }
    }

    /// Bring the stored icon of `page` in line with `content`.
    pub fn reconcile(&self, page: &PageId, content: &[Token]) -> Reconciled {
        self.inner.reconcile(page, content)
    }

    /// Drop the stored icon of a deleted page.
    pub fn forget(&self, page: &PageId) -> Reconciled {
        self.inner.forget(page)
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        self.subscriptions.release();
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("state", &self.state())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
