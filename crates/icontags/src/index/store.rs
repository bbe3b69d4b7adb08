//! The persistent page → icon table.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use icontags_core::Signal;
use icontags_core::logging::targets;
use rusqlite::{OptionalExtension, params};

use super::database::{HostDatabase, set_property};
use crate::error::{Error, Result};
use crate::page::PageId;

/// Property key holding the schema marker.
pub const PLUGIN_NAME: &str = "icontags";
/// Schema marker value written by [`IconIndexStore::initialize`].
pub const DB_FORMAT: &str = "0.8";
/// Name of the icon table.
pub const TABLE_NAME: &str = "iconlist";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS iconlist (
        id TEXT PRIMARY KEY,
        icon TEXT
    );
";

/// Stores the icon each page's shortcode names.
///
/// At most one row per page. [`changed`](Self::changed) fires after every
/// write that actually altered the table, outside the database lock, so
/// listeners may read the store again.
pub struct IconIndexStore {
    db: HostDatabase,
    initialized: AtomicBool,
    changed: Arc<Signal<PageId>>,
}

impl IconIndexStore {
    /// Attach to the host database. Reads the marker to learn whether the
    /// table from an earlier session can be used as is.
    pub fn new(db: HostDatabase) -> Result<Self> {
        let store = Self {
            db,
            initialized: AtomicBool::new(false),
            changed: Arc::new(Signal::new()),
        };
        let ready = store.schema_version()?.as_deref() == Some(DB_FORMAT)
            && store.db.table_exists(TABLE_NAME)?;
        store.initialized.store(ready, Ordering::SeqCst);
        Ok(store)
    }

    /// Fires with the page whose row was inserted, updated or deleted.
    pub fn changed(&self) -> &Arc<Signal<PageId>> {
        &self.changed
    }

    /// The schema marker currently in the database.
    pub fn schema_version(&self) -> Result<Option<String>> {
        self.db.property(PLUGIN_NAME)
    }

    /// Whether the table exists with the current format.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Create the table (if missing) and write the schema marker.
    ///
    /// Idempotent: existing rows are kept.
    pub fn initialize(&self) -> Result<()> {
        self.db.with_transaction(|tx| {
            tx.execute_batch(SCHEMA)?;
            set_property(tx, PLUGIN_NAME, Some(DB_FORMAT))
        })?;
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!(target: targets::STORE, format = DB_FORMAT, "icon index initialized");
        Ok(())
    }

    /// Drop the table and delete the schema marker.
    pub fn teardown(&self) -> Result<()> {
        self.db.with_transaction(|tx| {
            tx.execute_batch("DROP TABLE IF EXISTS iconlist;")?;
            set_property(tx, PLUGIN_NAME, None)
        })?;
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!(target: targets::STORE, "icon index dropped");
        Ok(())
    }

    /// Insert or replace the icon of `page`.
    pub fn upsert(&self, page: &PageId, icon: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.db.with_transaction(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO iconlist (id, icon) VALUES (?1, ?2)",
                params![page.as_str(), icon],
            )?;
            Ok(())
        })?;
        tracing::debug!(target: targets::STORE, page = %page, icon, "icon stored");
        self.changed.emit(page.clone());
        Ok(())
    }

    /// Delete the row of `page`. Returns whether a row existed; listeners
    /// are only told when one did.
    pub fn remove(&self, page: &PageId) -> Result<bool> {
        self.ensure_initialized()?;
        let deleted = self.db.with_transaction(|tx| {
            Ok(tx.execute("DELETE FROM iconlist WHERE id = ?1", params![page.as_str()])?)
        })?;
        if deleted > 0 {
            tracing::debug!(target: targets::STORE, page = %page, "icon removed");
            self.changed.emit(page.clone());
        }
        Ok(deleted > 0)
    }

    /// The stored icon of `page`. `None` when there is no row or the table
    /// has not been initialized.
    pub fn get(&self, page: &PageId) -> Result<Option<String>> {
        if !self.is_initialized() {
            return Ok(None);
        }
        self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT icon FROM iconlist WHERE id = ?1",
                params![page.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(Error::from)
        })
    }

    /// Like [`get`](Self::get), but a database failure is logged and read as
    /// "no icon". For rendering paths that must not fail.
    pub fn icon_for(&self, page: &PageId) -> Option<String> {
        self.get(page).unwrap_or_else(|e| {
            tracing::warn!(target: targets::STORE, page = %page, error = %e, "icon lookup failed");
            None
        })
    }

    /// Number of rows.
    pub fn len(&self) -> Result<usize> {
        if !self.is_initialized() {
            return Ok(0);
        }
        self.db.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM iconlist", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

impl std::fmt::Debug for IconIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconIndexStore")
            .field("initialized", &self.is_initialized())
            .field("listeners", &self.changed.connection_count())
            .finish()
    }
}
