//! The host's SQLite database, shared with IconTags.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::error::{Error, Result};

const PROPERTIES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS properties (
        key TEXT PRIMARY KEY,
        value TEXT
    );
";

/// Handle to the host's index database.
///
/// Cloning shares the same connection. Every access takes the connection
/// lock for the duration of one closure; callers must not emit signals
/// while inside one.
#[derive(Clone)]
pub struct HostDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl HostDatabase {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap a connection the host already opened.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(PROPERTIES_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Read a property; `None` if it was never set.
    pub fn property(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM properties WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(Error::from)
        })
    }

    /// Set a property, or delete it with `None`.
    pub fn set_property(&self, key: &str, value: Option<&str>) -> Result<()> {
        self.with_connection(|conn| set_property(conn, key, value))
    }

    /// Whether a table named `name` exists.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Run `f` with the connection locked.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside a transaction, committing only if it returns `Ok`.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Set or delete a property on an already locked connection.
pub(crate) fn set_property(conn: &Connection, key: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => conn.execute(
            "INSERT OR REPLACE INTO properties (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?,
        None => conn.execute("DELETE FROM properties WHERE key = ?1", params![key])?,
    };
    Ok(())
}

impl std::fmt::Debug for HostDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDatabase").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let db = HostDatabase::open_in_memory().unwrap();
        assert_eq!(db.property("plugin").unwrap(), None);

        db.set_property("plugin", Some("0.8")).unwrap();
        assert_eq!(db.property("plugin").unwrap().as_deref(), Some("0.8"));

        db.set_property("plugin", Some("0.9")).unwrap();
        assert_eq!(db.property("plugin").unwrap().as_deref(), Some("0.9"));

        db.set_property("plugin", None).unwrap();
        assert_eq!(db.property("plugin").unwrap(), None);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = HostDatabase::open_in_memory().unwrap();
        let result: Result<()> = db.with_transaction(|tx| {
            set_property(tx, "k", Some("v"))?;
            Err(Error::NotInitialized)
        });
        assert!(result.is_err());
        assert_eq!(db.property("k").unwrap(), None);
    }

    #[test]
    fn test_table_exists() {
        let db = HostDatabase::open_in_memory().unwrap();
        assert!(db.table_exists("properties").unwrap());
        assert!(!db.table_exists("iconlist").unwrap());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        {
            let db = HostDatabase::open(&path).unwrap();
            db.set_property("k", Some("v")).unwrap();
        }
        let db = HostDatabase::open(&path).unwrap();
        assert_eq!(db.property("k").unwrap().as_deref(), Some("v"));
    }
}
