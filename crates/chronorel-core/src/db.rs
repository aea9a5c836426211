//! SQLite connection wrapper, schema, and transaction helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::StoreConfig;
use crate::error::{ChronoRelError, ChronoRelResult};

/// Format a timestamp for storage.
///
/// Fixed microsecond precision UTC RFC 3339, so lexicographic order equals
/// chronological order and equality filters match exactly.
pub(crate) fn fmt_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_time(s: &str) -> ChronoRelResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChronoRelError::database(format!("bad stored timestamp '{}': {}", s, e)))
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_opt_time(s: &Option<String>) -> ChronoRelResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_time).transpose()
}

/// Shared handle to the backing SQLite database.
///
/// Cheap to clone; all clones share one connection behind a mutex. Mutations
/// run through [`Database::with_tx`], which takes an IMMEDIATE transaction so
/// a mutation or compaction pass holds the write lock for its whole scope.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    store_tag: String,
}

impl Database {
    /// Open (or create) a database at the given path with the default store tag.
    pub fn open(path: impl AsRef<Path>) -> ChronoRelResult<Self> {
        Self::open_with(&StoreConfig {
            db_path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    /// Open a database from a [`StoreConfig`].
    pub fn open_with(config: &StoreConfig) -> ChronoRelResult<Self> {
        let conn = if config.db_path.to_str() == Some(":memory:") {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(&config.db_path)?
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            store_tag: config.store_tag.clone(),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing and ephemeral use).
    pub fn in_memory() -> ChronoRelResult<Self> {
        Self::open_with(&StoreConfig::default())
    }

    /// Identity of this store, checked against store-bound member references.
    pub fn store_tag(&self) -> &str {
        &self.store_tag
    }

    fn init_schema(&self) -> ChronoRelResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS membership_edges (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id    INTEGER NOT NULL,
                field_name  TEXT NOT NULL,
                member_id   INTEGER NOT NULL,
                time_from   TEXT,
                time_to     TEXT
            );

            -- Open-edge lookups and mutation scans
            CREATE INDEX IF NOT EXISTS idx_edges_assoc_member
                ON membership_edges(owner_id, field_name, member_id);

            -- Point and range queries on interval bounds
            CREATE INDEX IF NOT EXISTS idx_edges_assoc_from
                ON membership_edges(owner_id, field_name, time_from);
            CREATE INDEX IF NOT EXISTS idx_edges_assoc_to
                ON membership_edges(owner_id, field_name, time_to);

            -- Symmetrical mirror scans come in from the member side
            CREATE INDEX IF NOT EXISTS idx_edges_member
                ON membership_edges(field_name, member_id);

            CREATE TABLE IF NOT EXISTS history_versions (
                owner_id      INTEGER NOT NULL,
                field_name    TEXT NOT NULL,
                time          TEXT NOT NULL,
                count         INTEGER NOT NULL DEFAULT 0,
                added_count   INTEGER NOT NULL DEFAULT 0,
                removed_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (owner_id, field_name, time)
            );
        "#,
        )?;
        Ok(())
    }

    /// Run a read-only closure against the connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> ChronoRelResult<T>,
    ) -> ChronoRelResult<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Run a closure inside one IMMEDIATE transaction.
    ///
    /// Commits on `Ok`; any error rolls back every write made by the closure.
    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> ChronoRelResult<T>,
    ) -> ChronoRelResult<T> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            store_tag: self.store_tag.clone(),
        }
    }
}
