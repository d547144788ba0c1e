//! Local SQLite cache for reader tags, users, and the likes they join against.
//!
//! A single [`ReaderDatabase`] is opened by the composing application and
//! shared (via `Arc`) with the table handles in [`tags`], [`users`] and
//! [`likes`]. All reads are eagerly materialized into owned value objects.

pub mod avatar;
pub mod config;
pub mod dates;
pub mod error;
pub mod likes;
pub mod migrations;
pub mod tags;
pub mod users;

use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use likes::LikeTable;
pub use tags::TagTable;
pub use users::UserTable;

/// Process-wide storage handle: one writer plus a pool of read-only connections.
///
/// An in-memory database has no readers; every call goes through the writer.
pub struct ReaderDatabase {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl ReaderDatabase {
    pub fn open(path: &Path, reader_pool_size: usize) -> Result<Self> {
        let mut writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;

        migrate(&mut writer)?;

        let mut readers = Vec::with_capacity(reader_pool_size);
        for _ in 0..reader_pool_size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Reader DB opened at {} (1 writer + {} readers)",
            path.display(),
            reader_pool_size
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn open_with_config(config: &CacheConfig) -> Result<Self> {
        Self::open(&config.db_path, config.reader_pool_size)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run `f` against a readable connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(f);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` against the writable connection.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock_writer()?;
        f(&conn)
    }

    /// Run `f` inside a transaction on the writable connection.
    ///
    /// Commits only if `f` returns `Ok`; any error rolls the whole batch back.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock_writer()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Drop and recreate every cache table (logout / account switch).
    ///
    /// All or nothing: a failure leaves the previous tables and rows in place.
    pub fn reset(&self) -> Result<()> {
        self.with_transaction(|tx| {
            migrations::drop_all(tx)?;
            migrations::run(tx)
        })?;
        info!("Reader DB reset");
        Ok(())
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))
    }
}

fn migrate(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    migrations::run(&tx)?;
    tx.commit()?;
    Ok(())
}

/// Number of rows in `table`. Only called with the fixed table names of this crate.
pub(crate) fn row_count(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = ReaderDatabase::open_in_memory().unwrap();

        let result: Result<()> = db.with_transaction(|tx| {
            tx.execute("INSERT INTO users (user_id, user_name) VALUES (1, 'a')", [])?;
            Err(CacheError::InvalidRow("forced".into()))
        });
        assert!(result.is_err());

        let count = db.with_conn(|conn| row_count(conn, "users")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reset_empties_tables() {
        let db = ReaderDatabase::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            conn.execute("INSERT INTO users (user_id, user_name) VALUES (1, 'a')", [])?;
            Ok(())
        })
        .unwrap();

        db.reset().unwrap();

        let count = db.with_conn(|conn| row_count(conn, "users")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_failed_reset_keeps_existing_tables() {
        let db = ReaderDatabase::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            conn.execute("INSERT INTO users (user_id, user_name) VALUES (1, 'a')", [])?;
            // A view under a cache table name makes DROP TABLE fail midway.
            conn.execute_batch("DROP TABLE post_likes; CREATE VIEW post_likes AS SELECT 1 AS user_id;")?;
            Ok(())
        })
        .unwrap();

        assert!(db.reset().is_err());

        let count = db.with_conn(|conn| row_count(conn, "users")).unwrap();
        assert_eq!(count, 1);
        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }

    #[test]
    fn test_reader_pool_sees_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = ReaderDatabase::open(&dir.path().join("reader.db"), 2).unwrap();

        db.with_conn_mut(|conn| {
            conn.execute("INSERT INTO users (user_id, user_name) VALUES (9, 'z')", [])?;
            Ok(())
        })
        .unwrap();

        // Round-robin hits both readers.
        for _ in 0..2 {
            let count = db.with_conn(|conn| row_count(conn, "users")).unwrap();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn test_readers_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let db = ReaderDatabase::open(&dir.path().join("reader.db"), 1).unwrap();

        let result = db.with_conn(|conn| {
            conn.execute("INSERT INTO users (user_id) VALUES (1)", [])?;
            Ok(())
        });
        assert!(result.is_err());
    }
}
