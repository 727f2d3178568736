//! Key-value slots backing persisted settings

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

/// Connection pool for the settings database
pub type DbPool = Pool<SqliteConnectionManager>;

/// A persistent string-valued key-value store
pub trait KvStore: Send + Sync {
    /// Read the value under `key`, or `None` if never written
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be written
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// `SQLite`-backed key-value store
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: DbPool,
}

impl SqliteKvStore {
    /// Open (or create) the store at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or initialized
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init_schema()?;

        tracing::info!(path = %path.as_ref().display(), "settings store opened");
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let result = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

/// Process-local key-value store
#[derive(Default)]
pub struct MemoryKvStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
