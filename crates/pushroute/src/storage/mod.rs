//! Storage layer for pushroute.
//!
//! A durable `SQLite` key-value store plus the [`IntentStore`] contract the
//! receiver and dispatcher stage intents through.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::intent::{PendingIntent, Slot};

/// Staging area for deferred navigation intents.
///
/// Holds at most one intent per [`Slot`]. Implementations need no locking
/// beyond what their backing storage provides: each slot has one writer path
/// and one reader path.
#[async_trait]
pub trait IntentStore: Send + Sync + std::fmt::Debug {
    /// Stage `target_id` into `slot` with `created_at = now`, replacing any
    /// previous intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn stage(&self, slot: Slot, target_id: &str) -> Result<PendingIntent>;

    /// Read the intent in `slot` without removing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored record is corrupt.
    async fn read(&self, slot: Slot) -> Result<Option<PendingIntent>>;

    /// Remove whatever is in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn clear(&self, slot: Slot) -> Result<()>;
}

/// Durable key-value store backed by `SQLite`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Source of staging timestamps.
    clock: Arc<dyn Clock>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` for staging timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM items WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = self.clock.now().to_rfc3339();
        self.conn().execute(
            r"
            INSERT INTO items (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, updated_at],
        )?;
        debug!("Stored item {}", key);
        Ok(())
    }

    /// Remove the value stored under `key`.
    ///
    /// Returns `true` if a value was removed, `false` if the key was absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM items WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// List all stored keys in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM items ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[async_trait]
impl IntentStore for Storage {
    async fn stage(&self, slot: Slot, target_id: &str) -> Result<PendingIntent> {
        let intent = PendingIntent::new(target_id, self.clock.now());
        self.set_item(slot.key(), &intent.encode()?)?;
        debug!(%slot, target_id, "Staged navigation intent");
        Ok(intent)
    }

    async fn read(&self, slot: Slot) -> Result<Option<PendingIntent>> {
        self.get_item(slot.key())?
            .map(|raw| PendingIntent::decode(slot, &raw))
            .transpose()
    }

    async fn clear(&self, slot: Slot) -> Result<()> {
        if self.remove_item(slot.key())? {
            debug!(%slot, "Cleared navigation intent");
        }
        Ok(())
    }
}
