//! `SQLite` storage for the harvested collection.
//!
//! The collection lives under one named key as a JSON array. It is read once
//! at the start of a run and replaced wholesale at the end; there is no
//! partial update. Folder tags are deliberately not stored here.

use crate::error::{FeedError, Result};
use crate::model::Collection;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA_VERSION: i32 = 1;

/// Key holding the full ordered item sequence.
pub const COLLECTION_KEY: &str = "collection";

/// `SQLite` storage manager
pub struct Storage {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

impl Storage {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FeedError::path_error("create directory", parent, e))?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let storage = Self {
            conn,
            path: Some(db_path.to_path_buf()),
        };
        storage.migrate()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn, path: None };
        storage.migrate()?;
        Ok(storage)
    }

    /// Database file, if this is not an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        let current = self.schema_version();
        if current < SCHEMA_VERSION {
            info!(
                "Migrating database from version {} to {}",
                current, SCHEMA_VERSION
            );
            self.conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
                params![SCHEMA_VERSION.to_string()],
            )?;
        }
        Ok(())
    }

    fn schema_version(&self) -> i32 {
        self.conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| {
                    let value: String = row.get(0)?;
                    Ok(value.parse().unwrap_or(0))
                },
            )
            .unwrap_or_default()
    }

    /// Raw JSON stored under the collection key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn raw_collection(&self) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                params![COLLECTION_KEY],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Load the persisted collection; empty when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value violates the
    /// collection invariants.
    pub fn load_collection(&self) -> Result<Collection> {
        let Some(raw) = self.raw_collection()? else {
            debug!("No stored collection, starting empty");
            return Ok(Collection::new());
        };
        let collection: Collection = serde_json::from_str(&raw)?;
        debug!(items = collection.len(), "Loaded collection");
        Ok(collection)
    }

    /// Replace the stored collection.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PersistenceFault`] if serialization or the write
    /// fails.
    pub fn save_collection(&self, collection: &Collection) -> Result<()> {
        let json = serde_json::to_string(collection)
            .map_err(|e| FeedError::persistence("collection store", e))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO kv (key, value, revision, updated_at) VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    revision = kv.revision + 1,
                    updated_at = excluded.updated_at",
                params![COLLECTION_KEY, json, now],
            )
            .map_err(|e| FeedError::persistence("collection store", e))?;

        info!(items = collection.len(), "Saved collection");
        Ok(())
    }

    /// Delete the stored collection. Returns how many items it held.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot be read or the delete fails.
    pub fn clear_collection(&self) -> Result<usize> {
        let removed = self.load_collection().map_or(0, |c| c.len());
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", params![COLLECTION_KEY])
            .map_err(|e| FeedError::persistence("collection store", e))?;
        info!(removed, "Cleared collection");
        Ok(removed)
    }

    /// Number of times the collection key has been written. Zero when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn revision(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row(
                "SELECT revision FROM kv WHERE key = ?",
                params![COLLECTION_KEY],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0))
    }

    /// When the collection key was last written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key = ?",
                params![COLLECTION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    fn collection(links: &[&str]) -> Collection {
        Collection::from_items(links.iter().map(|l| Item::new(*l, "").unwrap()).collect())
            .unwrap()
    }

    #[test]
    fn missing_key_loads_empty() {
        let storage = Storage::open_memory().unwrap();
        assert!(storage.load_collection().unwrap().is_empty());
        assert_eq!(storage.revision().unwrap(), 0);
        assert!(storage.updated_at().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_whole_value() {
        let storage = Storage::open_memory().unwrap();
        storage.save_collection(&collection(&["b", "a"])).unwrap();
        storage.save_collection(&collection(&["c", "b", "a"])).unwrap();

        let loaded = storage.load_collection().unwrap();
        let links: Vec<&str> = loaded.iter().map(Item::identity).collect();
        assert_eq!(links, ["c", "b", "a"]);
        assert_eq!(storage.revision().unwrap(), 2);
        assert!(storage.updated_at().unwrap().is_some());
    }

    #[test]
    fn clear_removes_key() {
        let storage = Storage::open_memory().unwrap();
        storage.save_collection(&collection(&["a"])).unwrap();
        assert_eq!(storage.clear_collection().unwrap(), 1);
        assert!(storage.raw_collection().unwrap().is_none());
        assert_eq!(storage.clear_collection().unwrap(), 0);
    }

    #[test]
    fn corrupt_value_is_rejected() {
        let storage = Storage::open_memory().unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    COLLECTION_KEY,
                    r#"[{"link":"a"},{"link":"a"}]"#,
                    Utc::now().to_rfc3339()
                ],
            )
            .unwrap();
        assert!(storage.load_collection().is_err());
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feedfold.db");
        {
            let storage = Storage::open(&path).unwrap();
            storage.save_collection(&collection(&["a"])).unwrap();
        }
        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.load_collection().unwrap().len(), 1);
        assert_eq!(storage.path(), Some(path.as_path()));
    }
}
