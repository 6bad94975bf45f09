/// Key-value local storage backed by redb.
///
/// A browser-style `localStorage`: string keys mapped to string values
/// (typically JSON), kept in a single `local_storage` table so stores can
/// persist selected fields across restarts.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

/// Local storage table: key → raw text value.
const LOCAL_STORAGE: TableDefinition<&str, &str> = TableDefinition::new("local_storage");

/// File name of the storage database inside the data directory.
const DB_FILE_NAME: &str = "local-storage.redb";

/// Persistent string key-value storage.
pub struct LocalStorage {
    db: Database,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage").finish()
    }
}

impl LocalStorage {
    /// Returns the database path inside `data_dir`.
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DB_FILE_NAME)
    }

    /// Opens or creates the storage database in `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Self::open(&Self::db_path(data_dir))
    }

    /// Opens or creates the storage database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)
            .with_context(|| format!("Failed to open local storage: {}", path.display()))?;

        // Ensure the table exists
        let write_txn = db
            .begin_write()
            .context("Failed to begin initial storage write transaction")?;
        {
            let _ = write_txn
                .open_table(LOCAL_STORAGE)
                .context("Failed to create local_storage table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial storage transaction")?;

        Ok(Self { db })
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(LOCAL_STORAGE)
                .context("Failed to open local_storage table")?;
            table
                .insert(key, value)
                .with_context(|| format!("Failed to store item {key}"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit storage item")?;
        Ok(())
    }

    /// Loads the value stored under `key`, or `None` if absent.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(LOCAL_STORAGE)
            .context("Failed to open local_storage table")?;

        match table
            .get(key)
            .with_context(|| format!("Failed to read item {key}"))?
        {
            Some(guard) => Ok(Some(guard.value().to_string())),
            None => Ok(None),
        }
    }

    /// Removes `key`. Returns whether it existed.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        let existed = {
            let mut table = write_txn
                .open_table(LOCAL_STORAGE)
                .context("Failed to open local_storage table")?;
            let removed = table
                .remove(key)
                .with_context(|| format!("Failed to remove item {key}"))?;
            removed.is_some()
        };
        write_txn
            .commit()
            .context("Failed to commit item removal")?;
        Ok(existed)
    }

    /// Lists all stored keys in order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(LOCAL_STORAGE)
            .context("Failed to open local_storage table")?;

        let mut keys = Vec::new();
        for entry in table.iter().context("Failed to iterate local_storage")? {
            let (key, _) = entry.context("Failed to read storage entry")?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    /// Wipes every stored item.
    pub fn clear(&self) -> Result<()> {
        let keys = self.keys()?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(LOCAL_STORAGE)
                .context("Failed to open local_storage table")?;
            for key in &keys {
                let _ = table.remove(key.as_str());
            }
        }
        write_txn
            .commit()
            .context("Failed to commit storage clear")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_test_storage() -> (LocalStorage, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let storage = LocalStorage::open_in(dir.path()).expect("open local storage");
        (storage, dir)
    }

    #[test]
    fn test_get_missing_item() {
        let (storage, _dir) = open_test_storage();
        assert!(storage.get_item("nope").expect("get").is_none());
    }

    #[test]
    fn test_set_and_get_item() {
        let (storage, _dir) = open_test_storage();
        storage.set_item("CartStore:items", "[]").expect("set");
        assert_eq!(
            storage.get_item("CartStore:items").expect("get").as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_set_overwrites() {
        let (storage, _dir) = open_test_storage();
        storage.set_item("k", "one").expect("set");
        storage.set_item("k", "two").expect("set");
        assert_eq!(storage.get_item("k").expect("get").as_deref(), Some("two"));
        assert_eq!(storage.keys().expect("keys").len(), 1);
    }

    #[test]
    fn test_remove_item() {
        let (storage, _dir) = open_test_storage();
        storage.set_item("k", "v").expect("set");
        assert!(storage.remove_item("k").expect("remove"));
        assert!(!storage.remove_item("k").expect("remove again"));
        assert!(storage.get_item("k").expect("get").is_none());
    }

    #[test]
    fn test_keys_sorted() {
        let (storage, _dir) = open_test_storage();
        storage.set_item("b", "2").expect("set");
        storage.set_item("a", "1").expect("set");
        assert_eq!(storage.keys().expect("keys"), vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let (storage, _dir) = open_test_storage();
        storage.set_item("a", "1").expect("set");
        storage.set_item("b", "2").expect("set");
        storage.clear().expect("clear");
        assert!(storage.keys().expect("keys").is_empty());
    }

    #[test]
    fn test_special_characters_preserved() {
        let (storage, _dir) = open_test_storage();
        let value = "{\"name\":\"caf\u{e9} \\\"quoted\\\"\"}\n\ttabs";
        storage.set_item("weird", value).expect("set");
        assert_eq!(storage.get_item("weird").expect("get").as_deref(), Some(value));
    }
}
