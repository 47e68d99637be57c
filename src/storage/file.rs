//! File Store Module
//!
//! Quota-enforcing store persisted as a single JSON object on disk, so entries
//! survive process restarts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::storage::{MemoryStore, Store};

// == File Store ==
/// File-backed [`Store`].
///
/// Every mutation is flushed before returning; a batch delete is flushed
/// once. The file is replaced atomically (write to a sibling temp file, then
/// rename). If the flush fails the in-memory mutation is rolled back.
#[derive(Debug)]
pub struct FileStore {
    /// Backing file location
    path: PathBuf,
    /// In-memory mirror with quota accounting
    inner: MemoryStore,
}

impl FileStore {
    // == Open ==
    /// Opens (or creates) a store at `path` with the given byte budget.
    ///
    /// A missing file starts empty. An unreadable or malformed file is logged
    /// and also starts empty; it is overwritten on the next mutation.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let items = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Store file {} is malformed, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Store file {} is unreadable, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        debug!("Opened store {} with {} items", path.display(), items.len());

        Ok(Self {
            path,
            inner: MemoryStore::from_items(capacity, items),
        })
    }

    // == Flush ==
    fn flush(&self) -> Result<(), StoreError> {
        let contents =
            serde_json::to_string(self.inner.items()).map_err(|e| StoreError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");

        fs::write(&tmp, contents).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Applies `mutation`, flushes, and rolls `key` back on flush failure.
    fn mutate<F>(&mut self, key: &str, mutation: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(), StoreError>,
    {
        let previous = self.inner.read(key)?;
        mutation(&mut self.inner)?;

        if let Err(e) = self.flush() {
            self.inner.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(key, |inner| inner.write(key, value))
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.inner.read(key)?.is_none() {
            return Ok(());
        }
        self.mutate(key, |inner| inner.delete(key))
    }

    fn delete_many(&mut self, keys: &[String]) -> Result<usize, StoreError> {
        let removed: Vec<(&String, String)> = keys
            .iter()
            .filter_map(|key| self.inner.take(key).map(|old| (key, old)))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.flush() {
            for (key, old) in removed {
                self.inner.restore(key, Some(old));
            }
            return Err(e);
        }
        Ok(removed.len())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn used_bytes(&self) -> usize {
        self.inner.used_bytes()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut store = FileStore::open(&path, 1024).unwrap();
            store.write("k1", "v1").unwrap();
            store.write("k2", "v2").unwrap();
            store.delete("k1").unwrap();
        }

        let store = FileStore::open(&path, 1024).unwrap();
        assert_eq!(store.read("k1").unwrap(), None);
        assert_eq!(store.read("k2").unwrap(), Some("v2".to_string()));
        assert_eq!(store.used_bytes(), 4);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.json");

        let mut store = FileStore::open(&path, 1024).unwrap();
        store.write("k", "v").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = FileStore::open(&path, 1024).unwrap();
        assert!(store.is_empty());

        store.write("k", "v").unwrap();
        let reopened = FileStore::open(&path, 1024).unwrap();
        assert_eq!(reopened.read("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_quota_is_enforced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(&path, 8).unwrap();
        store.write("a", "123").unwrap();

        let result = store.write("b", "123456");
        assert!(matches!(result, Err(StoreError::QuotaExceeded { .. })));

        let reopened = FileStore::open(&path, 8).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_delete_many_persists_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(&path, 1024).unwrap();
        for key in ["a", "b", "c"] {
            store.write(key, "v").unwrap();
        }

        let batch = vec!["a".to_string(), "c".to_string(), "zz".to_string()];
        assert_eq!(store.delete_many(&batch).unwrap(), 2);

        let reopened = FileStore::open(&path, 1024).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_delete_many_rolls_back_on_flush_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path, 1024).unwrap();
        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();

        fs::remove_dir_all(dir.path().join("nested")).unwrap();

        let batch = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(store.delete_many(&batch), Err(StoreError::Io(_))));
        assert_eq!(store.len(), 2);
        assert_eq!(store.used_bytes(), 4);
    }

    #[test]
    fn test_delete_missing_key_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(&path, 8).unwrap();
        store.delete("missing").unwrap();

        assert!(!path.exists());
    }
}
