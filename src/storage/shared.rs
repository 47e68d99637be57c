//! Shared Store Module
//!
//! Lets several caches in one process share a single backing store.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::storage::Store;

// == Shared Store ==
/// Cloneable handle to a store behind a mutex.
///
/// Each individual operation is atomic. Sequences of operations (such as the
/// read-evict-write in a cache `set`) are not.
#[derive(Debug)]
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> SharedStore<S> {
    /// Wraps `store` for sharing.
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Poisons the lock by panicking while holding it.
    #[cfg(test)]
    pub(crate) fn poison(&self)
    where
        S: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let _ = std::thread::spawn(move || {
            let _held = inner.lock();
            panic!("store holder panicked");
        })
        .join();
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl<S: Store> Store for SharedStore<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.write(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.lock()?.delete(key)
    }

    fn delete_many(&mut self, keys: &[String]) -> Result<usize, StoreError> {
        self.lock()?.delete_many(keys)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.lock()?.keys()
    }

    fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn used_bytes(&self) -> usize {
        self.lock().map(|s| s.used_bytes()).unwrap_or(0)
    }

    fn capacity(&self) -> usize {
        self.lock().map(|s| s.capacity()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_clones_see_same_items() {
        let mut a = SharedStore::new(MemoryStore::new(100));
        let b = a.clone();

        a.write("k", "v").unwrap();

        assert_eq!(b.read("k").unwrap(), Some("v".to_string()));
        assert_eq!(b.len(), 1);
        assert_eq!(b.used_bytes(), 2);
        assert_eq!(b.capacity(), 100);
    }

    #[test]
    fn test_poisoned_lock_reports_unavailable() {
        let mut store = SharedStore::new(MemoryStore::new(100));
        store.write("k", "v").unwrap();

        store.poison();

        assert!(matches!(store.read("k"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.write("k", "w"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.keys(), Err(StoreError::Unavailable(_))));
        assert_eq!(store.len(), 0);
    }
}
