//! Storage Module
//!
//! The persistent, finite key-value substrate the cache is layered on.
//! Stores know nothing about expiration; they only hold strings and enforce
//! a byte quota.

mod file;
mod memory;
mod shared;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use shared::SharedStore;

use crate::error::StoreError;

// == Public Constants ==
/// Default store budget in bytes (the usual browser local storage allowance)
pub const DEFAULT_CAPACITY: usize = 5 * 1024 * 1024; // 5 MB

// == Store Trait ==
/// A synchronous, string-keyed, string-valued map with finite capacity.
///
/// An item occupies `key.len() + value.len()` bytes. A write that would push
/// usage past [`Store::capacity`] fails with [`StoreError::QuotaExceeded`].
/// Key iteration order is deterministic.
pub trait Store {
    /// Returns the raw value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`. Deleting a missing key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    /// Deletes every key in `keys` as one batch and returns how many existed.
    ///
    /// Persistent stores override this to commit the batch once.
    fn delete_many(&mut self, keys: &[String]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in keys {
            if self.read(key)?.is_some() {
                self.delete(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Lists every key currently held, in iteration order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Number of items held.
    fn len(&self) -> usize;

    /// Returns true if the store holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently in use.
    fn used_bytes(&self) -> usize;

    /// Total byte budget.
    fn capacity(&self) -> usize;
}

/// Footprint of one item as counted against the quota.
pub fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn delete_many(&mut self, keys: &[String]) -> Result<usize, StoreError> {
        (**self).delete_many(keys)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn used_bytes(&self) -> usize {
        (**self).used_bytes()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}
