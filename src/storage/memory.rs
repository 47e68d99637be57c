//! In-Memory Store Module
//!
//! Quota-enforcing store backed by an ordered map.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::storage::{item_size, Store};

// == Memory Store ==
/// In-memory [`Store`] with a byte quota.
///
/// Keys iterate in lexicographic order.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Raw items
    items: BTreeMap<String, String>,
    /// Bytes currently used
    used: usize,
    /// Byte budget
    capacity: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store with the given byte budget.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            used: 0,
            capacity,
        }
    }

    /// Builds a store from existing items without checking the quota.
    ///
    /// Usage may start above capacity; writes then fail until space is freed.
    pub fn from_items(capacity: usize, items: BTreeMap<String, String>) -> Self {
        let used = items.iter().map(|(k, v)| item_size(k, v)).sum();
        Self {
            items,
            used,
            capacity,
        }
    }

    /// Borrows the raw items.
    pub fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    /// Removes `key` and returns its value.
    pub(crate) fn take(&mut self, key: &str) -> Option<String> {
        let old = self.items.remove(key)?;
        self.used -= item_size(key, &old);
        Some(old)
    }

    /// Puts `key` back to `previous` without a quota check.
    pub(crate) fn restore(&mut self, key: &str, previous: Option<String>) {
        if let Some(old) = self.items.remove(key) {
            self.used -= item_size(key, &old);
        }
        if let Some(value) = previous {
            self.used += item_size(key, &value);
            self.items.insert(key.to_string(), value);
        }
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let released = self
            .items
            .get(key)
            .map(|old| item_size(key, old))
            .unwrap_or(0);
        let needed = item_size(key, value);
        let available = self.capacity.saturating_sub(self.used - released);

        if needed > available {
            return Err(StoreError::QuotaExceeded { needed, available });
        }

        self.items.insert(key.to_string(), value.to_string());
        self.used = self.used - released + needed;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.take(key);
        Ok(())
    }

    fn delete_many(&mut self, keys: &[String]) -> Result<usize, StoreError> {
        Ok(keys.iter().filter(|key| self.take(key).is_some()).count())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.items.keys().cloned().collect())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn used_bytes(&self) -> usize {
        self.used
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
