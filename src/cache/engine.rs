//! Cache Engine Module
//!
//! Namespaced expiring cache layered over a [`Store`]. Expired and corrupt
//! entries are deleted lazily on read and by sweeps; eviction runs only when
//! the store rejects a write for quota.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{evict, CacheEntry, CacheStats, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result, StoreError};
use crate::storage::{item_size, Store};

// == Expiring Cache ==
/// Expiring key-value cache over a finite store.
///
/// Every key is written as `prefix + key`; keys outside the prefix are never
/// read, counted or deleted.
#[derive(Debug)]
pub struct ExpiringCache<S> {
    /// Backing store
    store: S,
    /// Namespace settings
    config: CacheConfig,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Session counters
    counters: CacheStats,
}

impl<S: Store> ExpiringCache<S> {
    // == Constructor ==
    /// Creates a cache on the system clock and sweeps stale entries.
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a cache on `clock` and sweeps stale entries.
    pub fn with_clock(store: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let mut cache = Self {
            store,
            config,
            clock,
            counters: CacheStats::new(),
        };

        let cleaned = cache.purge_expired();
        if cleaned > 0 {
            info!(
                "Cleaned {} stale entries from namespace {}",
                cleaned, cache.config.prefix
            );
        }
        cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full store key for `key`.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    // == Get ==
    /// Returns the value under `key` decoded as `T`.
    ///
    /// Absent, expired, corrupt and unreadable entries all resolve to `None`;
    /// expired and corrupt ones are deleted. A payload that does not decode as
    /// `T` is left in place.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.get_raw(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!("Cached value for {} has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Returns the raw JSON payload under `key`.
    pub fn get_raw(&mut self, key: &str) -> Option<Value> {
        let full_key = self.namespaced(key);
        self.lookup(&full_key).map(|entry| entry.value)
    }

    fn lookup(&mut self, full_key: &str) -> Option<CacheEntry> {
        let raw = match self.store.read(full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss: {}", full_key);
                self.counters.record_miss();
                return None;
            }
            Err(e) => {
                warn!("Cache read for {} failed: {}", full_key, e);
                self.counters.record_miss();
                return None;
            }
        };

        let entry = match CacheEntry::decode(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Removing corrupt cache entry {}: {}", full_key, e);
                self.delete_quietly(full_key);
                self.counters.record_miss();
                return None;
            }
        };

        let now = self.clock.now_ms();
        if entry.is_expired(now) {
            debug!("Cache entry expired: {}", full_key);
            self.delete_quietly(full_key);
            self.counters.record_miss();
            return None;
        }

        debug!("Cache hit: {} ({} ms left)", full_key, entry.ttl_remaining_ms(now));
        self.counters.record_hit();
        Some(entry)
    }

    /// Returns true if `key` holds a fresh, decodable entry. Deletes nothing.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        matches!(
            self.store.read(&self.namespaced(key)),
            Ok(Some(raw)) if CacheEntry::decode(&raw).map(|e| !e.is_expired(now)).unwrap_or(false)
        )
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl` (the configured default if `None`).
    ///
    /// Fails without touching the store if the serialized entry exceeds the
    /// entry ceiling. If the store is full, runs one eviction pass and retries
    /// the write once.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.set_with_query(key, value, ttl, None)
    }

    pub(crate) fn set_with_query<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        query: Option<String>,
    ) -> Result<()> {
        let result = self
            .build_entry(value, ttl)
            .map(|entry| entry.with_query(query))
            .and_then(|entry| self.write_entry(key, &entry));

        if let Err(e) = &result {
            self.counters.record_rejected_write();
            warn!("Cache write for {}{} failed: {}", self.config.prefix, key, e);
        }
        result
    }

    fn build_entry<T: Serialize + ?Sized>(
        &self,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<CacheEntry> {
        let value = serde_json::to_value(value)?;
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        CacheEntry::new(value, self.clock.now_ms(), ttl)
    }

    fn write_entry(&mut self, key: &str, entry: &CacheEntry) -> Result<()> {
        let serialized = entry.encode()?;
        if serialized.len() > self.config.max_entry_bytes {
            return Err(CacheError::Oversized {
                size: serialized.len(),
                limit: self.config.max_entry_bytes,
            });
        }

        let full_key = self.namespaced(key);
        match self.store.write(&full_key, &serialized) {
            Ok(()) => Ok(()),
            Err(StoreError::QuotaExceeded { .. }) => {
                let needed = item_size(&full_key, &serialized);
                let report = evict(
                    &mut self.store,
                    &self.config.prefix,
                    self.config.eviction,
                    needed,
                );
                self.counters.record_evictions(report.evicted.len());
                info!(
                    "Store full: evicted {} entries ({} bytes), purged {} corrupt",
                    report.evicted.len(),
                    report.reclaimed_bytes,
                    report.purged_corrupt
                );

                self.store
                    .write(&full_key, &serialized)
                    .map_err(|e| match e {
                        StoreError::QuotaExceeded { .. } => CacheError::QuotaExceeded { needed },
                        other => CacheError::Store(other),
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    // == Remove ==
    /// Deletes `key`. Missing keys and store failures are not reported.
    pub fn remove(&mut self, key: &str) {
        let full_key = self.namespaced(key);
        self.delete_quietly(&full_key);
    }

    fn delete_quietly(&mut self, full_key: &str) {
        if let Err(e) = self.store.delete(full_key) {
            warn!("Cache delete for {} failed: {}", full_key, e);
        }
    }

    // == Clear ==
    /// Deletes every key under this namespace and returns how many went.
    pub fn clear(&mut self) -> usize {
        let keys = self.namespaced_keys();
        let removed = self.delete_batch(&keys);
        info!("Cleared {} entries from namespace {}", removed, self.config.prefix);
        removed
    }

    fn delete_batch(&mut self, keys: &[String]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        match self.store.delete_many(keys) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache batch delete of {} keys failed: {}", keys.len(), e);
                0
            }
        }
    }

    // == Stats ==
    /// Reports entry count and size under the namespace plus session counters.
    ///
    /// Expired entries are counted and left in place.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.counters.clone();
        for key in self.namespaced_keys() {
            if let Ok(Some(raw)) = self.store.read(&key) {
                stats.entries += 1;
                stats.total_bytes += raw.len();
            }
        }
        stats
    }

    // == Purge Expired ==
    /// Deletes expired and undecodable entries under the namespace.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();

        let stale: Vec<String> = self
            .namespaced_keys()
            .into_iter()
            .filter(|key| match self.store.read(key) {
                Ok(Some(raw)) => CacheEntry::decode(&raw)
                    .map(|entry| entry.is_expired(now))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    warn!("Sweep could not read {}: {}", key, e);
                    false
                }
            })
            .collect();

        self.delete_batch(&stale)
    }

    fn namespaced_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.config.prefix))
                .collect(),
            Err(e) => {
                warn!("Could not list store keys: {}", e);
                Vec::new()
            }
        }
    }
}
