//! Cache Statistics Module
//!
//! Snapshot of what a namespace holds, plus session counters for hits,
//! misses, evictions and rejected writes.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries physically present under the namespace (expired ones included)
    pub entries: usize,
    /// Combined length of the serialized entries
    pub total_bytes: usize,
    /// Successful reads this session
    pub hits: u64,
    /// Reads that found nothing usable (absent, expired or corrupt)
    pub misses: u64,
    /// Entries removed by the eviction policy
    pub evictions: u64,
    /// Writes that returned an error
    pub rejected_writes: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.total_bytes as f64 / 1024.0
    }

    pub fn size_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }

    // == Counters ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_rejected_write(&mut self) {
        self.rejected_writes += 1;
    }
}
