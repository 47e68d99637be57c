//! Eviction Module
//!
//! Reclaims store space when a write is rejected for quota. Entries are
//! removed oldest-first by their `stored_at` time.

use std::str::FromStr;

use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::storage::{item_size, Store};

// == Public Constants ==
/// Share of entries removed by [`EvictionPolicy::Fraction`] when unconfigured
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.25;

// == Eviction Policy ==
/// How much to remove once the store reports it is full.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EvictionPolicy {
    /// Remove oldest entries until their combined footprint covers the
    /// pending write.
    #[default]
    ByteTarget,
    /// Remove `ceil(len * share)` oldest entries regardless of size.
    Fraction(f64),
}

impl FromStr for EvictionPolicy {
    type Err = String;

    /// Accepts `bytes`, `fraction`, or `fraction:<share>` (share in `(0, 1]`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bytes" | "byte_target" => Ok(Self::ByteTarget),
            "fraction" => Ok(Self::Fraction(DEFAULT_EVICTION_FRACTION)),
            other => match other.strip_prefix("fraction:") {
                Some(share) => share
                    .parse::<f64>()
                    .ok()
                    .filter(|f| *f > 0.0 && *f <= 1.0)
                    .map(Self::Fraction)
                    .ok_or_else(|| format!("Invalid eviction fraction: {}", share)),
                None => Err(format!("Unknown eviction policy: {}", other)),
            },
        }
    }
}

// == Eviction Report ==
/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Evicted store keys, oldest first
    pub evicted: Vec<String>,
    /// Footprint released by the evicted entries
    pub reclaimed_bytes: usize,
    /// Undecodable entries deleted along the way (not counted as reclaimed)
    pub purged_corrupt: usize,
}

/// Candidate for eviction.
struct Candidate {
    key: String,
    stored_at: u64,
    size: usize,
}

// == Evict ==
/// Runs one eviction pass over keys under `prefix`.
///
/// `bytes_needed` is the footprint of the write that triggered eviction; it
/// is only consulted by [`EvictionPolicy::ByteTarget`]. Ties in `stored_at`
/// keep the store's key order.
pub fn evict<S: Store + ?Sized>(
    store: &mut S,
    prefix: &str,
    policy: EvictionPolicy,
    bytes_needed: usize,
) -> EvictionReport {
    let mut report = EvictionReport::default();

    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Eviction could not list store keys: {}", e);
            return report;
        }
    };

    let mut candidates = Vec::new();
    let mut corrupt = Vec::new();
    for key in keys.into_iter().filter(|k| k.starts_with(prefix)) {
        let raw = match store.read(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                warn!("Eviction could not read {}: {}", key, e);
                continue;
            }
        };

        match CacheEntry::decode(&raw) {
            Ok(entry) => candidates.push(Candidate {
                size: item_size(&key, &raw),
                stored_at: entry.stored_at,
                key,
            }),
            Err(_) => corrupt.push(key),
        }
    }

    // Stable: equal timestamps keep key order
    candidates.sort_by_key(|c| c.stored_at);

    let limit = match policy {
        EvictionPolicy::ByteTarget => candidates.len(),
        EvictionPolicy::Fraction(share) => {
            let share = share.clamp(0.0, 1.0);
            ((candidates.len() as f64 * share).ceil() as usize).min(candidates.len())
        }
    };

    let mut victims = Vec::new();
    let mut reclaimed = 0;
    for candidate in candidates.into_iter().take(limit) {
        if policy == EvictionPolicy::ByteTarget && reclaimed >= bytes_needed {
            break;
        }
        debug!(
            "Evicting {} (stored_at={}, {} bytes)",
            candidate.key, candidate.stored_at, candidate.size
        );
        reclaimed += candidate.size;
        victims.push(candidate.key);
    }

    let mut batch = corrupt.clone();
    batch.extend(victims.iter().cloned());
    if batch.is_empty() {
        return report;
    }

    // One batch, so a persistent store commits once per pass
    match store.delete_many(&batch) {
        Ok(_) => {
            report.purged_corrupt = corrupt.len();
            report.reclaimed_bytes = reclaimed;
            report.evicted = victims;
        }
        Err(e) => warn!("Eviction could not delete {} entries: {}", batch.len(), e),
    }

    report
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    const PREFIX: &str = "p_";

    fn seed(store: &mut MemoryStore, key: &str, stored_at: u64) -> usize {
        let raw = CacheEntry::new(json!("x"), stored_at, Duration::from_secs(60))
            .unwrap()
            .encode()
            .unwrap();
        let full = format!("{}{}", PREFIX, key);
        store.write(&full, &raw).unwrap();
        item_size(&full, &raw)
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("bytes".parse(), Ok(EvictionPolicy::ByteTarget));
        assert_eq!("FRACTION".parse(), Ok(EvictionPolicy::Fraction(0.25)));
        assert_eq!("fraction:0.5".parse(), Ok(EvictionPolicy::Fraction(0.5)));
        assert!("fraction:0".parse::<EvictionPolicy>().is_err());
        assert!("fraction:2".parse::<EvictionPolicy>().is_err());
        assert!("lru".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_byte_target_removes_oldest_until_covered() {
        let mut store = MemoryStore::new(10_000);
        let size = seed(&mut store, "c", 300);
        seed(&mut store, "a", 100);
        seed(&mut store, "b", 200);

        // Needs a bit more than one entry
        let report = evict(&mut store, PREFIX, EvictionPolicy::ByteTarget, size + 1);

        assert_eq!(report.evicted, vec!["p_a", "p_b"]);
        assert_eq!(report.reclaimed_bytes, 2 * size);
        assert_eq!(store.keys().unwrap(), vec!["p_c"]);
    }

    #[test]
    fn test_fraction_removes_ceil_quarter() {
        let mut store = MemoryStore::new(10_000);
        for (i, key) in ["e", "d", "c", "b", "a"].iter().enumerate() {
            seed(&mut store, key, i as u64);
        }

        // ceil(5 / 4) = 2, regardless of bytes needed
        let report = evict(&mut store, PREFIX, EvictionPolicy::Fraction(0.25), 0);

        assert_eq!(report.evicted, vec!["p_e", "p_d"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_ties_keep_key_order() {
        let mut store = MemoryStore::new(10_000);
        seed(&mut store, "b", 5);
        seed(&mut store, "a", 5);
        seed(&mut store, "c", 5);

        let report = evict(&mut store, PREFIX, EvictionPolicy::ByteTarget, 1);
        assert_eq!(report.evicted, vec!["p_a"]);
    }

    #[test]
    fn test_corrupt_entries_purged_not_counted() {
        let mut store = MemoryStore::new(10_000);
        store.write("p_bad", "{{{").unwrap();
        let size = seed(&mut store, "good", 1);

        let report = evict(&mut store, PREFIX, EvictionPolicy::ByteTarget, 1);

        assert_eq!(report.purged_corrupt, 1);
        assert_eq!(report.evicted, vec!["p_good"]);
        assert_eq!(report.reclaimed_bytes, size);
        assert!(store.is_empty());
    }

    #[test]
    fn test_other_namespaces_untouched() {
        let mut store = MemoryStore::new(10_000);
        store.write("other_key", "{{{").unwrap();
        seed(&mut store, "a", 1);

        evict(&mut store, PREFIX, EvictionPolicy::Fraction(1.0), 0);

        assert_eq!(store.keys().unwrap(), vec!["other_key"]);
    }
}
