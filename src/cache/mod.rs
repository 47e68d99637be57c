//! Cache Module
//!
//! Namespaced expiring cache over a finite store, with quota-driven eviction
//! and a search-result adapter.

mod clock;
mod engine;
mod entry;
mod eviction;
mod search;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::ExpiringCache;
pub use entry::CacheEntry;
pub use eviction::{evict, EvictionPolicy, EvictionReport, DEFAULT_EVICTION_FRACTION};
pub use search::{SearchCache, SearchParams};
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes for keys supplied over HTTP
pub const MAX_KEY_LENGTH: usize = 256;
