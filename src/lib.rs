//! Expiring Cache - A namespaced key-value cache over a finite persistent store
//!
//! Entries carry a TTL and are dropped lazily once stale. When the store runs
//! out of room, the oldest entries are evicted to make space.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{ExpiringCache, SearchCache, SearchParams};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, StoreError};
pub use storage::{FileStore, MemoryStore, SharedStore, Store};
pub use tasks::spawn_cleanup_task;
