//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, on top of
//! the sweep every cache runs when it is constructed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ExpiringCache, SearchCache};
use crate::storage::Store;
use crate::tasks::with_cache;

// == Sweep Trait ==
/// A cache whose stale entries can be swept.
pub trait Sweep {
    /// Deletes stale entries and returns how many were removed.
    fn sweep(&mut self) -> usize;
}

impl<S: Store> Sweep for ExpiringCache<S> {
    fn sweep(&mut self) -> usize {
        self.purge_expired()
    }
}

impl<S: Store> Sweep for SearchCache<S> {
    fn sweep(&mut self) -> usize {
        self.purge_expired()
    }
}

/// Spawns a background task that sweeps `cache` every `interval`.
///
/// The task runs until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(ExpiringCache::new(store, CacheConfig::default())));
/// let handle = spawn_cleanup_task(cache.clone(), "cache", Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<C>(
    cache: Arc<RwLock<C>>,
    name: &'static str,
    interval: Duration,
) -> JoinHandle<()>
where
    C: Sweep + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting expiry sweep for {} every {:?}", name, interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = match with_cache(&cache, C::sweep).await {
                Ok(removed) => removed,
                Err(e) => {
                    warn!("Expiry sweep ({}) failed: {}", name, e);
                    continue;
                }
            };

            if removed > 0 {
                info!("Expiry sweep ({}): removed {} stale entries", name, removed);
            } else {
                debug!("Expiry sweep ({}): nothing to remove", name);
            }
        }
    })
}
