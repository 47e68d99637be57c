//! Blocking Cache Access
//!
//! Store calls can touch the disk, so cache work runs on tokio's blocking
//! pool while holding the cache's write lock.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{CacheError, Result};

/// Runs `f` on the blocking pool with exclusive access to `cache`.
///
/// The write guard is held until `f` returns, so concurrent callers stay
/// serialized exactly as with an in-place `write().await`.
pub async fn with_cache<C, F, R>(cache: &Arc<RwLock<C>>, f: F) -> Result<R>
where
    C: Send + Sync + 'static,
    F: FnOnce(&mut C) -> R + Send + 'static,
    R: Send + 'static,
{
    let mut guard = Arc::clone(cache).write_owned().await;
    tokio::task::spawn_blocking(move || f(&mut *guard))
        .await
        .map_err(|e| CacheError::Internal(format!("Cache task failed: {e}")))
}
