//! API Handlers
//!
//! HTTP request handlers exposing the cache to collaborators.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{ExpiringCache, SearchCache, SearchParams};
use crate::config::{CacheConfig, Config};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, SearchResponse, SearchSetRequest,
    SetRequest, SetResponse, StatsResponse,
};
use crate::storage::{FileStore, MemoryStore, SharedStore, Store};
use crate::tasks::with_cache;

/// The store both namespaces share.
pub type AppStore = SharedStore<Box<dyn Store + Send>>;

/// Application state shared across all handlers.
///
/// One generic cache and one search cache, both over the same store. The two
/// prefixes must not overlap; [`AppState::from_config`] checks this.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<ExpiringCache<AppStore>>>,
    pub search: Arc<RwLock<SearchCache<AppStore>>>,
}

impl AppState {
    /// Creates both caches over `store`.
    pub fn new<S>(store: S, cache_config: CacheConfig, search_config: CacheConfig) -> Self
    where
        S: Store + Send + 'static,
    {
        let shared: AppStore = SharedStore::new(Box::new(store) as Box<dyn Store + Send>);
        Self {
            cache: Arc::new(RwLock::new(ExpiringCache::new(shared.clone(), cache_config))),
            search: Arc::new(RwLock::new(SearchCache::new(shared, search_config))),
        }
    }

    /// Creates the state from configuration.
    ///
    /// Rejects overlapping prefixes, then opens the file store at
    /// `store_path` or falls back to memory.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let (cache_config, search_config) = (config.cache_config(), config.search_config());

        match &config.store_path {
            Some(path) => {
                let store = FileStore::open(path, config.store_capacity)?;
                info!(
                    "Opened file store {} ({} items, {} bytes used)",
                    path.display(),
                    store.len(),
                    store.used_bytes()
                );
                Ok(Self::new(store, cache_config, search_config))
            }
            None => {
                warn!("STORE_PATH not set; cached entries will not survive a restart");
                let store = MemoryStore::new(config.store_capacity);
                Ok(Self::new(store, cache_config, search_config))
            }
        }
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SetRequest { key, value, ttl } = req;
    let response = SetResponse::new(key.clone());
    with_cache(&state.cache, move |cache| {
        cache.set(&key, &value, ttl.map(Duration::from_secs))
    })
    .await??;

    Ok(Json(response))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Exclusive: reads may delete stale entries and bump counters
    let lookup = key.clone();
    match with_cache(&state.cache, move |cache| cache.get_raw(&lookup)).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    with_cache(&state.cache, move |cache| cache.remove(&target)).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let removed = with_cache(&state.cache, |cache| cache.clear()).await?
        + with_cache(&state.search, |search| search.clear()).await?;
    Ok(Json(ClearResponse { removed }))
}

/// Handler for GET /stats
///
/// Stats only read the store, which never touches the disk.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await.stats();
    let search = state.search.read().await.stats();
    Json(StatsResponse::new(cache, search))
}

/// Handler for GET /search
pub async fn search_get_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = params.map_err(|e| CacheError::InvalidRequest(e.body_text()))?;

    let (key, found) = with_cache(&state.search, move |search| {
        (search.key_for(&params), search.get_raw(&params))
    })
    .await?;

    match found {
        Some(results) => Ok(Json(SearchResponse { key, results })),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /search
pub async fn search_set_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchSetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SearchSetRequest {
        params,
        results,
        ttl,
    } = req;
    let key = with_cache(&state.search, move |search| {
        search
            .set(&params, &results, ttl.map(Duration::from_secs))
            .map(|()| search.key_for(&params))
    })
    .await??;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
