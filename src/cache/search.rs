//! Search Cache Module
//!
//! Caches search results under keys derived from the search parameters.
//! Parameters are defaulted and encoded in a fixed order, so equal searches
//! always land on the same key.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::cache::{CacheStats, Clock, ExpiringCache};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::storage::Store;

// == Defaults ==
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const DEFAULT_SORT_BY: &str = "relevance";
pub const DEFAULT_SORT_ORDER: &str = "desc";

// == Search Params ==
/// Parameters of one search request. Missing fields take the defaults above;
/// zero pages and empty sort fields count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn sort_order(mut self, order: impl Into<String>) -> Self {
        self.sort_order = Some(order.into());
        self
    }

    /// Query text with the default applied.
    pub fn query_text(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    // == Normalize ==
    /// Fixed-order encoding `[query, page, per_page, sort_by, sort_order]`
    /// with defaults filled in.
    pub fn normalized(&self) -> Value {
        let page = self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let per_page = self.per_page.filter(|p| *p > 0).unwrap_or(DEFAULT_PER_PAGE);
        let sort_by = self
            .sort_by
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT_BY);
        let sort_order = self
            .sort_order
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT_ORDER);

        json!([self.query_text(), page, per_page, sort_by, sort_order])
    }

    /// URL-safe token identifying these parameters (no namespace prefix).
    pub fn cache_token(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.normalized().to_string())
    }
}

// == Search Cache ==
/// Search-result cache: an [`ExpiringCache`] keyed by [`SearchParams`].
#[derive(Debug)]
pub struct SearchCache<S> {
    cache: ExpiringCache<S>,
}

impl<S: Store> SearchCache<S> {
    /// Creates a search cache with `config` (see [`CacheConfig::search`]).
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self {
            cache: ExpiringCache::new(store, config),
        }
    }

    pub fn with_clock(store: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: ExpiringCache::with_clock(store, config, clock),
        }
    }

    /// Full store key for `params`.
    pub fn key_for(&self, params: &SearchParams) -> String {
        self.cache.namespaced(&params.cache_token())
    }

    pub fn get<T: DeserializeOwned>(&mut self, params: &SearchParams) -> Option<T> {
        let results = self.cache.get(&params.cache_token());
        if results.is_some() {
            debug!("Cache hit for search: {:?}", params.query_text());
        }
        results
    }

    pub fn get_raw(&mut self, params: &SearchParams) -> Option<Value> {
        self.cache.get_raw(&params.cache_token())
    }

    /// Stores `results` for `params`, recording the query text in the entry.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        params: &SearchParams,
        results: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.cache.set_with_query(
            &params.cache_token(),
            results,
            ttl,
            params.query.clone(),
        )?;
        debug!("Cached search results for: {:?}", params.query_text());
        Ok(())
    }

    pub fn remove(&mut self, params: &SearchParams) {
        self.cache.remove(&params.cache_token());
    }

    pub fn clear(&mut self) -> usize {
        self.cache.clear()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn purge_expired(&mut self) -> usize {
        self.cache.purge_expired()
    }

    /// The underlying namespaced cache.
    pub fn inner(&self) -> &ExpiringCache<S> {
        &self.cache
    }
}
