//! Configuration Module
//!
//! Cache namespace settings, and the service configuration loaded from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};
use crate::storage::DEFAULT_CAPACITY;

// == Public Constants ==
/// Namespace prefix of the generic cache
pub const DEFAULT_PREFIX: &str = "cmr_cache_";

/// Namespace prefix of the search-result cache
pub const SEARCH_PREFIX: &str = "cmr_search_";

/// Default lifetime of generic entries (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default lifetime of search entries (15 minutes)
pub const SEARCH_TTL: Duration = Duration::from_secs(15 * 60);

/// True if either prefix starts with the other, in which case one namespace
/// would list, sweep and evict the other's keys.
pub fn prefixes_overlap(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

// == Cache Config ==
/// Parameters of one cache namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Prefix partitioning this cache's keys in the shared store
    pub prefix: String,
    /// TTL applied when `set` is given none
    pub default_ttl: Duration,
    /// Largest serialized entry accepted
    pub max_entry_bytes: usize,
    /// What to remove when the store is full
    pub eviction: EvictionPolicy,
}

impl CacheConfig {
    /// Creates a config for `prefix`; the entry ceiling is a tenth of the
    /// default store budget.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            default_ttl: DEFAULT_TTL,
            max_entry_bytes: DEFAULT_CAPACITY / 10,
            eviction: EvictionPolicy::default(),
        }
    }

    /// Config of the search-result namespace.
    pub fn search() -> Self {
        Self::new(SEARCH_PREFIX).with_default_ttl(SEARCH_TTL)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_entry_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_bytes = bytes;
        self
    }

    /// Sizes the entry ceiling as a tenth of `capacity`.
    pub fn with_store_capacity(self, capacity: usize) -> Self {
        self.with_max_entry_bytes(capacity / 10)
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

// == Service Config ==
/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generic namespace prefix
    pub cache_prefix: String,
    /// Search namespace prefix
    pub search_prefix: String,
    /// Default TTL in seconds for generic entries
    pub default_ttl: u64,
    /// Default TTL in seconds for search entries
    pub search_ttl: u64,
    /// Store budget in bytes
    pub store_capacity: usize,
    /// Backing file; `None` keeps the store in memory
    pub store_path: Option<PathBuf>,
    /// Eviction policy for both namespaces
    pub eviction: EvictionPolicy,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Generic namespace prefix (default: `cmr_cache_`)
    /// - `SEARCH_PREFIX` - Search namespace prefix (default: `cmr_search_`)
    /// - `DEFAULT_TTL` - Generic TTL in seconds (default: 1800)
    /// - `SEARCH_TTL` - Search TTL in seconds (default: 900)
    /// - `STORE_CAPACITY` - Store budget in bytes (default: 5 MB)
    /// - `STORE_PATH` - Backing file (default: unset, in-memory)
    /// - `EVICTION_POLICY` - `bytes`, `fraction` or `fraction:<share>` (default: bytes)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    ///
    /// Overlapping prefixes are replaced by the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            cache_prefix: env::var("CACHE_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.cache_prefix),
            search_prefix: env::var("SEARCH_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.search_prefix),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.default_ttl),
            search_ttl: env::var("SEARCH_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.search_ttl),
            store_capacity: env::var("STORE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.store_capacity),
            store_path: env::var("STORE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            eviction: env::var("EVICTION_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eviction),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cleanup_interval),
        };
        config.with_disjoint_prefixes()
    }

    /// Falls back to the default prefixes if the configured ones overlap.
    pub fn with_disjoint_prefixes(mut self) -> Self {
        if prefixes_overlap(&self.cache_prefix, &self.search_prefix) {
            warn!(
                "Prefixes {:?} and {:?} overlap, using {:?} and {:?}",
                self.cache_prefix, self.search_prefix, DEFAULT_PREFIX, SEARCH_PREFIX
            );
            self.cache_prefix = DEFAULT_PREFIX.to_string();
            self.search_prefix = SEARCH_PREFIX.to_string();
        }
        self
    }

    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if prefixes_overlap(&self.cache_prefix, &self.search_prefix) {
            return Err(CacheError::InvalidConfig(format!(
                "prefixes {:?} and {:?} overlap",
                self.cache_prefix, self.search_prefix
            )));
        }
        Ok(())
    }

    /// Settings of the generic namespace.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache_prefix.clone())
            .with_default_ttl(Duration::from_secs(self.default_ttl))
            .with_store_capacity(self.store_capacity)
            .with_eviction(self.eviction)
    }

    /// Settings of the search namespace.
    pub fn search_config(&self) -> CacheConfig {
        CacheConfig::new(self.search_prefix.clone())
            .with_default_ttl(Duration::from_secs(self.search_ttl))
            .with_store_capacity(self.store_capacity)
            .with_eviction(self.eviction)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_PREFIX.to_string(),
            search_prefix: SEARCH_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL.as_secs(),
            search_ttl: SEARCH_TTL.as_secs(),
            store_capacity: DEFAULT_CAPACITY,
            store_path: None,
            eviction: EvictionPolicy::ByteTarget,
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.prefix, "cmr_cache_");
        assert_eq!(config.default_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_entry_bytes, 524_288);
        assert_eq!(config.eviction, EvictionPolicy::ByteTarget);
    }

    #[test]
    fn test_search_config() {
        let config = CacheConfig::search();
        assert_eq!(config.prefix, "cmr_search_");
        assert_eq!(config.default_ttl, Duration::from_secs(900));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, 1800);
        assert_eq!(config.search_ttl, 900);
        assert_eq!(config.store_capacity, 5 * 1024 * 1024);
        assert!(config.store_path.is_none());
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
    }

    #[test]
    fn test_namespace_configs_follow_service_config() {
        let config = Config {
            store_capacity: 1000,
            default_ttl: 10,
            eviction: EvictionPolicy::Fraction(0.5),
            ..Config::default()
        };

        let cache = config.cache_config();
        assert_eq!(cache.max_entry_bytes, 100);
        assert_eq!(cache.default_ttl, Duration::from_secs(10));
        assert_eq!(cache.eviction, EvictionPolicy::Fraction(0.5));

        let search = config.search_config();
        assert_eq!(search.prefix, "cmr_search_");
        assert_eq!(search.default_ttl, Duration::from_secs(900));
    }

    #[test]
    fn test_prefixes_overlap() {
        assert!(prefixes_overlap("cmr_", "cmr_search_"));
        assert!(prefixes_overlap("cmr_search_", "cmr_"));
        assert!(prefixes_overlap("same_", "same_"));
        assert!(prefixes_overlap("", "cmr_search_"));
        assert!(!prefixes_overlap(DEFAULT_PREFIX, SEARCH_PREFIX));
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let config = Config {
            cache_prefix: "cmr_".to_string(),
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));

        let fixed = config.with_disjoint_prefixes();
        assert_eq!(fixed.cache_prefix, DEFAULT_PREFIX);
        assert_eq!(fixed.search_prefix, SEARCH_PREFIX);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_disjoint_custom_prefixes_kept() {
        let config = Config {
            cache_prefix: "app_cache_".to_string(),
            search_prefix: "app_search_".to_string(),
            ..Config::default()
        }
        .with_disjoint_prefixes();

        assert_eq!(config.cache_prefix, "app_cache_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "CACHE_PREFIX",
            "SEARCH_PREFIX",
            "DEFAULT_TTL",
            "SEARCH_TTL",
            "STORE_CAPACITY",
            "STORE_PATH",
            "EVICTION_POLICY",
            "SERVER_PORT",
            "CLEANUP_INTERVAL",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.cache_prefix, "cmr_cache_");
        assert_eq!(config.default_ttl, 1800);
        assert_eq!(config.eviction, EvictionPolicy::ByteTarget);
        assert_eq!(config.server_port, 3000);
        assert!(config.store_path.is_none());
    }
}
