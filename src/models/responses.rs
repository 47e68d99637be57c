//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operations (PUT /set, PUT /search)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Entries removed across both namespaces
    pub removed: usize,
}

/// Cached search results (GET /search)
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Full store key the results live under
    pub key: String,
    pub results: Value,
}

/// Statistics of one namespace
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    pub entries: usize,
    pub total_bytes: usize,
    /// Size in KB, two decimals
    pub size_kb: String,
    /// Size in MB, two decimals
    pub size_mb: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub rejected_writes: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for NamespaceStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            entries: stats.entries,
            total_bytes: stats.total_bytes,
            size_kb: format!("{:.2}", stats.size_kb()),
            size_mb: format!("{:.2}", stats.size_mb()),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            rejected_writes: stats.rejected_writes,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: NamespaceStats,
    pub search: NamespaceStats,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, search: CacheStats) -> Self {
        Self {
            cache: cache.into(),
            search: search.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
