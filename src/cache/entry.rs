//! Cache Entry Module
//!
//! Defines the persisted record for individual cache entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// A single cache entry as written to the store.
///
/// Serialized as `{"value", "storedAt", "expiresAt"}`. Records written by the
/// older browser helpers (`results`, `timestamp`, `expires`) decode too; a
/// record with no stored-at time decodes as the oldest possible entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The cached payload
    #[serde(alias = "results")]
    pub value: Value,
    /// Write timestamp (Unix milliseconds)
    #[serde(alias = "timestamp", default)]
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    #[serde(alias = "expires")]
    pub expires_at: u64,
    /// Raw query text, set by the search adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored at `now_ms` that lives for `ttl`.
    ///
    /// A zero TTL is rejected: `expires_at` must be strictly after `stored_at`.
    pub fn new(value: Value, now_ms: u64, ttl: Duration) -> Result<Self> {
        let ttl_ms = ttl.as_millis().min(u64::MAX as u128) as u64;
        if ttl_ms == 0 {
            return Err(CacheError::InvalidTtl);
        }

        Ok(Self {
            value,
            stored_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            query: None,
        })
    }

    /// Attaches the originating query text.
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    // == Is Expired ==
    /// An entry is stale once `now_ms` reaches `expires_at`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    // == Codec ==
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(json!("v"), 1_000, Duration::from_secs(60)).unwrap();

        assert_eq!(entry.stored_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
        assert!(entry.expires_at > entry.stored_at);
        assert!(entry.query.is_none());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = CacheEntry::new(json!(1), 1_000, Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidTtl)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(json!(1), 0, Duration::from_millis(10)).unwrap();

        assert!(!entry.is_expired(9));
        assert!(entry.is_expired(10), "Entry should be expired at boundary");
        assert!(entry.is_expired(11));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new(json!(1), 0, Duration::from_millis(10)).unwrap();

        assert_eq!(entry.ttl_remaining_ms(4), 6);
        assert_eq!(entry.ttl_remaining_ms(50), 0);
    }

    #[test]
    fn test_persisted_layout() {
        let entry = CacheEntry::new(json!([1, 2]), 5, Duration::from_millis(10)).unwrap();
        let raw = entry.encode().unwrap();

        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!({"value": [1, 2], "storedAt": 5, "expiresAt": 15}));
    }

    #[test]
    fn test_query_serialized_when_present() {
        let entry = CacheEntry::new(json!([]), 5, Duration::from_millis(10))
            .unwrap()
            .with_query(Some("gas".to_string()));
        let raw = entry.encode().unwrap();

        assert!(raw.contains(r#""query":"gas""#));
        assert_eq!(CacheEntry::decode(&raw).unwrap(), entry);
    }

    #[test]
    fn test_decode_legacy_search_record() {
        let raw = r#"{"results":[{"id":1}],"expires":2000,"query":"gas","timestamp":1000}"#;
        let entry = CacheEntry::decode(raw).unwrap();

        assert_eq!(entry.value, json!([{"id": 1}]));
        assert_eq!(entry.stored_at, 1000);
        assert_eq!(entry.expires_at, 2000);
        assert_eq!(entry.query.as_deref(), Some("gas"));
    }

    #[test]
    fn test_decode_legacy_record_without_timestamp() {
        let entry = CacheEntry::decode(r#"{"value":"x","expires":2000}"#).unwrap();
        assert_eq!(entry.stored_at, 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(CacheEntry::decode("not json").is_err());
        assert!(CacheEntry::decode("null").is_err());
        assert!(CacheEntry::decode(r#"{"value":1}"#).is_err());
    }
}
