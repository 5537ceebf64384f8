//! Time-bounded result cache.
//!
//! Entries expire `ttl` after they were stored. Expired entries are only
//! evicted when they are looked up again; there is no background sweep.

use crate::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default entry lifetime, one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Build a cache key from an operation name and its query shape.
///
/// The shape goes through `serde_json::Value`, whose maps keep keys sorted,
/// so two equal shapes always produce the same key.
pub fn cache_key<Q: Serialize>(op: &str, shape: &Q) -> Result<String> {
    let value = serde_json::to_value(shape)?;
    Ok(format!("{}:{}", op, value))
}

#[derive(Debug)]
pub struct ResultCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

#[derive(Debug)]
struct Entry<V> {
    stored_at: Instant,
    value: V,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`, evicting it if it has expired.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.stored_at) > self.ttl,
        };
        if expired {
            entries.remove(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: String, value: V) {
        self.set_at(key, value, Instant::now());
    }

    pub fn set_at(&self, key: String, value: V, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            Entry {
                stored_at: now,
                value,
            },
        );
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_miss_when_never_set() {
        let cache: ResultCache<u32> = ResultCache::default();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResultCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache.set_at("k".to_string(), vec![1, 2], start);
        assert_eq!(
            cache.get_at("k", start + Duration::from_secs(10)),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn test_expired_entry_is_evicted_on_access() {
        let cache = ResultCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache.set_at("k".to_string(), 7, start);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get_at("k", start + Duration::from_secs(11)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_ignores_field_order() {
        let a = json!({"query": "rust", "boardId": "wb-1"});
        let b = json!({"boardId": "wb-1", "query": "rust"});
        assert_eq!(
            cache_key("cards", &a).unwrap(),
            cache_key("cards", &b).unwrap()
        );
        assert_ne!(
            cache_key("cards", &a).unwrap(),
            cache_key("boards", &a).unwrap()
        );
    }
}
