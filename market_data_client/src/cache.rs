//! Response-cache collaborator.
//!
//! The acquisition client treats the cache as an externally atomic key-value
//! store: token and response entries are read and written by any concurrent
//! request without additional locking. Production deployments plug in a
//! Redis-backed implementation; [`MemoryCache`] ships for tests and
//! single-process embedding.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Key-value cache with per-entry TTL and glob-style pattern deletion.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`. `ttl = None` means no expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str);

    /// Removes every key matching `pattern` (`*` wildcards, Redis `KEYS`
    /// style) and returns the number removed.
    async fn delete_by_pattern(&self, pattern: &str) -> usize;
}

/// Fetches and deserializes a JSON value, deleting entries that no longer
/// decode (schema drift between releases).
pub async fn get_json<T: DeserializeOwned>(cache: &dyn ResponseCache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "dropping undecodable cache entry");
            cache.delete(key).await;
            None
        }
    }
}

/// Serializes and stores a JSON value. Serialization failures are logged and
/// swallowed; a cache write must never fail the request it rides on.
pub async fn set_json<T: Serialize>(
    cache: &dyn ResponseCache,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, raw, ttl).await,
        Err(error) => warn!(key, %error, "failed to serialize cache entry"),
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`ResponseCache`] with lazy expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Matches a Redis-style glob pattern where `*` spans any substring.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    let first = parts[0];
    if !first.is_empty() {
        match rest.strip_prefix(first) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    let last = parts[parts.len() - 1];
    if !last.is_empty() {
        match rest.strip_suffix(last) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(key);
    }

    async fn delete_by_pattern(&self, pattern: &str) -> usize {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let keys: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), None).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".into(), Some(Duration::from_millis(0)))
            .await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn pattern_delete_removes_matching_keys() {
        let cache = MemoryCache::new();
        cache.set("kis:daily_price:005930:a:b", "1".into(), None).await;
        cache.set("kis:quote:005930", "2".into(), None).await;
        cache.set("kis:quote:000660", "3".into(), None).await;

        let removed = cache.delete_by_pattern("kis:*005930*").await;
        assert_eq!(removed, 2);
        assert_eq!(cache.get("kis:quote:000660").await.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn json_helpers_roundtrip_and_drop_undecodable() {
        let cache = MemoryCache::new();
        set_json(&cache, "nums", &vec![1, 2, 3], None).await;
        let nums: Option<Vec<i32>> = get_json(&cache, "nums").await;
        assert_eq!(nums, Some(vec![1, 2, 3]));

        cache.set("nums", "not-json".into(), None).await;
        let nums: Option<Vec<i32>> = get_json(&cache, "nums").await;
        assert_eq!(nums, None);
        // The poisoned entry is evicted.
        assert_eq!(cache.get("nums").await, None);
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("kis:*", "kis:token"));
        assert!(glob_match("*005930*", "kis:quote:005930"));
        assert!(glob_match("exact", "exact"));
        assert!(glob_match("a*b", "axbyb"));
        assert!(!glob_match("kis:*", "other:token"));
        assert!(!glob_match("*zzz*", "kis:quote:005930"));
    }
}
