//! Generic key→value cache with per-entry expiry.
//!
//! Backed by `DashMap` so concurrent request handlers can share one
//! instance. Expiry is lazy: an entry older than the TTL is evicted by
//! the `get` that observes it — there is no background sweep. A TTL of
//! `None` means entries never expire.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Thread-safe cache with a single TTL applied to every entry.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V: Clone> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Option<Duration>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a key, evicting it first if its age exceeds the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            let expired = match self.ttl {
                Some(ttl) => entry.stored_at.elapsed() > ttl,
                None => false,
            };
            if !expired {
                return Some(entry.value.clone());
            }
        }
        // Guard dropped above; safe to take the write path.
        self.entries.remove(key);
        None
    }

    /// Store a value, replacing any previous entry for the key.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache: TtlCache<String, i32> = TtlCache::new(Some(Duration::from_secs(60)));
        cache.insert("berlin".into(), 42);
        assert_eq!(cache.get(&"berlin".into()), Some(42));
    }

    #[test]
    fn test_miss_for_unknown_key() {
        let cache: TtlCache<String, i32> = TtlCache::new(Some(Duration::from_secs(60)));
        assert_eq!(cache.get(&"nowhere".into()), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache: TtlCache<String, i32> = TtlCache::new(Some(Duration::ZERO));
        cache.insert("berlin".into(), 42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"berlin".into()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_infinite_ttl_never_misses() {
        let cache: TtlCache<String, i32> = TtlCache::new(None);
        cache.insert("berlin".into(), 42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"berlin".into()), Some(42));
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let cache: TtlCache<String, i32> = TtlCache::new(Some(Duration::from_secs(60)));
        cache.insert("berlin".into(), 1);
        cache.insert("berlin".into(), 2);
        assert_eq!(cache.get(&"berlin".into()), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
