// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded strict-LRU cache with optional per-entry TTL.
//!
//! Used standalone for small lookup tables and embedded in the tiered store as
//! a decoded-value front cache.
//!
//! ```
//! use l10n_cache::{ManualClock, RecencyCache};
//! use std::sync::Arc;
//!
//! let mut cache = RecencyCache::new(2, Arc::new(ManualClock::new(0))).unwrap();
//! cache.set("a".into(), 1, None);
//! cache.set("b".into(), 2, None);
//! let evicted = cache.set("c".into(), 3, None);
//! assert_eq!(evicted, Some(("a".to_string(), 1)));
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;

use crate::clock::{saturating_millis, Clock};
use crate::entry::is_expired;
use crate::error::{CacheError, CacheResult};

#[derive(Debug)]
struct Slot<V> {
    value: V,
    created_at: u64,
    ttl_ms: Option<u64>,
}

/// Hit/miss counters for a [`RecencyCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecencyStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Strict LRU keyed by string.
pub struct RecencyCache<V> {
    entries: LruCache<String, Slot<V>>,
    clock: Arc<dyn Clock>,
    stats: RecencyStats,
}

impl<V> std::fmt::Debug for RecencyCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("stats", &self.stats)
            .finish()
    }
}

fn non_zero(capacity: usize) -> CacheResult<NonZeroUsize> {
    NonZeroUsize::new(capacity).ok_or_else(|| {
        CacheError::InvalidConfig("recency cache capacity must be greater than zero".into())
    })
}

impl<V: Clone> RecencyCache<V> {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        Ok(Self {
            entries: LruCache::new(non_zero(capacity)?),
            clock,
            stats: RecencyStats::default(),
        })
    }

    /// Look up and promote `key`. Expired entries are dropped and miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        let expired = match self.entries.get(key) {
            Some(slot) => is_expired(slot.created_at, slot.ttl_ms, now),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.pop(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.entries.peek(key).map(|slot| slot.value.clone())
    }

    /// Insert or overwrite `key` as most recently used.
    ///
    /// Returns the entry evicted to make room, if any. Overwriting an existing
    /// key never evicts.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Option<(String, V)> {
        let slot = Slot {
            value,
            created_at: self.clock.now_millis(),
            ttl_ms: ttl.map(saturating_millis),
        };
        match self.entries.push(key.clone(), slot) {
            Some((old_key, old)) if old_key != key => {
                self.stats.evictions += 1;
                Some((old_key, old.value))
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.pop(key).map(|slot| slot.value)
    }

    /// Present and unexpired, without touching recency.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        self.entries
            .peek(key)
            .is_some_and(|slot| !is_expired(slot.created_at, slot.ttl_ms, now))
    }

    /// Change the bound, keeping the most recently used entries.
    ///
    /// Returns how many entries were dropped.
    pub fn resize(&mut self, capacity: usize) -> CacheResult<usize> {
        let before = self.entries.len();
        self.entries.resize(non_zero(capacity)?);
        let dropped = before - self.entries.len();
        self.stats.evictions += dropped as u64;
        Ok(dropped)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| is_expired(slot.created_at, slot.ttl_ms, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    #[must_use]
    pub fn stats(&self) -> RecencyStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(capacity: usize) -> (RecencyCache<&'static str>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = RecencyCache::new(capacity, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            RecencyCache::<u8>::new(0, clock),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_strict_lru_order() {
        let (mut c, _) = cache(2);
        assert!(c.set("A".into(), "a", None).is_none());
        assert!(c.set("B".into(), "b", None).is_none());
        assert_eq!(c.set("C".into(), "c", None), Some(("A".into(), "a")));

        assert_eq!(c.get("B"), Some("b"));
        assert_eq!(c.set("D".into(), "d", None), Some(("C".into(), "c")));

        assert!(c.contains("B"));
        assert!(c.contains("D"));
        assert_eq!(c.stats().evictions, 2);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (mut c, _) = cache(2);
        c.set("A".into(), "a", None);
        c.set("B".into(), "b", None);
        assert!(c.set("A".into(), "a2", None).is_none());
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("A"), Some("a2"));
    }

    #[test]
    fn test_contains_does_not_promote() {
        let (mut c, _) = cache(2);
        c.set("A".into(), "a", None);
        c.set("B".into(), "b", None);
        assert!(c.contains("A"));
        // A is still least recently used
        assert_eq!(c.set("C".into(), "c", None), Some(("A".into(), "a")));
    }

    #[test]
    fn test_huge_ttl_never_wraps() {
        let (mut c, clock) = cache(2);
        c.set("k".into(), "v", Some(Duration::from_secs(u64::MAX / 1000 + 1)));
        clock.advance(Duration::from_secs(86_400));
        assert_eq!(c.get("k"), Some("v"));
    }

    #[test]
    fn test_ttl_expiry() {
        let (mut c, clock) = cache(4);
        c.set("k".into(), "v", Some(Duration::from_millis(100)));

        clock.set(50);
        assert_eq!(c.get("k"), Some("v"));

        clock.set(150);
        assert!(!c.contains("k"));
        assert_eq!(c.get("k"), None);
        assert!(c.is_empty());
        assert_eq!(c.stats().expirations, 1);
    }

    #[test]
    fn test_resize_keeps_most_recent() {
        let (mut c, _) = cache(4);
        for (k, v) in [("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")] {
            c.set(k.into(), v, None);
        }
        c.get("A");

        assert_eq!(c.resize(2).unwrap(), 2);
        assert_eq!(c.capacity(), 2);
        assert!(c.contains("A"));
        assert!(c.contains("D"));
        assert!(!c.contains("B"));
        assert!(c.resize(0).is_err());
    }

    #[test]
    fn test_purge_expired() {
        let (mut c, clock) = cache(4);
        c.set("short".into(), "s", Some(Duration::from_millis(10)));
        c.set("long".into(), "l", Some(Duration::from_secs(10)));
        c.set("forever".into(), "f", None);

        clock.advance(Duration::from_millis(20));
        assert_eq!(c.purge_expired(), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_hit_miss_counters() {
        let (mut c, _) = cache(2);
        c.set("A".into(), "a", None);
        c.get("A");
        c.get("missing");
        c.remove("A");
        c.get("A");

        let stats = c.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }
}
