// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Localization cache facade.
//!
//! [`LocalizationCache`] is the handle applications hold. It owns a
//! [`TieredStore`] behind a lock, dispatches memory pressure events to
//! registered handlers and runs the periodic maintenance sweep through an
//! injected [`Scheduler`](crate::Scheduler).
//!
//! # Lifecycle
//!
//! ```text
//! Created → Running (start) → Stopped (cleanup)
//! ```
//!
//! # Example
//!
//! ```
//! use l10n_cache::{CacheConfig, LocalizationCache, SetOptions, Tier};
//! use serde_json::json;
//!
//! let cache = LocalizationCache::new(CacheConfig::default()).unwrap();
//!
//! assert!(cache.set("menu.title", &json!("Play"), SetOptions::high()));
//! assert_eq!(cache.get("menu.title"), Some(json!("Play")));
//! assert_eq!(cache.tier_of("menu.title"), Some(Tier::Hot));
//!
//! let stats = cache.stats();
//! assert_eq!(stats.layer_distribution.hot, 1);
//! assert_eq!(stats.counters.hits, 1);
//! ```

mod handlers;
mod lifecycle;
mod types;

pub use types::{CacheState, HandlerId};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, ConfigUpdate};
use crate::entry::{CacheEntry, SetOptions, Tier};
use crate::error::CacheResult;
use crate::pressure::{PooledValue, PressureCheck};
use crate::scheduler::TaskHandle;
use crate::store::{CacheStats, TieredStore};

use handlers::PressureHandler;

/// State shared between the handle and its scheduled sweep.
///
/// The sweep task only holds a `Weak<Shared>`, so dropping the last handle
/// frees everything even while a task is still registered.
pub(crate) struct Shared {
    pub(super) store: Mutex<TieredStore>,
    pub(super) handlers: RwLock<Vec<(HandlerId, PressureHandler)>>,
    pub(super) next_handler: AtomicU64,
    pub(super) handler_failures: AtomicU64,
    /// Set while a sweep runs; an overlapping tick becomes a no-op
    pub(super) sweeping: AtomicBool,
}

/// Tiered, pressure-aware cache for localization payloads.
///
/// # Thread Safety
///
/// The cache is `Send + Sync`. Every operation runs to completion under one
/// lock, so callers never observe a half-updated entry. Share it by reference
/// or wrap it in an `Arc`.
///
/// Dropping the cache cancels its scheduled sweep.
pub struct LocalizationCache {
    pub(super) shared: Arc<Shared>,
    pub(super) state: watch::Sender<CacheState>,
    pub(super) task: Mutex<Option<TaskHandle>>,
}

impl std::fmt::Debug for LocalizationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizationCache")
            .field("state", &self.state())
            .field("store", &*self.shared.store.lock())
            .field("handlers", &self.shared.handlers.read().len())
            .finish()
    }
}

impl LocalizationCache {
    /// Create a cache on the system clock.
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        let store = TieredStore::new(config, clock)?;
        info!(
            max_memory_bytes = store.config().max_memory_bytes,
            mode = ?store.config().performance_mode,
            strategy = ?store.config().eviction_strategy,
            "Localization cache created"
        );
        let (state, _) = watch::channel(CacheState::Created);
        Ok(Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                handlers: RwLock::new(Vec::new()),
                next_handler: AtomicU64::new(1),
                handler_failures: AtomicU64::new(0),
                sweeping: AtomicBool::new(false),
            }),
            state,
            task: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        *self.state.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<CacheState> {
        self.state.subscribe()
    }

    /// Store a payload. Returns false if it could not be encoded or does not
    /// fit even after eviction.
    #[tracing::instrument(skip(self, value, opts))]
    pub fn set(&self, key: &str, value: &Value, opts: SetOptions) -> bool {
        self.shared.store.lock().set(key, value, &opts)
    }

    /// Fetch a payload. Expired, missing and undecodable entries all miss.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.store.lock().get(key)
    }

    /// Fetch several payloads under one lock acquisition.
    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    pub fn get_multiple(&self, keys: &[&str]) -> HashMap<String, Value> {
        self.shared.store.lock().get_multiple(keys)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, key: &str) -> bool {
        self.shared.store.lock().delete(key)
    }

    /// Present and unexpired. Does not count as an access.
    pub fn has(&self, key: &str) -> bool {
        self.shared.store.lock().has(key)
    }

    /// Drop every entry. Statistics counters are kept.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) {
        self.shared.store.lock().clear();
    }

    /// Snapshot of counters, memory usage and tier distribution.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.shared.store.lock().stats();
        stats.handler_failures = self.shared.handler_failures.load(Ordering::Relaxed);
        stats
    }

    /// Apply a runtime configuration change.
    ///
    /// Lowering `max_memory_bytes` below current usage evicts immediately.
    #[tracing::instrument(skip(self))]
    pub fn update_configuration(&self, update: &ConfigUpdate) -> CacheResult<()> {
        self.shared.store.lock().update_configuration(update)
    }

    /// Intern a payload's strings through the dedup pool.
    pub fn optimize_payload(&self, value: &Value) -> Arc<PooledValue> {
        self.shared.store.lock().optimize_payload(value)
    }

    /// Check memory pressure now, dispatching any level transition.
    #[tracing::instrument(skip(self))]
    pub fn check_memory(&self) -> PressureCheck {
        let check = self.shared.store.lock().check_memory();
        self.shared.dispatch(&check.events);
        check
    }

    /// Encoded payload bytes currently held.
    #[must_use]
    pub fn aggregate_size(&self) -> usize {
        self.shared.store.lock().aggregate_size()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.store.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.store.lock().is_empty()
    }

    #[must_use]
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.shared.store.lock().tier_of(key)
    }

    /// Tiers physically holding `key`; exactly one for a live entry.
    #[must_use]
    pub fn tiers_holding(&self, key: &str) -> Vec<Tier> {
        self.shared.store.lock().tiers_holding(key)
    }

    /// Metadata for `key`, without touching access statistics.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.shared.store.lock().entry(key).cloned()
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.shared.store.lock().config().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::tiering::PerformanceMode;
    use serde_json::json;
    use std::time::Duration;

    fn cache() -> (LocalizationCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = LocalizationCache::with_clock(CacheConfig::default(), clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CacheConfig {
            warning_threshold: 0.99,
            ..Default::default()
        };
        assert!(LocalizationCache::new(config).is_err());
    }

    #[test]
    fn test_basic_operations() {
        let (cache, _) = cache();
        assert_eq!(cache.state(), CacheState::Created);

        assert!(cache.set("greeting", &json!("Hello"), SetOptions::default()));
        assert!(cache.has("greeting"));
        assert_eq!(cache.get("greeting"), Some(json!("Hello")));
        assert_eq!(cache.len(), 1);

        assert!(cache.delete("greeting"));
        assert!(!cache.has("greeting"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_through_facade() {
        let (cache, clock) = cache();
        let opts = SetOptions::new().with_ttl(Duration::from_millis(100));
        cache.set("k", &json!("v"), opts);

        clock.advance(Duration::from_millis(50));
        assert_eq!(cache.get("k"), Some(json!("v")));
        clock.advance(Duration::from_millis(100));
        assert_eq!(cache.get("k"), None);
        assert!(cache.entry("k").is_none());
    }

    #[test]
    fn test_update_configuration() {
        let (cache, _) = cache();
        let update = ConfigUpdate {
            performance_mode: Some(PerformanceMode::Speed),
            compression_enabled: Some(false),
            ..Default::default()
        };
        cache.update_configuration(&update).unwrap();

        let config = cache.config();
        assert_eq!(config.performance_mode, PerformanceMode::Speed);
        assert!(!config.compression_enabled);
    }

    #[test]
    fn test_cache_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LocalizationCache>();
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(cache().0);
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("t{t}.k{i}");
                        assert!(cache.set(&key, &json!(i), SetOptions::default()));
                        assert_eq!(cache.get(&key), Some(json!(i)));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(cache.len(), 200);
        for key in ["t0.k0", "t3.k49"] {
            assert_eq!(cache.tiers_holding(key).len(), 1);
        }
    }
}
