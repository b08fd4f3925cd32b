// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Three-tier entry store.
//!
//! [`TieredStore`] is a single-threaded state machine: the encoded bytes for a
//! key live in exactly one of the hot/warm/cold maps, its [`CacheEntry`] names
//! that map, and every size-affecting operation keeps the byte accounting and
//! the memory monitor in step. [`LocalizationCache`](crate::LocalizationCache)
//! wraps it in a lock for shared use.
//!
//! # Read path
//!
//! ```text
//! get(key)
//!   ├─ metadata?        no  → miss
//!   ├─ expired?         yes → purge, miss
//!   ├─ front cache hit? yes → value
//!   ├─ tier bytes?      no  → consistency fault, purge, miss
//!   ├─ decode ok?       no  → purge, miss
//!   └─ bookkeeping → rebalance → value
//! ```
//!
//! # Write path
//!
//! Encode → place → make room (evict from other tiers first, then from the
//! target tier, never the key itself) → replace the old entry.

mod stats;
mod tiers;

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{saturating_millis, Clock};
use crate::codec::PayloadCodec;
use crate::config::{CacheConfig, ConfigUpdate};
use crate::entry::{CacheEntry, SetOptions, Tier};
use crate::error::{CacheError, CacheResult};
use crate::eviction::EvictionScorer;
use crate::metrics;
use crate::pressure::{MemoryPressureMonitor, PooledValue, PressureCheck, PressureLevel};
use crate::recency::RecencyCache;
use crate::tiering::{initial_tier, AccessPattern};

pub use stats::{CacheStats, LayerDistribution, StoreCounters, SweepReport};
use tiers::TierMaps;

/// Tiered payload store with capacity enforcement and eviction.
pub struct TieredStore {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    codec: PayloadCodec,
    scorer: EvictionScorer,

    tiers: TierMaps,
    metadata: HashMap<String, CacheEntry>,
    patterns: HashMap<String, AccessPattern>,
    front: Option<RecencyCache<Value>>,
    monitor: MemoryPressureMonitor,

    /// Encoded bytes across all tiers (sum of `metadata[*].encoded_size`)
    total_size: usize,
    /// Bookkeeping overhead for metadata, access patterns and keys
    metadata_size: usize,
    counters: StoreCounters,
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("entries", &self.metadata.len())
            .field("total_size", &self.total_size)
            .field("max_memory_bytes", &self.config.max_memory_bytes)
            .field("distribution", &self.tiers.distribution())
            .finish()
    }
}

impl TieredStore {
    /// Create a store, rejecting invalid configuration.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        config.validate()?;
        let front = match config.front_cache_entries {
            0 => None,
            n => Some(RecencyCache::new(n, Arc::clone(&clock))?),
        };
        Ok(Self {
            codec: PayloadCodec::new(&config),
            scorer: EvictionScorer::new(config.eviction_strategy, config.score_weights),
            monitor: MemoryPressureMonitor::new(&config),
            tiers: TierMaps::default(),
            metadata: HashMap::new(),
            patterns: HashMap::new(),
            front,
            total_size: 0,
            metadata_size: 0,
            counters: StoreCounters::default(),
            clock,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value` under `key`.
    ///
    /// Returns false when the payload cannot be encoded or cannot fit; the
    /// previous value for `key`, if any, is then left untouched.
    pub fn set(&mut self, key: &str, value: &Value, opts: &SetOptions) -> bool {
        let now = self.clock.now_millis();

        let encoded = match self.codec.encode(value, opts.force_compress) {
            Ok(encoded) => encoded,
            Err(e) => {
                let err = e.into_encode(key);
                warn!(key = %key, error = %err, "Failed to encode payload");
                self.counters.encode_failures += 1;
                metrics::record_error("set", err.kind());
                metrics::record_operation("set", "error");
                return false;
            }
        };
        let size = encoded.encoded_size();
        let tier = opts
            .tier
            .unwrap_or_else(|| initial_tier(self.config.performance_mode, size, opts.priority));

        if let Err(err) = self.ensure_capacity(key, size, tier, now) {
            warn!(key = %key, size, error = %err, "Rejected payload");
            self.counters.capacity_rejections += 1;
            metrics::record_error("set", err.kind());
            metrics::record_operation("set", "rejected");
            return false;
        }

        self.purge(key);

        let entry = CacheEntry {
            key: key.to_string(),
            tier,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl_ms: opts
                .ttl
                .map(saturating_millis)
                .or(self.config.default_ttl_ms),
            priority: opts.priority,
            original_size: encoded.original_size,
            encoded_size: size,
            is_compressed: encoded.compressed,
        };
        self.metadata_size += self.overhead(&entry);
        self.total_size += size;
        self.tiers.insert(tier, key.to_string(), encoded.bytes);
        self.patterns.insert(
            key.to_string(),
            AccessPattern::new(now, self.config.access_history_len),
        );
        self.metadata.insert(key.to_string(), entry);

        self.counters.sets += 1;
        self.sync_monitor();
        metrics::record_operation("set", "success");
        debug!(key = %key, tier = %tier, size, compressed = encoded.compressed, "Entry stored");
        true
    }

    /// Fetch and decode `key`, updating access statistics and its tier.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_millis();
        let tier = match self.live_tier(key, now, "get") {
            Some(tier) => tier,
            None => {
                self.counters.misses += 1;
                metrics::record_operation("get", "miss");
                return None;
            }
        };

        let cached = self.front.as_mut().and_then(|front| front.get(key));
        let value = match cached {
            Some(value) => value,
            None => {
                let decoded = match self.tiers.get(tier, key) {
                    Some(bytes) => self.codec.decode(bytes),
                    None => {
                        self.consistency_fault(key, tier, "get");
                        self.counters.misses += 1;
                        metrics::record_operation("get", "miss");
                        return None;
                    }
                };
                match decoded {
                    Ok(value) => {
                        if let Some(front) = self.front.as_mut() {
                            front.set(key.to_string(), value.clone(), None);
                        }
                        value
                    }
                    Err(e) => {
                        let err = e.into_decode(key);
                        warn!(key = %key, tier = %tier, error = %err, "Failed to decode payload, dropping entry");
                        self.counters.decode_failures += 1;
                        self.counters.misses += 1;
                        metrics::record_error("get", err.kind());
                        metrics::record_operation("get", "miss");
                        self.purge(key);
                        return None;
                    }
                }
            }
        };

        if let Some(entry) = self.metadata.get_mut(key) {
            entry.record_access(now);
        }
        let history = self.config.access_history_len;
        let pattern = self
            .patterns
            .entry(key.to_string())
            .or_insert_with(|| AccessPattern::new(now, history));
        pattern.record_access(now);
        let optimal = pattern.optimal_tier();
        if optimal != tier {
            self.migrate(key, tier, optimal);
        }

        self.counters.hits += 1;
        metrics::record_operation("get", "hit");
        Some(value)
    }

    /// Fetch several keys; misses are simply absent from the result.
    pub fn get_multiple(&mut self, keys: &[&str]) -> HashMap<String, Value> {
        keys.iter()
            .filter_map(|&key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }

    /// Live, unexpired and backed by tier bytes. No access bookkeeping.
    pub fn has(&mut self, key: &str) -> bool {
        let now = self.clock.now_millis();
        match self.live_tier(key, now, "has") {
            Some(tier) if self.tiers.contains(tier, key) => true,
            Some(tier) => {
                self.consistency_fault(key, tier, "has");
                false
            }
            None => false,
        }
    }

    /// Remove `key`. Idempotent.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.purge(key).is_some();
        if removed {
            self.counters.deletes += 1;
            metrics::record_operation("delete", "success");
            debug!(key = %key, "Entry deleted");
        }
        removed
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        let entries = self.metadata.len();
        self.tiers.clear();
        self.metadata.clear();
        self.patterns.clear();
        if let Some(front) = self.front.as_mut() {
            front.clear();
        }
        self.total_size = 0;
        self.metadata_size = 0;
        self.sync_monitor();
        info!(entries, "Cache cleared");
    }

    /// Empty the dedup pool and object registry and return to normal pressure.
    pub fn reset_pressure(&mut self) {
        self.monitor.reset();
        self.sync_monitor();
    }

    /// Periodic maintenance: expiry, consistency scan, access decay, memory
    /// check and, at critical pressure, eviction down to the warning level.
    pub fn sweep(&mut self) -> SweepReport {
        let started = Instant::now();
        let now = self.clock.now_millis();

        let expired: Vec<String> = self
            .metadata
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.purge(key);
        }
        self.counters.expirations += expired.len() as u64;
        if !expired.is_empty() {
            metrics::record_expired(expired.len());
        }

        let orphaned: Vec<(String, Tier)> = self
            .metadata
            .values()
            .filter(|e| !self.tiers.contains(e.tier, &e.key))
            .map(|e| (e.key.clone(), e.tier))
            .collect();
        for (key, tier) in &orphaned {
            self.consistency_fault(key, *tier, "sweep");
        }

        let metadata = &self.metadata;
        let stray_removed = self.tiers.retain(|key| metadata.contains_key(key));
        if stray_removed > 0 {
            warn!(stray_removed, "Dropped tier bytes without metadata");
        }

        let factor = self.config.access_decay_factor;
        for pattern in self.patterns.values_mut() {
            pattern.decay(factor);
        }

        let pressure = self.check_memory();
        let mut pressure_evicted = 0;
        if pressure.level == PressureLevel::Critical {
            let usage = self.monitor.usage().total();
            let target =
                (self.config.max_memory_bytes as f64 * self.monitor.warning_threshold()) as usize;
            if usage > target {
                pressure_evicted = self.evict_bytes(usage - target, None, None, now).0;
            }
        }

        let duration = started.elapsed();
        metrics::record_sweep(duration);
        info!(
            expired = expired.len(),
            consistency_faults = orphaned.len(),
            stray_removed,
            pressure_evicted,
            level = %pressure.level,
            "Sweep completed"
        );

        SweepReport {
            expired: expired.len(),
            consistency_faults: orphaned.len(),
            stray_removed,
            pressure_evicted,
            pressure,
            duration,
        }
    }

    /// Run a memory pressure check against the configured ceiling.
    pub fn check_memory(&mut self) -> PressureCheck {
        self.sync_monitor();
        self.monitor.check(self.config.max_memory_bytes)
    }

    /// Intern `value` through the dedup pool.
    pub fn optimize_payload(&mut self, value: &Value) -> Arc<PooledValue> {
        self.monitor.optimize_payload(value)
    }

    /// Apply a runtime configuration change.
    ///
    /// Shrinking the ceiling below current usage evicts down to it.
    pub fn update_configuration(&mut self, update: &ConfigUpdate) -> CacheResult<()> {
        let next = update.apply_to(&self.config)?;
        self.codec.reconfigure(&next);
        self.scorer.strategy = next.eviction_strategy;
        self.monitor.update_thresholds(&next);
        self.config = next;

        let ceiling = self.config.max_memory_bytes;
        if self.total_size > ceiling {
            let now = self.clock.now_millis();
            let (evicted, freed) = self.evict_bytes(self.total_size - ceiling, None, None, now);
            info!(evicted, freed, ceiling, "Evicted after ceiling was lowered");
        }
        self.sync_monitor();
        info!(
            max_memory_bytes = ceiling,
            mode = ?self.config.performance_mode,
            strategy = ?self.config.eviction_strategy,
            compression = self.config.compression_enabled,
            level = ?self.config.compression_level,
            "Configuration updated"
        );
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let ceiling = self.config.max_memory_bytes;
        CacheStats {
            counters: self.counters,
            hit_rate: stats::hit_rate(self.counters.hits, self.counters.misses),
            entries: self.metadata.len(),
            total_bytes: self.total_size,
            max_memory_bytes: ceiling,
            memory_usage_percent: self.total_size as f64 / ceiling as f64 * 100.0,
            layer_distribution: self.tiers.distribution(),
            codec: self.codec.stats(),
            memory: self.monitor.usage(),
            pressure_level: self.monitor.level(),
            dedup_hits: self.monitor.dedup_hits(),
            handler_failures: 0,
            front_cache_hits: self.front.as_ref().map_or(0, |f| f.stats().hits),
        }
    }

    /// Encoded payload bytes currently held.
    #[must_use]
    pub fn aggregate_size(&self) -> usize {
        self.total_size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.metadata.get(key)
    }

    #[must_use]
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.metadata.get(key).map(|e| e.tier)
    }

    /// Tiers physically holding `key`.
    #[must_use]
    pub fn tiers_holding(&self, key: &str) -> Vec<Tier> {
        self.tiers.holding(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.metadata.keys().cloned().collect()
    }

    /// Tier for a live, unexpired entry. Expired entries are purged.
    fn live_tier(&mut self, key: &str, now: u64, operation: &str) -> Option<Tier> {
        let entry = self.metadata.get(key)?;
        if entry.is_expired(now) {
            let tier = entry.tier;
            self.purge(key);
            self.counters.expirations += 1;
            metrics::record_expired(1);
            debug!(key = %key, tier = %tier, operation, "Entry expired");
            return None;
        }
        Some(entry.tier)
    }

    fn consistency_fault(&mut self, key: &str, tier: Tier, operation: &str) {
        let err = CacheError::ConsistencyFault {
            key: key.to_string(),
            tier,
        };
        warn!(key = %key, tier = %tier, error = %err, "Dropping inconsistent entry");
        self.counters.consistency_faults += 1;
        metrics::record_error(operation, err.kind());
        self.purge(key);
    }

    /// Make room for `size` bytes headed for `tier`.
    fn ensure_capacity(&mut self, key: &str, size: usize, tier: Tier, now: u64) -> CacheResult<()> {
        let ceiling = self.config.max_memory_bytes;
        if size > ceiling {
            return Err(CacheError::CapacityExhausted {
                needed: size,
                ceiling,
            });
        }

        let old = self.metadata.get(key).map_or(0, |e| e.encoded_size);
        let projected = self.total_size - old + size;
        if projected <= ceiling {
            return Ok(());
        }

        let buffer = (self.config.eviction_buffer_ratio * size as f64) as usize;
        let target = projected - ceiling + buffer;
        let (_, mut freed) = self.evict_bytes(target, Some(key), Some(tier), now);
        if freed < target {
            freed += self.evict_bytes(target - freed, Some(key), None, now).1;
        }

        let projected = self.total_size - old + size;
        if projected > ceiling {
            return Err(CacheError::CapacityExhausted {
                needed: projected - ceiling,
                ceiling,
            });
        }
        debug!(key = %key, freed, projected, ceiling, "Made room for entry");
        Ok(())
    }

    /// Evict in score order until `bytes_needed` are freed.
    ///
    /// `exclude` is never evicted; entries in `protected` are skipped.
    /// Returns (entries evicted, bytes freed).
    fn evict_bytes(
        &mut self,
        bytes_needed: usize,
        exclude: Option<&str>,
        protected: Option<Tier>,
        now: u64,
    ) -> (usize, usize) {
        if bytes_needed == 0 {
            return (0, 0);
        }
        let candidates = self.scorer.rank(
            self.metadata.values().filter(|e| {
                Some(e.key.as_str()) != exclude && Some(e.tier) != protected
            }),
            now,
        );
        let victims = EvictionScorer::select_victims(candidates, bytes_needed);
        if victims.is_empty() {
            return (0, 0);
        }

        let mut freed = 0;
        for victim in &victims {
            if let Some(size) = self.purge(&victim.key) {
                freed += size;
            }
        }
        self.counters.evictions += victims.len() as u64;
        self.counters.evicted_bytes += freed as u64;
        metrics::record_eviction(victims.len(), freed);
        info!(
            evicted = victims.len(),
            evicted_bytes = freed,
            strategy = ?self.scorer.strategy,
            protected = ?protected,
            "Evicted entries"
        );
        (victims.len(), freed)
    }

    fn migrate(&mut self, key: &str, from: Tier, to: Tier) {
        let Some(bytes) = self.tiers.remove(from, key) else {
            return;
        };
        self.tiers.insert(to, key.to_string(), bytes);
        if let Some(entry) = self.metadata.get_mut(key) {
            entry.tier = to;
        }
        self.counters.migrations += 1;
        metrics::record_migration(from, to);
        debug!(key = %key, from = %from, to = %to, "Entry migrated");
    }

    /// Remove every trace of `key`. Returns its encoded size if it existed.
    fn purge(&mut self, key: &str) -> Option<usize> {
        self.tiers.remove_everywhere(key);
        self.patterns.remove(key);
        if let Some(front) = self.front.as_mut() {
            front.remove(key);
        }
        let entry = self.metadata.remove(key)?;
        self.total_size -= entry.encoded_size;
        self.metadata_size -= self.overhead(&entry);
        self.sync_monitor();
        Some(entry.encoded_size)
    }

    /// Bookkeeping bytes for one entry: the record, its pattern, and the key
    /// copies held by the metadata, pattern and tier maps.
    fn overhead(&self, entry: &CacheEntry) -> usize {
        entry.footprint()
            + 3 * entry.key.len()
            + mem::size_of::<AccessPattern>()
            + self.config.access_history_len * mem::size_of::<u64>()
    }

    fn sync_monitor(&mut self) {
        self.monitor.set_cache_bytes(self.total_size);
        self.monitor.set_metadata_bytes(self.metadata_size);
        metrics::set_cache_bytes(self.total_size);
        for tier in Tier::ALL {
            metrics::set_tier_items(tier, self.tiers.len(tier));
        }
    }

    #[cfg(test)]
    pub(crate) fn tiers_mut(&mut self) -> &mut TierMaps {
        &mut self.tiers
    }
}
