//! Statistics snapshots for the tiered store.

use std::time::Duration;

use serde::Serialize;

use crate::codec::CodecStats;
use crate::pressure::{AggregateMemoryUsage, PressureCheck, PressureLevel};

/// Entry count per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerDistribution {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
}

impl LayerDistribution {
    #[must_use]
    pub fn total(&self) -> usize {
        self.hot + self.warm + self.cold
    }
}

/// Running counters. Survive `clear()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub evicted_bytes: u64,
    pub migrations: u64,
    pub encode_failures: u64,
    pub decode_failures: u64,
    pub consistency_faults: u64,
    pub capacity_rejections: u64,
}

/// Point-in-time view of the cache, serializable for diagnostics endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub counters: StoreCounters,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
    pub entries: usize,
    /// Encoded payload bytes across all tiers
    pub total_bytes: usize,
    pub max_memory_bytes: usize,
    /// `total_bytes` as a percentage of `max_memory_bytes`
    pub memory_usage_percent: f64,
    pub layer_distribution: LayerDistribution,
    pub codec: CodecStats,
    pub memory: AggregateMemoryUsage,
    pub pressure_level: PressureLevel,
    pub dedup_hits: u64,
    /// Pressure handlers that panicked
    pub handler_failures: u64,
    /// Decoded-value front cache hits
    pub front_cache_hits: u64,
}

impl CacheStats {
    /// Entries evicted so far
    #[must_use]
    pub fn eviction_count(&self) -> u64 {
        self.counters.evictions
    }
}

/// What one maintenance sweep did.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub expired: usize,
    pub consistency_faults: usize,
    /// Tier bytes with no metadata, dropped
    pub stray_removed: usize,
    /// Entries evicted to relieve critical pressure
    pub pressure_evicted: usize,
    pub pressure: PressureCheck,
    pub duration: Duration,
}

pub(crate) fn hit_rate(hits: u64, misses: u64) -> f64 {
    let lookups = hits + misses;
    if lookups == 0 {
        0.0
    } else {
        hits as f64 / lookups as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(hit_rate(0, 0), 0.0);
        assert_eq!(hit_rate(3, 1), 0.75);
    }

    #[test]
    fn test_distribution_total() {
        let d = LayerDistribution { hot: 1, warm: 2, cold: 3 };
        assert_eq!(d.total(), 6);
    }
}
