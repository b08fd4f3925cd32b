// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Memory pressure tracking for graceful degradation.
//!
//! The monitor keeps an [`AggregateMemoryUsage`] breakdown and classifies the
//! ratio of its total to the configured ceiling into a [`PressureLevel`].
//! Crossing a threshold triggers cleanup of the dedup pool and the object
//! registry and produces [`PressureEvent`]s for registered handlers.
//!
//! # Example
//!
//! ```
//! use l10n_cache::pressure::PressureLevel;
//!
//! assert_eq!(PressureLevel::from_ratio(0.5, 0.8, 0.95), PressureLevel::Normal);
//! assert_eq!(PressureLevel::from_ratio(0.85, 0.8, 0.95), PressureLevel::Warning);
//! assert_eq!(PressureLevel::from_ratio(0.97, 0.8, 0.95), PressureLevel::Critical);
//! ```

mod pool;
mod registry;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::metrics;

pub use pool::{PooledValue, StringPool};
pub use registry::ObjectRegistry;

/// Memory pressure level, from the usage ratio against the ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    #[default]
    Normal = 0,
    Warning = 1,
    Critical = 2,
}

impl PressureLevel {
    /// Classify a usage ratio (0.0 → 1.0+)
    #[must_use]
    pub fn from_ratio(ratio: f64, warning: f64, critical: f64) -> Self {
        match ratio {
            r if r >= critical => Self::Critical,
            r if r >= warning => Self::Warning,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub fn is_under_pressure(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl std::fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Level transitions reported to pressure handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureEvent {
    Warning,
    Critical,
    Recovered,
}

/// Tracked memory by category. The total is always derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateMemoryUsage {
    /// Dedup pool string bytes
    pub translations_bytes: usize,
    /// Encoded payload bytes
    pub cache_bytes: usize,
    /// Entry, access pattern and key overhead
    pub metadata_bytes: usize,
    /// Tracked pooled objects
    pub other_bytes: usize,
}

impl AggregateMemoryUsage {
    #[must_use]
    pub fn total(&self) -> usize {
        self.translations_bytes + self.cache_bytes + self.metadata_bytes + self.other_bytes
    }
}

/// Outcome of one pressure check.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureCheck {
    pub level: PressureLevel,
    pub ratio: f64,
    pub usage: AggregateMemoryUsage,
    /// Events to dispatch, in order
    pub events: Vec<PressureEvent>,
    /// Bytes released by the cleanup this check ran
    pub bytes_freed: usize,
}

/// Memory pressure monitor owning the dedup pool and object registry.
#[derive(Debug)]
pub struct MemoryPressureMonitor {
    warning_threshold: f64,
    critical_threshold: f64,
    dedup_trim_threshold: usize,
    dedup_retain_ratio: f64,
    registry_retain_ratio: f64,

    level: PressureLevel,
    pool: StringPool,
    registry: ObjectRegistry,
    cache_bytes: usize,
    metadata_bytes: usize,

    bytes_freed_total: u64,
    emergency_cleanups: u64,
    preemptive_cleanups: u64,
}

impl MemoryPressureMonitor {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            warning_threshold: config.warning_threshold,
            critical_threshold: config.critical_threshold,
            dedup_trim_threshold: config.dedup_trim_threshold,
            dedup_retain_ratio: config.dedup_retain_ratio,
            registry_retain_ratio: config.registry_retain_ratio,
            level: PressureLevel::Normal,
            pool: StringPool::new(),
            registry: ObjectRegistry::new(),
            cache_bytes: 0,
            metadata_bytes: 0,
            bytes_freed_total: 0,
            emergency_cleanups: 0,
            preemptive_cleanups: 0,
        }
    }

    pub fn set_cache_bytes(&mut self, bytes: usize) {
        self.cache_bytes = bytes;
    }

    pub fn set_metadata_bytes(&mut self, bytes: usize) {
        self.metadata_bytes = bytes;
    }

    #[must_use]
    pub fn usage(&self) -> AggregateMemoryUsage {
        AggregateMemoryUsage {
            translations_bytes: self.pool.bytes(),
            cache_bytes: self.cache_bytes,
            metadata_bytes: self.metadata_bytes,
            other_bytes: self.registry.tracked_bytes(),
        }
    }

    #[must_use]
    pub fn level(&self) -> PressureLevel {
        self.level
    }

    #[must_use]
    pub fn warning_threshold(&self) -> f64 {
        self.warning_threshold
    }

    #[must_use]
    pub fn dedup_hits(&self) -> u64 {
        self.pool.dedup_hits()
    }

    #[must_use]
    pub fn bytes_freed_total(&self) -> u64 {
        self.bytes_freed_total
    }

    #[must_use]
    pub fn cleanups(&self) -> (u64, u64) {
        (self.preemptive_cleanups, self.emergency_cleanups)
    }

    #[must_use]
    pub fn pool(&self) -> &StringPool {
        &self.pool
    }

    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Intern every string of `value` and track the result.
    pub fn optimize_payload(&mut self, value: &Value) -> Arc<PooledValue> {
        let hits_before = self.pool.dedup_hits();
        let pooled = Arc::new(PooledValue::intern(value, &mut self.pool));
        for _ in hits_before..self.pool.dedup_hits() {
            metrics::record_dedup_hit();
        }
        self.registry.track(&pooled, pooled.approx_bytes());
        pooled
    }

    /// Classify usage against `ceiling`, run cleanups and report transitions.
    pub fn check(&mut self, ceiling: usize) -> PressureCheck {
        let usage = self.usage();
        let ratio = if ceiling == 0 {
            0.0
        } else {
            usage.total() as f64 / ceiling as f64
        };
        let observed = PressureLevel::from_ratio(ratio, self.warning_threshold, self.critical_threshold);

        let mut events = Vec::new();
        let mut bytes_freed = 0;

        match (self.level, observed) {
            (_, PressureLevel::Critical) => {
                bytes_freed = self.emergency_cleanup();
                if self.level != PressureLevel::Critical {
                    warn!(ratio, total = usage.total(), ceiling, "Memory pressure critical");
                    events.push(PressureEvent::Critical);
                }
            }
            (PressureLevel::Normal, PressureLevel::Warning) => {
                bytes_freed = self.preemptive_cleanup();
                info!(ratio, total = usage.total(), ceiling, "Memory pressure warning");
                events.push(PressureEvent::Warning);
            }
            (PressureLevel::Critical, PressureLevel::Warning) => {
                debug!(ratio, "Memory pressure eased to warning");
            }
            (PressureLevel::Warning, PressureLevel::Warning) => {}
            (PressureLevel::Normal, PressureLevel::Normal) => {}
            (_, PressureLevel::Normal) => {
                info!(ratio, "Memory pressure recovered");
                events.push(PressureEvent::Recovered);
            }
        }
        self.level = observed;

        metrics::set_memory_pressure(ratio);
        metrics::set_pressure_level(self.level as u8);

        PressureCheck {
            level: self.level,
            ratio,
            usage: self.usage(),
            events,
            bytes_freed,
        }
    }

    fn emergency_cleanup(&mut self) -> usize {
        let mut freed = self.pool.clear();
        freed += self.registry.shrink_to(self.registry_retain_ratio);
        freed += self.registry.reap();
        self.emergency_cleanups += 1;
        self.bytes_freed_total += freed as u64;
        metrics::record_cleanup("emergency", freed);
        warn!(bytes_freed = freed, "Emergency memory cleanup");
        freed
    }

    fn preemptive_cleanup(&mut self) -> usize {
        let mut freed = 0;
        if self.pool.len() > self.dedup_trim_threshold {
            freed += self.pool.trim_to_recent(self.dedup_retain_ratio);
        }
        freed += self.registry.reap();
        self.preemptive_cleanups += 1;
        self.bytes_freed_total += freed as u64;
        metrics::record_cleanup("preemptive", freed);
        debug!(bytes_freed = freed, "Preemptive memory cleanup");
        freed
    }

    /// Drop pool and registry contents and return to normal.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.registry.clear();
        self.cache_bytes = 0;
        self.metadata_bytes = 0;
        self.level = PressureLevel::Normal;
    }

    pub fn update_thresholds(&mut self, config: &CacheConfig) {
        self.warning_threshold = config.warning_threshold;
        self.critical_threshold = config.critical_threshold;
    }
}
