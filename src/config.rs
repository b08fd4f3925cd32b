//! Configuration for the localization cache.
//!
//! # Example
//!
//! ```
//! use l10n_cache::{CacheConfig, PerformanceMode};
//!
//! // Minimal config (uses defaults)
//! let config = CacheConfig::default();
//! assert_eq!(config.max_memory_bytes, 50 * 1024 * 1024); // 50 MiB
//! assert!(config.validate().is_ok());
//!
//! // Small, memory-frugal cache
//! let config = CacheConfig {
//!     max_memory_bytes: 4 * 1024 * 1024,
//!     performance_mode: PerformanceMode::Memory,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;

use crate::codec::CompressionLevel;
use crate::error::{CacheError, CacheResult};
use crate::eviction::{EvictionStrategy, ScoreWeights};
use crate::tiering::{PerformanceMode, MAX_INTERVAL_HISTORY};

/// Configuration for the localization cache.
///
/// Every field has a default, so a config file only needs the values it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheConfig {
    /// Ceiling for encoded payload bytes across all tiers (default: 50 MiB)
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: usize,

    /// Initial tier placement policy
    #[serde(default)]
    pub performance_mode: PerformanceMode,

    /// Eviction ranking strategy
    #[serde(default)]
    pub eviction_strategy: EvictionStrategy,

    /// Weights for the adaptive strategy (must sum to 1)
    #[serde(default)]
    pub score_weights: ScoreWeights,

    /// Fraction of the incoming value's size freed on top of the shortfall
    #[serde(default = "default_eviction_buffer_ratio")]
    pub eviction_buffer_ratio: f64,

    /// Codec settings
    #[serde(default = "default_compression_enabled")]
    pub compression_enabled: bool,
    #[serde(default)]
    pub compression_level: CompressionLevel,
    #[serde(default = "default_min_compression_bytes")]
    pub min_compression_bytes: usize,
    /// Minimum saving ratio for a compressed form to be kept
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: f64,
    /// Extra substitution patterns, applied after the built-in ones
    #[serde(default)]
    pub custom_patterns: Vec<String>,

    /// TTL applied when `set` does not pass one (None = never expires)
    #[serde(default)]
    pub default_ttl_ms: Option<u64>,

    /// Memory pressure thresholds (fraction of `max_memory_bytes`)
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    /// Dedup pool trimming
    #[serde(default = "default_dedup_trim_threshold")]
    pub dedup_trim_threshold: usize,
    #[serde(default = "default_dedup_retain_ratio")]
    pub dedup_retain_ratio: f64,
    /// Fraction of tracked pooled objects kept by an emergency cleanup
    #[serde(default = "default_registry_retain_ratio")]
    pub registry_retain_ratio: f64,

    /// Background sweep period
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Multiplier applied to every recent-access counter on each sweep
    #[serde(default = "default_access_decay_factor")]
    pub access_decay_factor: f64,
    /// Inter-access intervals remembered per key (1..=10)
    #[serde(default = "default_access_history_len")]
    pub access_history_len: usize,

    /// Decoded-value front cache entries (0 = disabled)
    #[serde(default = "default_front_cache_entries")]
    pub front_cache_entries: usize,
}

fn default_max_memory_bytes() -> usize { 50 * 1024 * 1024 } // 50 MiB
fn default_eviction_buffer_ratio() -> f64 { 0.1 }
fn default_compression_enabled() -> bool { true }
fn default_min_compression_bytes() -> usize { 512 }
fn default_compression_threshold() -> f64 { 0.1 }
fn default_warning_threshold() -> f64 { 0.8 }
fn default_critical_threshold() -> f64 { 0.95 }
fn default_dedup_trim_threshold() -> usize { 1_000 }
fn default_dedup_retain_ratio() -> f64 { 0.7 }
fn default_registry_retain_ratio() -> f64 { 0.3 }
fn default_sweep_interval_ms() -> u64 { 30_000 }
fn default_access_decay_factor() -> f64 { 0.9 }
fn default_access_history_len() -> usize { MAX_INTERVAL_HISTORY }
fn default_front_cache_entries() -> usize { 256 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: default_max_memory_bytes(),
            performance_mode: PerformanceMode::default(),
            eviction_strategy: EvictionStrategy::default(),
            score_weights: ScoreWeights::default(),
            eviction_buffer_ratio: default_eviction_buffer_ratio(),
            compression_enabled: default_compression_enabled(),
            compression_level: CompressionLevel::default(),
            min_compression_bytes: default_min_compression_bytes(),
            compression_threshold: default_compression_threshold(),
            custom_patterns: Vec::new(),
            default_ttl_ms: None,
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            dedup_trim_threshold: default_dedup_trim_threshold(),
            dedup_retain_ratio: default_dedup_retain_ratio(),
            registry_retain_ratio: default_registry_retain_ratio(),
            sweep_interval_ms: default_sweep_interval_ms(),
            access_decay_factor: default_access_decay_factor(),
            access_history_len: default_access_history_len(),
            front_cache_entries: default_front_cache_entries(),
        }
    }
}

impl CacheConfig {
    /// Reject configurations the cache cannot honour.
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_memory_bytes == 0 {
            return Err(invalid("max_memory_bytes must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.eviction_buffer_ratio) {
            return Err(invalid("eviction_buffer_ratio must be within [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.compression_threshold) {
            return Err(invalid("compression_threshold must be within [0, 1)"));
        }
        if !(self.warning_threshold > 0.0
            && self.warning_threshold < self.critical_threshold
            && self.critical_threshold <= 1.0)
        {
            return Err(invalid(
                "thresholds must satisfy 0 < warning_threshold < critical_threshold <= 1",
            ));
        }
        for (name, ratio) in [
            ("dedup_retain_ratio", self.dedup_retain_ratio),
            ("registry_retain_ratio", self.registry_retain_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(format!("{name} must be within [0, 1]")));
            }
        }
        if !(self.access_decay_factor > 0.0 && self.access_decay_factor <= 1.0) {
            return Err(invalid("access_decay_factor must be within (0, 1]"));
        }
        if self.access_history_len == 0 || self.access_history_len > MAX_INTERVAL_HISTORY {
            return Err(invalid(format!(
                "access_history_len must be within 1..={MAX_INTERVAL_HISTORY}"
            )));
        }
        if self.sweep_interval_ms == 0 {
            return Err(invalid("sweep_interval_ms must be greater than zero"));
        }
        if self.default_ttl_ms == Some(0) {
            return Err(invalid("default_ttl_ms must be greater than zero when set"));
        }
        self.score_weights.validate()?;
        crate::codec::validate_patterns(&self.custom_patterns)?;
        Ok(())
    }
}

/// Partial runtime configuration change.
///
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub max_memory_bytes: Option<usize>,
    #[serde(default)]
    pub performance_mode: Option<PerformanceMode>,
    #[serde(default)]
    pub eviction_strategy: Option<EvictionStrategy>,
    #[serde(default)]
    pub compression_enabled: Option<bool>,
    #[serde(default)]
    pub compression_level: Option<CompressionLevel>,
    #[serde(default)]
    pub min_compression_bytes: Option<usize>,
    #[serde(default)]
    pub compression_threshold: Option<f64>,
}

impl ConfigUpdate {
    /// Produce the config that results from applying this update.
    pub fn apply_to(&self, base: &CacheConfig) -> CacheResult<CacheConfig> {
        let mut next = base.clone();
        if let Some(max) = self.max_memory_bytes {
            next.max_memory_bytes = max;
        }
        if let Some(mode) = self.performance_mode {
            next.performance_mode = mode;
        }
        if let Some(strategy) = self.eviction_strategy {
            next.eviction_strategy = strategy;
        }
        if let Some(enabled) = self.compression_enabled {
            next.compression_enabled = enabled;
        }
        if let Some(level) = self.compression_level {
            next.compression_level = level;
        }
        if let Some(min) = self.min_compression_bytes {
            next.min_compression_bytes = min;
        }
        if let Some(threshold) = self.compression_threshold {
            next.compression_threshold = threshold;
        }
        next.validate()?;
        Ok(next)
    }
}

fn invalid(msg: impl Into<String>) -> CacheError {
    CacheError::InvalidConfig(msg.into())
}
