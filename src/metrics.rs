// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the localization cache.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for installing a recorder/exporter.
//!
//! # Metric Naming Convention
//! - `l10n_cache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_bytes` suffix for size gauges
//!
//! # Labels
//! - `tier`: hot, warm, cold
//! - `operation`: get, set, delete, has, sweep
//! - `status`: hit, miss, success, rejected, error

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::entry::Tier;

/// Record a cache operation outcome
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "l10n_cache_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a handled failure by kind (encode, decode, capacity, consistency)
pub fn record_error(operation: &str, error_type: &str) {
    counter!(
        "l10n_cache_errors_total",
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record an eviction pass
pub fn record_eviction(count: usize, bytes: usize) {
    counter!("l10n_cache_evictions_total").increment(count as u64);
    counter!("l10n_cache_evicted_bytes_total").increment(bytes as u64);
}

/// Record entries dropped because their TTL ran out
pub fn record_expired(count: usize) {
    counter!("l10n_cache_expired_total").increment(count as u64);
}

/// Record a tier migration
pub fn record_migration(from: Tier, to: Tier) {
    counter!(
        "l10n_cache_migrations_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Record a codec step (compress, decompress, skip)
pub fn record_codec(step: &str, original_bytes: usize, stored_bytes: usize) {
    counter!("l10n_cache_codec_total", "step" => step.to_string()).increment(1);
    if original_bytes > 0 {
        histogram!("l10n_cache_codec_ratio", "step" => step.to_string())
            .record(stored_bytes as f64 / original_bytes as f64);
    }
}

/// Set encoded payload bytes currently held
pub fn set_cache_bytes(bytes: usize) {
    gauge!("l10n_cache_payload_bytes").set(bytes as f64);
}

/// Set entry count per tier
pub fn set_tier_items(tier: Tier, count: usize) {
    gauge!("l10n_cache_tier_items", "tier" => tier.as_str()).set(count as f64);
}

/// Set memory pressure ratio (0.0 - 1.0+)
pub fn set_memory_pressure(pressure: f64) {
    gauge!("l10n_cache_memory_pressure").set(pressure);
}

/// Set pressure level (0 = Normal, 1 = Warning, 2 = Critical)
pub fn set_pressure_level(level: u8) {
    gauge!("l10n_cache_pressure_level").set(level as f64);
}

/// Record bytes reclaimed by a pressure cleanup
pub fn record_cleanup(kind: &str, bytes_freed: usize) {
    counter!("l10n_cache_cleanups_total", "kind" => kind.to_string()).increment(1);
    counter!("l10n_cache_cleanup_freed_bytes_total", "kind" => kind.to_string())
        .increment(bytes_freed as u64);
}

/// Record a string served from the dedup pool
pub fn record_dedup_hit() {
    counter!("l10n_cache_dedup_hits_total").increment(1);
}

/// Record a pressure handler that panicked
pub fn record_handler_failure() {
    counter!("l10n_cache_pressure_handler_failures_total").increment(1);
}

/// Record sweep duration
pub fn record_sweep(duration: Duration) {
    histogram!("l10n_cache_sweep_seconds").record(duration.as_secs_f64());
}

/// Record a sweep tick skipped because the previous one was still running
pub fn record_sweep_skipped() {
    counter!("l10n_cache_sweeps_skipped_total").increment(1);
}
