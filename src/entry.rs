// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entry metadata and per-call options.
//!
//! A [`CacheEntry`] describes one cached payload. The encoded bytes themselves
//! live in exactly one tier map of the store; `entry.tier` always names it.
//!
//! # Example
//!
//! ```
//! use l10n_cache::{Priority, SetOptions, Tier};
//! use std::time::Duration;
//!
//! // Default: normal priority, configured TTL, placement decides the tier
//! let opts = SetOptions::default();
//! assert_eq!(opts.priority, Priority::Normal);
//!
//! // Short-lived, pinned to the hot tier
//! let opts = SetOptions::new()
//!     .with_ttl(Duration::from_secs(30))
//!     .with_tier(Tier::Hot);
//! assert_eq!(opts.tier, Some(Tier::Hot));
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage tier, from most to least frequently accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Warm, Tier::Cold];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-assigned importance, used by balanced placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Metadata for one cached payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub key: String,
    /// Tier map currently holding the bytes
    pub tier: Tier,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
    /// Timestamp of last access (epoch millis)
    pub last_accessed_at: u64,
    /// Number of times accessed (monotonic)
    pub access_count: u64,
    /// Time to live in millis. `None` means no expiry.
    pub ttl_ms: Option<u64>,
    pub priority: Priority,
    /// Plain JSON size in bytes
    pub original_size: usize,
    /// Stored size in bytes (what placement and capacity use)
    pub encoded_size: usize,
    pub is_compressed: bool,
}

impl CacheEntry {
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        is_expired(self.created_at, self.ttl_ms, now)
    }

    /// Millis left before expiry; `None` when the entry never expires.
    #[must_use]
    pub fn remaining_ttl_ms(&self, now: u64) -> Option<u64> {
        self.ttl_ms
            .map(|ttl| self.created_at.saturating_add(ttl).saturating_sub(now))
    }

    pub fn record_access(&mut self, now: u64) {
        self.last_accessed_at = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Approximate heap + inline footprint of this record, for accounting.
    #[must_use]
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.key.len()
    }
}

/// An entry is expired once strictly more than `ttl` has elapsed since
/// creation. Shared by the store and the recency cache.
#[inline]
#[must_use]
pub fn is_expired(created_at: u64, ttl_ms: Option<u64>, now: u64) -> bool {
    match ttl_ms {
        Some(ttl) => now.saturating_sub(created_at) > ttl,
        None => false,
    }
}

/// Options for a single `set` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    /// TTL for this entry. `None` falls back to the configured default.
    pub ttl: Option<Duration>,

    /// Default: [`Priority::Normal`]
    pub priority: Priority,

    /// Store compressed even when the codec would skip it.
    pub force_compress: bool,

    /// Force a tier instead of letting placement decide.
    pub tier: Option<Tier>,
}

impl SetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn force_compress(mut self) -> Self {
        self.force_compress = true;
        self
    }

    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Shorthand for high priority.
    #[must_use]
    pub fn high() -> Self {
        Self::new().with_priority(Priority::High)
    }

    /// Shorthand for low priority.
    #[must_use]
    pub fn low() -> Self {
        Self::new().with_priority(Priority::Low)
    }
}
