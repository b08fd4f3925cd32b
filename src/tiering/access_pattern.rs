use std::collections::VecDeque;

use crate::entry::Tier;

/// Recent-access ratio above which a key belongs in the hot tier
const HOT_RATIO: f64 = 0.7;
/// Average interval (millis) below which a key belongs in the hot tier
const HOT_INTERVAL_MS: f64 = 60_000.0;
const WARM_RATIO: f64 = 0.3;
const WARM_INTERVAL_MS: f64 = 300_000.0;

/// Per-key access history driving tier rebalancing.
///
/// `recent_accesses` is a decaying counter: each access adds one and each
/// sweep multiplies it by the decay factor. The interval ring only remembers
/// the last `capacity` gaps between accesses and the average is recomputed
/// from the ring alone.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPattern {
    pub total_accesses: u64,
    pub recent_accesses: f64,
    pub last_access_ms: u64,
    intervals: VecDeque<u64>,
    capacity: usize,
    average_interval_ms: f64,
}

impl AccessPattern {
    /// Fresh pattern for an entry created at `now`.
    #[must_use]
    pub fn new(now: u64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            total_accesses: 0,
            recent_accesses: 0.0,
            last_access_ms: now,
            intervals: VecDeque::with_capacity(capacity),
            capacity,
            average_interval_ms: f64::INFINITY,
        }
    }

    pub fn record_access(&mut self, now: u64) {
        if self.intervals.len() == self.capacity {
            self.intervals.pop_front();
        }
        self.intervals.push_back(now.saturating_sub(self.last_access_ms));
        self.average_interval_ms =
            self.intervals.iter().sum::<u64>() as f64 / self.intervals.len() as f64;

        self.total_accesses = self.total_accesses.saturating_add(1);
        self.recent_accesses += 1.0;
        self.last_access_ms = now;
    }

    pub fn decay(&mut self, factor: f64) {
        self.recent_accesses *= factor;
    }

    /// Average gap between accesses; infinite before the first access.
    #[must_use]
    pub fn average_interval_ms(&self) -> f64 {
        self.average_interval_ms
    }

    #[must_use]
    pub fn recent_ratio(&self) -> f64 {
        self.recent_accesses / self.total_accesses.max(1) as f64
    }

    #[must_use]
    pub fn optimal_tier(&self) -> Tier {
        let ratio = self.recent_ratio();
        let avg = self.average_interval_ms;
        if ratio > HOT_RATIO && avg < HOT_INTERVAL_MS {
            Tier::Hot
        } else if ratio > WARM_RATIO && avg < WARM_INTERVAL_MS {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }

    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }
}
