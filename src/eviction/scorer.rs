// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use crate::entry::CacheEntry;

use super::{EvictionStrategy, ScoreWeights};

/// Requests per second at which the frequency term saturates
const MAX_ACCESS_RATE: f64 = 10.0;
/// Idle time (seconds) at which the recency term saturates
const MAX_IDLE_SECS: f64 = 3600.0;
/// Size (KiB) at which the size term saturates
const MAX_SIZE_KIB: f64 = 1024.0;
/// Remaining TTL (seconds) beyond which an entry counts as long-lived
const MAX_TTL_SECS: f64 = 3600.0;
/// Entries younger than this are scored as if this old
const MIN_AGE_SECS: f64 = 1.0;

/// Transient ranking record, built per eviction pass
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionCandidate {
    pub key: String,
    pub size: usize,
    pub score: f64,
}

/// Scores entries under the configured strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionScorer {
    pub strategy: EvictionStrategy,
    pub weights: ScoreWeights,
}

impl EvictionScorer {
    #[must_use]
    pub fn new(strategy: EvictionStrategy, weights: ScoreWeights) -> Self {
        Self { strategy, weights }
    }

    /// Calculate removability (higher = evict first)
    #[must_use]
    pub fn score(&self, entry: &CacheEntry, now: u64) -> f64 {
        match self.strategy {
            EvictionStrategy::Lru => now.saturating_sub(entry.last_accessed_at) as f64,
            EvictionStrategy::Lfu => -(entry.access_count as f64),
            EvictionStrategy::Ttl => match entry.remaining_ttl_ms(now) {
                Some(remaining) => -(remaining as f64),
                None => f64::NEG_INFINITY,
            },
            EvictionStrategy::Adaptive => self.adaptive_score(entry, now),
        }
    }

    fn adaptive_score(&self, entry: &CacheEntry, now: u64) -> f64 {
        let age_secs = (now.saturating_sub(entry.created_at) as f64 / 1000.0).max(MIN_AGE_SECS);
        let rate = entry.access_count as f64 / age_secs;
        let frequency = rate.min(MAX_ACCESS_RATE) / MAX_ACCESS_RATE;

        let idle_secs = now.saturating_sub(entry.last_accessed_at) as f64 / 1000.0;
        let recency = idle_secs.min(MAX_IDLE_SECS) / MAX_IDLE_SECS;

        let size_kib = entry.encoded_size as f64 / 1024.0;
        let size = size_kib.min(MAX_SIZE_KIB) / MAX_SIZE_KIB;

        let ttl = match entry.remaining_ttl_ms(now) {
            Some(remaining) => (remaining as f64 / 1000.0).min(MAX_TTL_SECS) / MAX_TTL_SECS,
            None => 1.0,
        };

        let w = &self.weights;
        (1.0 - frequency) * w.frequency + recency * w.recency + size * w.size + (1.0 - ttl) * w.ttl
    }

    /// Score every entry and sort, most removable first (ties by key).
    pub fn rank<'a, I>(&self, entries: I, now: u64) -> Vec<EvictionCandidate>
    where
        I: IntoIterator<Item = &'a CacheEntry>,
    {
        let mut scored: Vec<_> = entries
            .into_iter()
            .map(|e| EvictionCandidate {
                key: e.key.clone(),
                size: e.encoded_size,
                score: self.score(e, now),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
        scored
    }

    /// Take candidates in order until `bytes_needed` would be freed.
    ///
    /// Returns fewer bytes than requested when the candidates run out.
    #[must_use]
    pub fn select_victims(
        candidates: Vec<EvictionCandidate>,
        bytes_needed: usize,
    ) -> Vec<EvictionCandidate> {
        let mut freed = 0usize;
        candidates
            .into_iter()
            .take_while(|c| {
                if freed >= bytes_needed {
                    return false;
                }
                freed += c.size;
                true
            })
            .collect()
    }
}
