//! Eviction policies for the tiered store.
//!
//! Every strategy maps an entry to a removability score: **higher scores are
//! evicted first**. The store ranks candidates, then evicts in descending
//! score order until enough bytes are freed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  mod.rs     - Strategy selection and adaptive weights        │
//! │  └─ EvictionStrategy: lru | lfu | ttl | adaptive             │
//! │  └─ ScoreWeights: frequency + recency + size + ttl = 1       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  scorer.rs  - Scoring and victim selection                   │
//! │  └─ EvictionScorer: entry → score, ranking, victim cut-off   │
//! │  └─ EvictionCandidate: transient {key, size, score}          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod scorer;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

pub use scorer::{EvictionCandidate, EvictionScorer};

/// Which signal ranks entries for eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Longest idle first
    Lru,
    /// Fewest accesses first
    Lfu,
    /// Soonest expiry first; entries without TTL last
    Ttl,
    /// Weighted blend of frequency, recency, size and remaining TTL
    #[default]
    Adaptive,
}

/// Weights for [`EvictionStrategy::Adaptive`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    #[serde(default = "default_recency")]
    pub recency: f64,
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default = "default_ttl")]
    pub ttl: f64,
}

fn default_frequency() -> f64 { 0.4 }
fn default_recency() -> f64 { 0.3 }
fn default_size() -> f64 { 0.2 }
fn default_ttl() -> f64 { 0.1 }

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            recency: default_recency(),
            size: default_size(),
            ttl: default_ttl(),
        }
    }
}

impl ScoreWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    /// Weights must be finite, non-negative and sum to 1.
    pub fn validate(&self) -> CacheResult<()> {
        let parts = [self.frequency, self.recency, self.size, self.ttl];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CacheError::InvalidConfig(
                "score weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(CacheError::InvalidConfig(format!(
                "score weights must sum to 1 (got {sum})"
            )));
        }
        Ok(())
    }
}
