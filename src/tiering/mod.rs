// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tier placement and rebalancing.
//!
//! New entries are placed by [`initial_tier`] from their encoded size and
//! priority under the configured [`PerformanceMode`]. After every successful
//! read the store asks the key's [`AccessPattern`] for its optimal tier and
//! migrates the bytes when it differs.
//!
//! # Example
//!
//! ```
//! use l10n_cache::tiering::{initial_tier, PerformanceMode};
//! use l10n_cache::{Priority, Tier};
//!
//! // Balanced: small strings go hot, bulky low-priority bundles go cold
//! assert_eq!(initial_tier(PerformanceMode::Balanced, 200, Priority::Normal), Tier::Hot);
//! assert_eq!(initial_tier(PerformanceMode::Balanced, 20 * 1024, Priority::Low), Tier::Cold);
//!
//! // Speed keeps anything under 10 KiB hot
//! assert_eq!(initial_tier(PerformanceMode::Speed, 8 * 1024, Priority::Low), Tier::Hot);
//! ```

mod access_pattern;

use serde::{Deserialize, Serialize};

use crate::entry::{Priority, Tier};

pub use access_pattern::AccessPattern;

/// Upper bound on remembered inter-access intervals per key
pub const MAX_INTERVAL_HISTORY: usize = 10;

const KIB: usize = 1024;

/// Initial placement policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    /// Keep as much as possible hot
    Speed,
    /// Push anything sizeable to colder tiers
    Memory,
    /// Priority first, then size
    #[default]
    Balanced,
}

/// Pick the tier for a new entry of `size` encoded bytes.
#[must_use]
pub fn initial_tier(mode: PerformanceMode, size: usize, priority: Priority) -> Tier {
    match mode {
        PerformanceMode::Speed => {
            if size < 10 * KIB {
                Tier::Hot
            } else {
                Tier::Warm
            }
        }
        PerformanceMode::Memory => {
            if size > 100 * KIB {
                Tier::Cold
            } else if size > 10 * KIB {
                Tier::Warm
            } else {
                Tier::Hot
            }
        }
        PerformanceMode::Balanced => {
            if priority == Priority::High || size < 5 * KIB {
                Tier::Hot
            } else if priority == Priority::Low || size > 50 * KIB {
                Tier::Cold
            } else {
                Tier::Warm
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_mode() {
        assert_eq!(initial_tier(PerformanceMode::Speed, 10 * KIB - 1, Priority::Low), Tier::Hot);
        assert_eq!(initial_tier(PerformanceMode::Speed, 10 * KIB, Priority::High), Tier::Warm);
    }

    #[test]
    fn test_memory_mode() {
        assert_eq!(initial_tier(PerformanceMode::Memory, 10 * KIB, Priority::Low), Tier::Hot);
        assert_eq!(initial_tier(PerformanceMode::Memory, 10 * KIB + 1, Priority::Low), Tier::Warm);
        assert_eq!(initial_tier(PerformanceMode::Memory, 100 * KIB, Priority::High), Tier::Warm);
        assert_eq!(initial_tier(PerformanceMode::Memory, 100 * KIB + 1, Priority::High), Tier::Cold);
    }

    #[test]
    fn test_balanced_mode() {
        let mode = PerformanceMode::Balanced;
        // High priority wins regardless of size
        assert_eq!(initial_tier(mode, 500 * KIB, Priority::High), Tier::Hot);
        // Small wins over low priority
        assert_eq!(initial_tier(mode, 4 * KIB, Priority::Low), Tier::Hot);
        assert_eq!(initial_tier(mode, 6 * KIB, Priority::Low), Tier::Cold);
        assert_eq!(initial_tier(mode, 6 * KIB, Priority::Normal), Tier::Warm);
        assert_eq!(initial_tier(mode, 50 * KIB, Priority::Normal), Tier::Warm);
        assert_eq!(initial_tier(mode, 50 * KIB + 1, Priority::Normal), Tier::Cold);
    }
}
