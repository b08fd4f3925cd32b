// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy for the cache.
//!
//! Only [`CacheError::InvalidConfig`] ever reaches a caller. Every other
//! variant is handled inside the store: it is logged, counted in
//! [`CacheStats`](crate::CacheStats) and turned into a sentinel result
//! (`None` / `false`).

use thiserror::Error;

use crate::entry::Tier;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Configuration rejected at construction or update time
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload could not be transformed for storage
    #[error("failed to encode payload for '{key}': {reason}")]
    EncodeFailure { key: String, reason: String },

    /// Stored payload could not be read back
    #[error("failed to decode payload for '{key}': {reason}")]
    DecodeFailure { key: String, reason: String },

    /// Not enough space even after a full eviction pass
    #[error("capacity exhausted: {needed} bytes needed, ceiling is {ceiling} bytes")]
    CapacityExhausted { needed: usize, ceiling: usize },

    /// Metadata names a tier that does not hold the key
    #[error("metadata for '{key}' points at the {tier} tier but the value is missing")]
    ConsistencyFault { key: String, tier: Tier },
}

impl CacheError {
    /// Short label used for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::EncodeFailure { .. } => "encode",
            Self::DecodeFailure { .. } => "decode",
            Self::CapacityExhausted { .. } => "capacity",
            Self::ConsistencyFault { .. } => "consistency",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::CapacityExhausted { needed: 10, ceiling: 5 };
        assert_eq!(
            err.to_string(),
            "capacity exhausted: 10 bytes needed, ceiling is 5 bytes"
        );

        let err = CacheError::ConsistencyFault {
            key: "menu.title".into(),
            tier: Tier::Warm,
        };
        assert!(err.to_string().contains("warm tier"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CacheError::InvalidConfig("x".into()).kind(), "invalid_config");
        assert_eq!(
            CacheError::DecodeFailure { key: "k".into(), reason: "r".into() }.kind(),
            "decode"
        );
    }
}
