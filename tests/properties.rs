//! Property-based tests for the cache invariants.
//!
//! Run with: `cargo test --test properties`

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Value};

use l10n_cache::codec::PayloadCodec;
use l10n_cache::eviction::EvictionScorer;
use l10n_cache::{
    CacheConfig, CacheEntry, CompressionLevel, EvictionStrategy, LocalizationCache, ManualClock,
    Priority, ScoreWeights, SetOptions, Tier,
};

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Set { key: u8, len: usize, priority: u8 },
    Get { key: u8 },
    Delete { key: u8 },
    Advance { millis: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16, 0usize..3_000, 0u8..3)
            .prop_map(|(key, len, priority)| Op::Set { key, len, priority }),
        3 => (0u8..16).prop_map(|key| Op::Get { key }),
        1 => (0u8..16).prop_map(|key| Op::Delete { key }),
        1 => (0u64..120_000).prop_map(|millis| Op::Advance { millis }),
    ]
}

fn opts_for(priority: u8) -> SetOptions {
    match priority {
        0 => SetOptions::low(),
        1 => SetOptions::default(),
        _ => SetOptions::high(),
    }
}

/// Arbitrary JSON; floats are finite since JSON has no NaN or infinity.
fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| json!(f)),
        "[ -~]{0,24}".prop_map(Value::String),
        prop::sample::select(vec!["settings.", "information", "message", "error", "~0"])
            .prop_map(|s| json!(s)),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::hash_map("[a-z~.]{0,8}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn cache(ceiling: usize) -> (LocalizationCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let config = CacheConfig {
        max_memory_bytes: ceiling,
        ..Default::default()
    };
    (LocalizationCache::with_clock(config, clock.clone()).unwrap(), clock)
}

// =============================================================================
// Store invariants
// =============================================================================

proptest! {
    /// Aggregate size never exceeds the ceiling after any set
    #[test]
    fn prop_capacity_holds(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let ceiling = 8_192;
        let (cache, clock) = cache(ceiling);

        for op in ops {
            match op {
                Op::Set { key, len, priority } => {
                    cache.set(&format!("k{key}"), &json!("x".repeat(len)), opts_for(priority));
                    prop_assert!(cache.aggregate_size() <= ceiling);
                }
                Op::Get { key } => { cache.get(&format!("k{key}")); }
                Op::Delete { key } => { cache.delete(&format!("k{key}")); }
                Op::Advance { millis } => clock.advance(std::time::Duration::from_millis(millis)),
            }
        }
    }

    /// Every live key sits in exactly the tier its metadata names
    #[test]
    fn prop_tier_exclusivity(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let (cache, clock) = cache(16_384);

        for op in ops {
            match op {
                Op::Set { key, len, priority } => {
                    cache.set(&format!("k{key}"), &json!("x".repeat(len)), opts_for(priority));
                }
                Op::Get { key } => { cache.get(&format!("k{key}")); }
                Op::Delete { key } => { cache.delete(&format!("k{key}")); }
                Op::Advance { millis } => clock.advance(std::time::Duration::from_millis(millis)),
            }

            for key in 0u8..16 {
                let key = format!("k{key}");
                let holding = cache.tiers_holding(&key);
                match cache.tier_of(&key) {
                    Some(tier) => prop_assert_eq!(holding, vec![tier]),
                    None => prop_assert!(holding.is_empty()),
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.layer_distribution.total(), stats.entries);
    }

    /// Whatever is stored comes back unchanged
    #[test]
    fn prop_store_roundtrip(payload in payload_strategy(), force in any::<bool>()) {
        let (cache, _) = cache(1 << 20);
        let opts = if force { SetOptions::new().force_compress() } else { SetOptions::new() };

        prop_assert!(cache.set("bundle", &payload, opts));
        prop_assert_eq!(cache.get("bundle"), Some(payload));
    }
}

// =============================================================================
// Codec
// =============================================================================

proptest! {
    /// decode(encode(p)) == p at every level, compressed or not
    #[test]
    fn prop_codec_roundtrip(
        payload in payload_strategy(),
        level in prop::sample::select(vec![
            CompressionLevel::Fast,
            CompressionLevel::Balanced,
            CompressionLevel::Maximum,
        ]),
        force in any::<bool>(),
    ) {
        let config = CacheConfig {
            compression_level: level,
            min_compression_bytes: 0,
            ..Default::default()
        };
        let mut codec = PayloadCodec::new(&config);

        let encoded = codec.encode(&payload, force).unwrap();
        prop_assert_eq!(encoded.encoded_size(), encoded.bytes.len());
        let decoded = codec.decode(&encoded.bytes).unwrap();
        prop_assert_eq!(decoded, payload);
    }

    /// Arbitrary bytes never panic the decoder
    #[test]
    fn prop_decode_garbage_is_an_error_not_a_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut codec = PayloadCodec::new(&CacheConfig::default());
        let _ = codec.decode(&bytes);
    }
}

// =============================================================================
// Scoring
// =============================================================================

fn entry(access_count: u64, idle_ms: u64, size: usize, ttl_ms: Option<u64>) -> CacheEntry {
    let now = 10_000_000;
    CacheEntry {
        key: "k".into(),
        tier: Tier::Warm,
        created_at: now - 3_600_000,
        last_accessed_at: now - idle_ms,
        access_count,
        ttl_ms,
        priority: Priority::Normal,
        original_size: size,
        encoded_size: size,
        is_compressed: false,
    }
}

proptest! {
    /// More accesses never make an entry more removable
    #[test]
    fn prop_adaptive_monotone_in_accesses(
        base in 0u64..10_000,
        extra in 0u64..10_000,
        idle_ms in 0u64..3_600_000,
        size in 0usize..200_000,
        ttl_ms in prop::option::of(1u64..7_200_000),
    ) {
        let scorer = EvictionScorer::new(EvictionStrategy::Adaptive, ScoreWeights::default());
        let now = 10_000_000;

        let fewer = scorer.score(&entry(base, idle_ms, size, ttl_ms), now);
        let more = scorer.score(&entry(base + extra, idle_ms, size, ttl_ms), now);
        prop_assert!(more <= fewer, "{} accesses scored {} > {}", base + extra, more, fewer);
    }
}
