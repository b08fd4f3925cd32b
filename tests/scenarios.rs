//! End-to-end scenarios for the localization cache.
//!
//! All tests drive time through a `ManualClock`, so nothing here sleeps on
//! the wall clock.
//!
//! Run with: `cargo test --test scenarios`

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use l10n_cache::{
    CacheConfig, CacheState, LocalizationCache, ManualClock, ManualScheduler, PressureEvent,
    PressureLevel, RecencyCache, SetOptions, Tier, TokioScheduler,
};

const MIB: usize = 1024 * 1024;

fn cache_with(config: CacheConfig) -> (LocalizationCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = LocalizationCache::with_clock(config, clock.clone()).unwrap();
    (cache, clock)
}

/// A 50 KiB string payload, distinct per `i`.
fn fifty_kib(i: usize) -> Value {
    json!(format!("{:0>51200}", i))
}

// =============================================================================
// Placement
// =============================================================================

#[test]
fn high_priority_string_lands_hot() {
    let (cache, _) = cache_with(CacheConfig::default());

    assert!(cache.set("menu.title", &json!("Play"), SetOptions::high()));

    assert_eq!(cache.tier_of("menu.title"), Some(Tier::Hot));
    assert_eq!(cache.tiers_holding("menu.title"), vec![Tier::Hot]);
    assert_eq!(cache.stats().layer_distribution.hot, 1);
}

#[test]
fn low_priority_bundles_land_cold() {
    let (cache, _) = cache_with(CacheConfig::default());

    assert!(cache.set("fr-FR/credits", &fifty_kib(0), SetOptions::low()));
    assert_eq!(cache.tier_of("fr-FR/credits"), Some(Tier::Cold));
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn filling_past_the_ceiling_evicts() {
    let (cache, clock) = cache_with(CacheConfig {
        max_memory_bytes: MIB,
        ..Default::default()
    });

    let mut i = 0;
    loop {
        let next = serde_json::to_vec(&fifty_kib(i)).unwrap().len() + 1;
        if cache.aggregate_size() + next > MIB {
            break;
        }
        assert!(cache.set(&format!("bundle.{i}"), &fifty_kib(i), SetOptions::low()));
        clock.advance(Duration::from_millis(10));
        i += 1;
    }
    let filled = cache.aggregate_size();
    assert!(filled as f64 / MIB as f64 > 0.95, "filled to {filled} bytes");
    assert_eq!(cache.stats().eviction_count(), 0);

    assert!(cache.set("bundle.extra", &fifty_kib(i), SetOptions::low()));

    let stats = cache.stats();
    assert!(stats.eviction_count() >= 1);
    assert!(cache.aggregate_size() <= MIB);
    assert!(cache.has("bundle.extra"));
    assert!(stats.memory_usage_percent <= 100.0);
}

#[test]
fn payload_larger_than_ceiling_is_rejected() {
    let (cache, _) = cache_with(CacheConfig {
        max_memory_bytes: 10 * 1024,
        ..Default::default()
    });

    assert!(cache.set("small", &json!("ok"), SetOptions::default()));
    assert!(!cache.set("huge", &fifty_kib(1), SetOptions::default()));

    assert!(cache.has("small"));
    assert!(!cache.has("huge"));
    assert_eq!(cache.stats().counters.capacity_rejections, 1);
}

#[test]
fn lowering_the_ceiling_evicts_immediately() {
    let (cache, _) = cache_with(CacheConfig::default());
    for i in 0..10 {
        cache.set(&format!("bundle.{i}"), &fifty_kib(i), SetOptions::default());
    }

    let update = l10n_cache::ConfigUpdate {
        max_memory_bytes: Some(4 * 51_203),
        ..Default::default()
    };
    cache.update_configuration(&update).unwrap();

    assert!(cache.aggregate_size() <= 4 * 51_203);
    assert!(cache.len() <= 4);
}

#[test]
fn prices_come_back_bit_exact() {
    let (cache, _) = cache_with(CacheConfig::default());

    // xorshift64 over the whole finite f64 range
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for i in 0..2_000 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let price = f64::from_bits(state);
        if !price.is_finite() {
            continue;
        }
        let payload = json!({"price": price});
        let key = format!("shop.item_{i}");
        assert!(cache.set(&key, &payload, SetOptions::default()));
        assert_eq!(cache.get(&key), Some(payload), "price {price:e}");
    }
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn ttl_expires_between_reads() {
    let (cache, clock) = cache_with(CacheConfig::default());
    let opts = SetOptions::new().with_ttl(Duration::from_millis(100));
    assert!(cache.set("toast.saved", &json!("Saved"), opts));

    clock.advance(Duration::from_millis(50));
    assert_eq!(cache.get("toast.saved"), Some(json!("Saved")));

    clock.advance(Duration::from_millis(100));
    assert_eq!(cache.get("toast.saved"), None);
    assert!(cache.entry("toast.saved").is_none());
    assert_eq!(cache.aggregate_size(), 0);
}

// =============================================================================
// Recency cache
// =============================================================================

#[test]
fn recency_cache_evicts_least_recently_used() {
    let clock = Arc::new(ManualClock::new(0));
    let mut lru = RecencyCache::new(2, clock).unwrap();

    lru.set("A".into(), 1, None);
    lru.set("B".into(), 2, None);
    assert_eq!(lru.set("C".into(), 3, None), Some(("A".to_string(), 1)));

    assert_eq!(lru.get("B"), Some(2));
    assert_eq!(lru.set("D".into(), 4, None), Some(("C".to_string(), 3)));
    assert!(lru.contains("B"));
    assert!(lru.contains("D"));
}

// =============================================================================
// Memory pressure
// =============================================================================

#[test]
fn pressure_transitions_fire_once_each_despite_panicking_handler() {
    let (cache, _) = cache_with(CacheConfig {
        max_memory_bytes: 10_000,
        front_cache_entries: 0,
        ..Default::default()
    });
    cache.on_pressure(|_| panic!("misbehaving handler"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cache.on_pressure(move |event| sink.lock().push(event));

    let mut reached_critical = false;
    for i in 0..200 {
        assert!(cache.set(&format!("k{i:03}"), &json!("x".repeat(97)), SetOptions::default()));
        if cache.check_memory().level == PressureLevel::Critical {
            reached_critical = true;
            break;
        }
    }
    assert!(reached_critical);
    // Staying critical fires nothing new
    cache.check_memory();

    cache.clear();
    let check = cache.check_memory();
    assert_eq!(check.level, PressureLevel::Normal);

    assert_eq!(
        *seen.lock(),
        vec![PressureEvent::Warning, PressureEvent::Critical, PressureEvent::Recovered]
    );
    assert_eq!(cache.stats().handler_failures, 3);
}

#[test]
fn optimize_payload_deduplicates_strings() {
    let (cache, _) = cache_with(CacheConfig::default());
    let bundle = json!({"ok": "OK", "confirm": "OK", "cancel": "Cancel"});

    let pooled = cache.optimize_payload(&bundle);

    assert_eq!(pooled.to_value(), bundle);
    assert!(cache.stats().dedup_hits >= 1);
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn overlapping_sweep_is_skipped() {
    let (cache, _) = cache_with(CacheConfig {
        max_memory_bytes: 10_000,
        front_cache_entries: 0,
        ..Default::default()
    });
    let cache = Arc::new(cache);
    for i in 0..40 {
        cache.set(&format!("k{i:02}"), &json!("x".repeat(97)), SetOptions::default());
    }

    // A handler runs while the sweep is still in progress
    let nested = Arc::new(Mutex::new(Vec::new()));
    let (sink, weak): (_, Weak<LocalizationCache>) = (Arc::clone(&nested), Arc::downgrade(&cache));
    cache.on_pressure(move |_| {
        if let Some(cache) = weak.upgrade() {
            sink.lock().push(cache.run_maintenance().is_some());
        }
    });

    let report = cache.run_maintenance().expect("not overlapping");
    assert!(report.pressure.level.is_under_pressure());
    assert_eq!(*nested.lock(), vec![false]);

    assert!(cache.run_maintenance().is_some());
}

#[test]
fn scheduled_sweep_runs_until_cleanup() {
    let (cache, clock) = cache_with(CacheConfig {
        sweep_interval_ms: 1_000,
        ..Default::default()
    });
    let scheduler = ManualScheduler::new(clock.clone());
    cache.start(&scheduler);

    let short = SetOptions::new().with_ttl(Duration::from_millis(10));
    cache.set("a", &json!(1), short.clone());
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(cache.len(), 0);

    cache.cleanup();
    assert_eq!(cache.state(), CacheState::Stopped);

    cache.set("b", &json!(2), short);
    assert_eq!(scheduler.advance(Duration::from_secs(60)), 0);
    // Expired but never swept
    assert_eq!(cache.len(), 1);
    assert!(!cache.has("b"));
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_drives_sweeps() {
    let (cache, clock) = cache_with(CacheConfig {
        sweep_interval_ms: 30_000,
        ..Default::default()
    });
    let scheduler = TokioScheduler::try_current().expect("inside runtime");
    cache.start(&scheduler);

    cache.set("a", &json!(1), SetOptions::new().with_ttl(Duration::from_secs(5)));
    clock.advance(Duration::from_secs(10));
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(cache.len(), 0);

    cache.cleanup();
}

// =============================================================================
// Stats
// =============================================================================

#[test]
fn stats_snapshot_serializes() {
    let (cache, _) = cache_with(CacheConfig::default());
    cache.set("menu.play", &json!("Play"), SetOptions::high());
    cache.get("menu.play");
    cache.get("menu.missing");

    let stats = cache.stats();
    assert_eq!(stats.hit_rate, 0.5);

    let snapshot = serde_json::to_value(&stats).unwrap();
    assert_eq!(snapshot["hits"], json!(1));
    assert_eq!(snapshot["misses"], json!(1));
    assert_eq!(snapshot["layer_distribution"]["hot"], json!(1));
    assert_eq!(snapshot["pressure_level"], json!("normal"));
}
