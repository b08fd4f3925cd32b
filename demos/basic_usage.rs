// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic l10n-cache usage example.
//!
//! Demonstrates:
//! 1. Configuring the cache and starting the background sweep
//! 2. Storing a few locale bundles at different priorities
//! 3. Checking existence and fetching entries back
//! 4. Reacting to memory pressure
//! 5. Displaying statistics
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=l10n_cache=debug cargo run --example basic_usage
//! ```

use std::time::Duration;

use l10n_cache::{CacheConfig, LocalizationCache, SetOptions, TokioScheduler};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("l10n_cache=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and start
    // ─────────────────────────────────────────────────────────────────────────
    let cache = LocalizationCache::new(CacheConfig {
        max_memory_bytes: 256 * 1024,
        sweep_interval_ms: 1_000,
        ..Default::default()
    })?;
    let scheduler = TokioScheduler::try_current().ok_or("no tokio runtime")?;
    cache.start(&scheduler);
    println!("State: {}", cache.state());

    cache.on_pressure(|event| println!("Memory pressure: {event:?}"));

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Store bundles
    // ─────────────────────────────────────────────────────────────────────────
    let bundles = [
        ("en-GB/menu", json!({"menu": {"play": "Play", "options": "Options", "quit": "Quit"}}), SetOptions::high()),
        ("fr-FR/menu", json!({"menu": {"play": "Jouer", "options": "Options", "quit": "Quitter"}}), SetOptions::default()),
        ("de-DE/credits", json!({"credits": vec!["Danke fürs Spielen"; 200]}), SetOptions::low()),
        ("ja-JP/toast", json!({"saved": "保存しました"}), SetOptions::new().with_ttl(Duration::from_millis(500))),
    ];
    for (key, bundle, opts) in &bundles {
        let stored = cache.set(key, bundle, opts.clone());
        println!("set {key:<14} stored={stored} tier={:?}", cache.tier_of(key));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Read back
    // ─────────────────────────────────────────────────────────────────────────
    for (key, bundle, _) in &bundles {
        assert!(cache.has(key));
        assert_eq!(cache.get(key).as_ref(), Some(bundle));
    }
    println!("get fr-FR/menu -> {}", cache.get("fr-FR/menu").unwrap_or_default());

    // The toast expires and the next sweep drops it
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    println!("ja-JP/toast after sweep: {:?}", cache.get("ja-JP/toast"));

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Push towards the ceiling
    // ─────────────────────────────────────────────────────────────────────────
    for i in 0..64 {
        let filler = json!(format!("{:0>4096}", i));
        cache.set(&format!("filler.{i}"), &filler, SetOptions::low());
        cache.check_memory();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Statistics
    // ─────────────────────────────────────────────────────────────────────────
    let stats = cache.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Shutdown
    // ─────────────────────────────────────────────────────────────────────────
    cache.cleanup();
    println!("State: {}", cache.state());
    Ok(())
}
