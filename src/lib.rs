//! # l10n-cache
//!
//! A tiered, memory-pressure-aware cache for localization payloads
//! (translation bundles, UI string tables, per-locale resources).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   LocalizationCache (facade)                │
//! │  • set / get / delete / has / get_multiple                 │
//! │  • Pressure handlers, scheduled sweep, runtime config      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TieredStore                             │
//! │  • Hot / warm / cold maps, one tier per key                │
//! │  • Capacity ceiling with scored eviction                   │
//! │  • Access patterns drive tier migration                    │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//! ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │ PayloadCodec   │  │ EvictionScorer   │  │ PressureMonitor  │
//! │ substitution,  │  │ lru / lfu / ttl  │  │ dedup pool,      │
//! │ key shortening │  │ / adaptive       │  │ object registry  │
//! └────────────────┘  └──────────────────┘  └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use l10n_cache::{CacheConfig, LocalizationCache, SetOptions};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let cache = LocalizationCache::new(CacheConfig {
//!     max_memory_bytes: 8 * 1024 * 1024,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let bundle = json!({"menu": {"play": "Play", "quit": "Quit"}});
//! cache.set("en-GB/menu", &bundle, SetOptions::new().with_ttl(Duration::from_secs(600)));
//!
//! assert_eq!(cache.get("en-GB/menu"), Some(bundle));
//! assert!(cache.get("fr-FR/menu").is_none());
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: The [`LocalizationCache`] facade
//! - [`store`]: Three-tier entry store and statistics
//! - [`codec`]: Reversible payload compression
//! - [`eviction`]: Removability scoring strategies
//! - [`tiering`]: Initial placement and access-driven rebalancing
//! - [`pressure`]: Memory pressure monitor, dedup pool, object registry
//! - [`recency`]: Standalone strict-LRU cache
//! - [`scheduler`]: Recurring task scheduling (tokio or manual)

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod eviction;
pub mod metrics;
pub mod pressure;
pub mod recency;
pub mod scheduler;
pub mod store;
pub mod tiering;

pub use cache::{CacheState, HandlerId, LocalizationCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::CompressionLevel;
pub use config::{CacheConfig, ConfigUpdate};
pub use entry::{CacheEntry, Priority, SetOptions, Tier};
pub use error::{CacheError, CacheResult};
pub use eviction::{EvictionStrategy, ScoreWeights};
pub use pressure::{AggregateMemoryUsage, PooledValue, PressureCheck, PressureEvent, PressureLevel};
pub use recency::{RecencyCache, RecencyStats};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskHandle, TokioScheduler};
pub use store::{CacheStats, LayerDistribution, StoreCounters, SweepReport, TieredStore};
pub use tiering::PerformanceMode;
