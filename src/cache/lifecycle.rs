//! Cache lifecycle: scheduled maintenance, cleanup and config watching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::saturating_millis;
use crate::config::ConfigUpdate;
use crate::metrics;
use crate::scheduler::Scheduler;
use crate::store::SweepReport;

use super::{CacheState, LocalizationCache, Shared};

/// Clears the sweep flag even if the sweep panics.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    pub(super) fn run_maintenance(&self) -> Option<SweepReport> {
        if self.sweeping.swap(true, Ordering::AcqRel) {
            metrics::record_sweep_skipped();
            debug!("Sweep already running, skipping tick");
            return None;
        }
        let _guard = SweepGuard(&self.sweeping);

        let report = self.store.lock().sweep();
        self.dispatch(&report.pressure.events);
        Some(report)
    }
}

impl LocalizationCache {
    /// Schedule the periodic sweep on `scheduler`.
    ///
    /// Replaces any previously scheduled sweep.
    #[tracing::instrument(skip(self, scheduler))]
    pub fn start(&self, scheduler: &dyn Scheduler) {
        let period = Duration::from_millis(self.shared.store.lock().config().sweep_interval_ms);
        let weak = Arc::downgrade(&self.shared);
        let handle = scheduler.schedule_recurring(
            period,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.run_maintenance();
                }
            }),
        );

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.cancel();
        }
        self.state.send_replace(CacheState::Running);
        info!(period_ms = saturating_millis(period), "Maintenance sweep scheduled");
    }

    /// Run one sweep now.
    ///
    /// Returns `None` when another sweep is already in progress.
    #[tracing::instrument(skip(self))]
    pub fn run_maintenance(&self) -> Option<SweepReport> {
        self.shared.run_maintenance()
    }

    /// Cancel the scheduled sweep, then drop all entries, pooled payloads and
    /// pressure handlers.
    #[tracing::instrument(skip(self))]
    pub fn cleanup(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel();
        }
        {
            let mut store = self.shared.store.lock();
            store.clear();
            store.reset_pressure();
        }
        self.shared.handlers.write().clear();
        self.state.send_replace(CacheState::Stopped);
        info!("Cache cleaned up");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_cancelled())
    }

    /// Apply configuration updates published on `rx` until the sender is
    /// dropped.
    ///
    /// ```rust,no_run
    /// # use l10n_cache::{CacheConfig, ConfigUpdate, LocalizationCache};
    /// # use std::sync::Arc;
    /// # use tokio::sync::watch;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let cache = Arc::new(LocalizationCache::new(CacheConfig::default()).unwrap());
    /// let (tx, rx) = watch::channel(ConfigUpdate::default());
    ///
    /// let watcher = Arc::clone(&cache);
    /// tokio::spawn(async move { watcher.watch_config(rx).await });
    ///
    /// tx.send(ConfigUpdate { max_memory_bytes: Some(8 << 20), ..Default::default() }).unwrap();
    /// # }
    /// ```
    pub async fn watch_config(&self, mut rx: watch::Receiver<ConfigUpdate>) {
        while rx.changed().await.is_ok() {
            let update = rx.borrow_and_update().clone();
            if let Err(e) = self.update_configuration(&update) {
                warn!(error = %e, "Rejected configuration update");
                metrics::record_error("update_configuration", e.kind());
            }
        }
        debug!("Configuration channel closed");
    }
}
