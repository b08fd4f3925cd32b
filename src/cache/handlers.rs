//! Memory pressure handler registry and dispatch.
//!
//! Handlers run after the store lock is released, one at a time, each under
//! `catch_unwind`. A panicking handler is logged and counted; the rest still
//! run and the monitor's state is unaffected.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::metrics;
use crate::pressure::PressureEvent;

use super::{HandlerId, LocalizationCache, Shared};

pub(super) type PressureHandler = Arc<dyn Fn(PressureEvent) + Send + Sync>;

impl LocalizationCache {
    /// Register a callback for pressure level transitions.
    ///
    /// Called with [`PressureEvent::Warning`] and [`PressureEvent::Critical`]
    /// when usage crosses the thresholds and [`PressureEvent::Recovered`] when
    /// it drops back to normal. Handlers must not block.
    pub fn on_pressure<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(PressureEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.shared.next_handler.fetch_add(1, Ordering::Relaxed));
        self.shared.handlers.write().push((id, Arc::new(handler)));
        debug!(handler = %id, "Pressure handler registered");
        id
    }

    /// Unregister a handler. Returns false if it was not registered.
    pub fn remove_pressure_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.shared.handlers.write();
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        before != handlers.len()
    }

    #[must_use]
    pub fn pressure_handler_count(&self) -> usize {
        self.shared.handlers.read().len()
    }
}

impl Shared {
    /// Deliver `events` in order to every registered handler.
    pub(super) fn dispatch(&self, events: &[PressureEvent]) {
        if events.is_empty() {
            return;
        }
        // Snapshot so handlers may (un)register without deadlocking
        let handlers: Vec<(HandlerId, PressureHandler)> = self.handlers.read().clone();

        for &event in events {
            for (id, handler) in &handlers {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
                if outcome.is_err() {
                    self.handler_failures.fetch_add(1, Ordering::Relaxed);
                    metrics::record_handler_failure();
                    warn!(handler = %id, event = ?event, "Pressure handler panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use parking_lot::Mutex;

    fn recorder(cache: &LocalizationCache) -> (HandlerId, Arc<Mutex<Vec<PressureEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = cache.on_pressure(move |event| sink.lock().push(event));
        (id, seen)
    }

    #[test]
    fn test_dispatch_reaches_every_handler() {
        let cache = LocalizationCache::new(CacheConfig::default()).unwrap();
        let (_, first) = recorder(&cache);
        let (_, second) = recorder(&cache);

        cache.shared.dispatch(&[PressureEvent::Warning, PressureEvent::Recovered]);

        let expected = vec![PressureEvent::Warning, PressureEvent::Recovered];
        assert_eq!(*first.lock(), expected);
        assert_eq!(*second.lock(), expected);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let cache = LocalizationCache::new(CacheConfig::default()).unwrap();
        cache.on_pressure(|_| panic!("handler failure"));
        let (_, seen) = recorder(&cache);

        cache.shared.dispatch(&[PressureEvent::Critical]);

        assert_eq!(*seen.lock(), vec![PressureEvent::Critical]);
        assert_eq!(cache.stats().handler_failures, 1);
    }

    #[test]
    fn test_remove_handler() {
        let cache = LocalizationCache::new(CacheConfig::default()).unwrap();
        let (id, seen) = recorder(&cache);
        assert_eq!(cache.pressure_handler_count(), 1);

        assert!(cache.remove_pressure_handler(id));
        assert!(!cache.remove_pressure_handler(id));
        cache.shared.dispatch(&[PressureEvent::Warning]);
        assert!(seen.lock().is_empty());
    }
}
