// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Recurring task scheduling.
//!
//! The cache never owns a timer directly: [`LocalizationCache::start`](crate::LocalizationCache::start)
//! hands its sweep to a [`Scheduler`]. [`TokioScheduler`] drives it from a
//! tokio interval; [`ManualScheduler`] runs due tasks only when a test
//! advances simulated time.
//!
//! ```
//! use l10n_cache::{ManualClock, ManualScheduler, Scheduler};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = ManualScheduler::new(Arc::new(ManualClock::new(0)));
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&ticks);
//! let handle = scheduler.schedule_recurring(
//!     Duration::from_secs(30),
//!     Box::new(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }),
//! );
//!
//! scheduler.advance(Duration::from_secs(95));
//! assert_eq!(ticks.load(Ordering::SeqCst), 3);
//!
//! handle.cancel();
//! scheduler.advance(Duration::from_secs(60));
//! assert_eq!(ticks.load(Ordering::SeqCst), 3);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::clock::{saturating_millis, Clock, ManualClock};

/// Work run on every tick.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Something that can run a task periodically.
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first after one full period.
    fn schedule_recurring(&self, period: Duration, task: Task) -> TaskHandle;
}

/// Cancels its task when cancelled or dropped.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    fn new(cancelled: Arc<AtomicBool>, join: Option<JoinHandle<()>>) -> Self {
        Self { cancelled, join }
    }

    /// Stop the task. A tick already running finishes; no new tick starts.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!("Recurring task cancelled");
        }
        if let Some(join) = &self.join {
            join.abort();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime this is called from, if any.
    #[must_use]
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_recurring(&self, period: Duration, mut task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let join = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                task();
            }
        });

        TaskHandle::new(cancelled, Some(join))
    }
}

struct ManualTask {
    period_ms: u64,
    next_due: u64,
    cancelled: Arc<AtomicBool>,
    task: Arc<Mutex<Task>>,
}

/// Deterministic scheduler for tests, driven by a [`ManualClock`].
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    tasks: Mutex<Vec<ManualTask>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.clock.now_millis())
            .field("tasks", &self.tasks.lock().len())
            .finish()
    }
}

impl ManualScheduler {
    #[must_use]
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward by `by`, running every tick that falls due in
    /// order. Returns how many ticks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now_millis().saturating_add(saturating_millis(by));
        let mut ran = 0;

        loop {
            let due = {
                let mut tasks = self.tasks.lock();
                tasks.retain(|t| !t.cancelled.load(Ordering::Acquire));
                tasks
                    .iter_mut()
                    .filter(|t| t.next_due <= target)
                    .min_by_key(|t| t.next_due)
                    .map(|t| {
                        let at = t.next_due;
                        t.next_due += t.period_ms;
                        (at, Arc::clone(&t.task), Arc::clone(&t.cancelled))
                    })
            };
            let Some((at, task, cancelled)) = due else {
                break;
            };

            self.clock.set(at);
            // Lock released above so the task may schedule or cancel
            if !cancelled.load(Ordering::Acquire) {
                let mut run = task.lock();
                (*run)();
                ran += 1;
            }
        }

        self.clock.set(target);
        ran
    }

    /// Live (uncancelled) tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::Acquire))
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_recurring(&self, period: Duration, task: Task) -> TaskHandle {
        let period_ms = saturating_millis(period).max(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks.lock().push(ManualTask {
            period_ms,
            next_due: self.clock.now_millis() + period_ms,
            cancelled: Arc::clone(&cancelled),
            task: Arc::new(Mutex::new(task)),
        });
        TaskHandle::new(cancelled, None)
    }
}
