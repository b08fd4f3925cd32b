// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

struct Tracked {
    handle: Weak<dyn Any + Send + Sync>,
    bytes: usize,
    generation: u64,
}

/// Weak handles to shared objects handed out by the cache.
///
/// The registry never keeps an object alive. `reap` forgets handles whose
/// object has been dropped; `shrink_to` forgets the oldest handles so the
/// registry itself stays small under pressure.
#[derive(Default)]
pub struct ObjectRegistry {
    tracked: VecDeque<Tracked>,
    next_generation: u64,
    tracked_bytes: usize,
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("tracked", &self.tracked.len())
            .field("tracked_bytes", &self.tracked_bytes)
            .field("next_generation", &self.next_generation)
            .finish()
    }
}

impl ObjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `obj`. Returns its generation.
    pub fn track<T: Any + Send + Sync>(&mut self, obj: &Arc<T>, bytes: usize) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        let weak: Weak<T> = Arc::downgrade(obj);
        let handle: Weak<dyn Any + Send + Sync> = weak;
        self.tracked.push_back(Tracked {
            handle,
            bytes,
            generation,
        });
        self.tracked_bytes += bytes;
        generation
    }

    /// Forget handles whose object is gone. Returns bytes no longer tracked.
    pub fn reap(&mut self) -> usize {
        let before = self.tracked_bytes;
        let mut released = 0usize;
        self.tracked.retain(|t| {
            let alive = t.handle.strong_count() > 0;
            if !alive {
                released += t.bytes;
            }
            alive
        });
        self.tracked_bytes = before - released;
        released
    }

    /// Keep only the newest `ratio` of handles. Returns bytes no longer tracked.
    pub fn shrink_to(&mut self, ratio: f64) -> usize {
        let keep = (self.tracked.len() as f64 * ratio.clamp(0.0, 1.0)) as usize;
        let mut released = 0usize;
        while self.tracked.len() > keep {
            if let Some(oldest) = self.tracked.pop_front() {
                released += oldest.bytes;
            }
        }
        self.tracked_bytes -= released;
        released
    }

    pub fn clear(&mut self) -> usize {
        self.tracked.clear();
        std::mem::take(&mut self.tracked_bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Bytes of every tracked handle, live or not yet reaped.
    #[must_use]
    pub fn tracked_bytes(&self) -> usize {
        self.tracked_bytes
    }

    /// Generation of the oldest handle still tracked.
    #[must_use]
    pub fn oldest_generation(&self) -> Option<u64> {
        self.tracked.front().map(|t| t.generation)
    }
}
