//! Public types for the cache facade.

/// Cache lifecycle state.
///
/// Use [`super::LocalizationCache::state()`] to check the current state or
/// [`super::LocalizationCache::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Built, no maintenance scheduled
    Created,
    /// Periodic sweep scheduled
    Running,
    /// `cleanup()` ran; entries and timers are gone
    Stopped,
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Registration token returned by [`super::LocalizationCache::on_pressure()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(super) u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(CacheState::Created.to_string(), "Created");
        assert_eq!(CacheState::Running.to_string(), "Running");
        assert_eq!(CacheState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_handler_id_display() {
        assert_eq!(HandlerId(7).to_string(), "handler-7");
    }
}
