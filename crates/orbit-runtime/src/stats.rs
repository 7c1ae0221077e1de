//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    emissions: AtomicU64,
    dropped: AtomicU64,
    invocations: AtomicU64,
    failures: AtomicU64,
    unregistered: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Emissions dispatched to a registered event.
    pub emissions: u64,
    /// Emissions discarded because the event was not registered.
    pub dropped: u64,
    /// Callback invocations, host and script.
    pub invocations: u64,
    /// Invocations that returned an error or panicked.
    pub failures: u64,
    /// Events removed by their own post hook.
    pub unregistered: u64,
}

impl DispatchStats {
    pub(crate) fn record_emission(&self) {
        self.emissions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unregistered(&self) {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emissions: self.emissions.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let stats = DispatchStats::default();
        stats.record_emission();
        stats.record_emission();
        stats.record_dropped();
        stats.record_invocation();
        stats.record_failure();
        stats.record_unregistered();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                emissions: 2,
                dropped: 1,
                invocations: 1,
                failures: 1,
                unregistered: 1,
            }
        );
    }
}
