//! Per-handle dispatch statistics
//!
//! Counters are relaxed atomics owned by a single handle. They are only
//! allocated when [`ProviderConfig::track_stats`](crate::ProviderConfig) is set.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Atomic dispatch counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    allocations: AtomicU64,
    frees: AtomicU64,
    bytes_allocated: AtomicU64,
    bytes_outstanding: AtomicU64,
    failures: AtomicU64,
    lazy_purges: AtomicU64,
    forced_purges: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn record_alloc(&self, size: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated.fetch_add(size as u64, Ordering::Relaxed);
        self.bytes_outstanding.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_free(&self, size: usize) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        // Saturate: a caller freeing with a wrong size must not wrap the gauge.
        let _ = self
            .bytes_outstanding
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size as u64))
            });
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_purge(&self, forced: bool) {
        let counter = if forced {
            &self.forced_purges
        } else {
            &self.lazy_purges
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            bytes_outstanding: self.bytes_outstanding.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            lazy_purges: self.lazy_purges.load(Ordering::Relaxed),
            forced_purges: self.forced_purges.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Successful allocations
    pub allocations: u64,
    /// Successful frees
    pub frees: u64,
    /// Total bytes handed out
    pub bytes_allocated: u64,
    /// Bytes allocated and not yet freed
    pub bytes_outstanding: u64,
    /// Dispatched operations that did not succeed
    pub failures: u64,
    /// Successful lazy purges
    pub lazy_purges: u64,
    /// Successful forced purges
    pub forced_purges: u64,
}

impl StatsSnapshot {
    /// Allocations not yet matched by a free
    #[inline]
    pub const fn live_allocations(&self) -> u64 {
        self.allocations.saturating_sub(self.frees)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocs: {}, frees: {}, outstanding: {} bytes, failures: {}, \
             purges: {} lazy / {} forced",
            self.allocations,
            self.frees,
            self.bytes_outstanding,
            self.failures,
            self.lazy_purges,
            self.forced_purges
        )
    }
}
