//! # Pool Statistics
//!
//! Cumulative counters live inside the pool state and are only touched under
//! the pool's write lock, so a snapshot never shows a half-applied operation
//! (e.g. an entity gone from the registry with the release not yet counted).

use serde::Serialize;

/// Cumulative counters, mutated under the pool lock.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub(crate) created: u64,
    pub(crate) allocated: u64,
    pub(crate) released: u64,
    pub(crate) peak_in_use: usize,
}

impl Counters {
    /// Counts a served allocate. `in_use` is the registry size after insert.
    pub(crate) fn record_allocation(&mut self, constructed: bool, in_use: usize) {
        self.allocated += 1;
        if constructed {
            self.created += 1;
        }
        self.peak_in_use = self.peak_in_use.max(in_use);
    }

    /// Counts an entity returned to the free list.
    pub(crate) fn record_release(&mut self) {
        self.released += 1;
    }

    pub(crate) fn snapshot(&self, in_use: usize, free: usize, capacity: usize) -> PoolStats {
        PoolStats {
            created: self.created,
            allocated: self.allocated,
            released: self.released,
            peak_in_use: self.peak_in_use,
            in_use,
            free,
            capacity,
            reuse_rate: reuse_rate(self.allocated, self.created),
        }
    }
}

/// Fraction of allocations served by recycling instead of constructing.
fn reuse_rate(allocated: u64, created: u64) -> f64 {
    if allocated == 0 {
        return 0.0;
    }
    allocated.saturating_sub(created) as f64 / allocated as f64
}

/// Read-only snapshot of a pool's usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PoolStats {
    /// Entities constructed since the pool was built.
    pub created: u64,
    /// Successful allocations served.
    pub allocated: u64,
    /// Entities returned to the free list (by release, force-release or cleanup).
    pub released: u64,
    /// Highest number of entities in use at once.
    pub peak_in_use: usize,
    /// Entities in use right now.
    pub in_use: usize,
    /// Entities on the free list right now.
    pub free: usize,
    /// Maximum number of entities the pool will ever construct.
    pub capacity: usize,
    /// `(allocated - created) / allocated`, or 0 before the first allocation.
    pub reuse_rate: f64,
}

impl PoolStats {
    /// Share of the capacity currently in use (0.0 to 1.0).
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.in_use as f64 / self.capacity as f64
    }

    /// Capacity not yet handed out: free entities plus never-constructed ones.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.in_use)
    }
}
