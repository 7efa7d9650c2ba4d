//! Aggregate arena counters for external metrics collectors
//!
//! Whole-arena totals distinct from the per-cache usage counters (those live
//! on [`Cache`] and are read through the arena map). All counters are
//! monotonic within a collection interval; the external aggregator resets
//! them at interval boundaries.
//!
//! [`Cache`]: crate::arena::cache::Cache

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics registry for one arena
#[derive(Debug, Default)]
pub struct ArenaMetrics {
    /// Blocks successfully placed by any distribution strategy
    pub blocks_distributed: AtomicU64,
    /// Distribution attempts that exhausted their retry budget
    pub distribution_failures: AtomicU64,
    /// Drops rerouted to redistribution after a spatial conflict
    pub drops_rerouted: AtomicU64,
    /// Drops resolved directly at the requested cell
    pub drops_direct: AtomicU64,
    /// Drops absorbed into an existing cache
    pub drops_into_cache: AtomicU64,
    /// Free-block pickups by robots
    pub block_pickups: AtomicU64,
    /// Caches destroyed for falling below minimum membership
    pub caches_purged: AtomicU64,
}

impl ArenaMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Interval reset, invoked only by the external aggregator
    pub fn reset(&self) {
        self.blocks_distributed.store(0, Ordering::Relaxed);
        self.distribution_failures.store(0, Ordering::Relaxed);
        self.drops_rerouted.store(0, Ordering::Relaxed);
        self.drops_direct.store(0, Ordering::Relaxed);
        self.drops_into_cache.store(0, Ordering::Relaxed);
        self.block_pickups.store(0, Ordering::Relaxed);
        self.caches_purged.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_and_reset() {
        let metrics = ArenaMetrics::new();
        ArenaMetrics::incr(&metrics.blocks_distributed);
        ArenaMetrics::incr(&metrics.blocks_distributed);
        ArenaMetrics::incr(&metrics.drops_rerouted);
        assert_eq!(metrics.blocks_distributed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.drops_rerouted.load(Ordering::Relaxed), 1);

        metrics.reset();
        assert_eq!(metrics.blocks_distributed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.drops_rerouted.load(Ordering::Relaxed), 0);
    }
}
