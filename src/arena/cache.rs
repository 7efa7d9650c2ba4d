//! Cache entities: ephemeral aggregations of blocks
//!
//! Caches have no behavior of their own; a cache whose membership falls
//! below [`Cache::MIN_BLOCKS`] is structurally invalid and must be destroyed
//! by its owner (the arena map). The cache class never self-destructs.

use smallvec::SmallVec;

use crate::arena::block::{BlockId, Spatial};
use crate::util::vec2::{GridCoord, Vec2};

/// Unique cache identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheId(pub u32);

/// A square aggregation of blocks anchored at a host cell
///
/// Equality is deliberately not derived: callers must pick [`Cache::idcmp`]
/// or [`Cache::dloccmp`] explicitly, so id-based and location-based
/// comparisons can never be confused.
#[derive(Debug, Clone)]
pub struct Cache {
    id: CacheId,
    /// Square footprint edge length (meters)
    dimension: f64,
    resolution: f64,
    center: Vec2,
    dcenter: GridCoord,
    /// Member blocks in insertion order, oldest first
    blocks: Vec<BlockId>,
    creation_ts: u64,

    // Per-interval usage counters, owned and reset externally
    block_pickups: u32,
    block_drops: u32,
    penalty_count: u64,
}

impl Cache {
    /// Minimum membership for a cache to be structurally valid; below this
    /// you just have a bunch of blocks.
    pub const MIN_BLOCKS: usize = 2;

    pub fn new(
        id: CacheId,
        dimension: f64,
        resolution: f64,
        center: Vec2,
        blocks: Vec<BlockId>,
        creation_ts: u64,
    ) -> Self {
        Self {
            id,
            dimension,
            resolution,
            dcenter: center.to_grid(resolution),
            center,
            blocks,
            creation_ts,
            block_pickups: 0,
            block_drops: 0,
            penalty_count: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> CacheId {
        self.id
    }

    pub fn creation_ts(&self) -> u64 {
        self.creation_ts
    }

    /// Compare for equality by id
    pub fn idcmp(&self, other: &Cache) -> bool {
        self.id == other.id
    }

    /// Compare for equality by discretized location
    pub fn dloccmp(&self, other: &Cache) -> bool {
        self.dcenter == other.dcenter
    }

    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Linear membership test by identifier
    pub fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.iter().any(|b| *b == id)
    }

    /// The block that has been in the cache the longest
    pub fn oldest_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Append a block; does not touch the block's location fields
    pub fn block_add(&mut self, id: BlockId) {
        self.blocks.push(id);
    }

    /// Remove a block by id, preserving insertion order of the rest; does
    /// not touch the block's location fields
    pub fn block_remove(&mut self, id: BlockId) -> bool {
        match self.blocks.iter().position(|b| *b == id) {
            Some(idx) => {
                self.blocks.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Host cell: the discretized center of the cache
    #[inline]
    pub fn host_cell(&self) -> GridCoord {
        self.dcenter
    }

    /// Every cell geometrically covered by the footprint, host cell first
    ///
    /// An n-cell edge spans `(n-1)/2` cells below the host and `n/2` above
    /// it, so even footprints stay n cells wide instead of rounding up to
    /// the next odd square.
    pub fn extent_cells(&self) -> SmallVec<[GridCoord; 9]> {
        let n = ((self.dimension / self.resolution).round() as usize).max(1);
        let x_lo = self.dcenter.x.saturating_sub((n - 1) / 2);
        let y_lo = self.dcenter.y.saturating_sub((n - 1) / 2);
        let x_hi = self.dcenter.x + n / 2;
        let y_hi = self.dcenter.y + n / 2;

        let mut cells = SmallVec::new();
        cells.push(self.dcenter);
        for x in x_lo..=x_hi {
            for y in y_lo..=y_hi {
                let coord = GridCoord::new(x, y);
                if coord != self.dcenter {
                    cells.push(coord);
                }
            }
        }
        cells
    }

    /// Independent cache object for a robot's local perception snapshot
    ///
    /// The clone carries the same member block ids; it does not take
    /// ownership of the blocks themselves.
    pub fn clone_for_perception(&self) -> Cache {
        self.clone()
    }

    // --- usage counters (read by external metrics collectors) ---

    pub fn block_pickups(&self) -> u32 {
        self.block_pickups
    }

    pub fn block_drops(&self) -> u32 {
        self.block_drops
    }

    pub fn penalty_count(&self) -> u64 {
        self.penalty_count
    }

    pub fn record_pickup(&mut self) {
        self.block_pickups += 1;
    }

    pub fn record_drop(&mut self) {
        self.block_drops += 1;
    }

    pub fn record_penalty(&mut self, steps: u64) {
        self.penalty_count += steps;
    }

    /// Interval reset, invoked only by the external metrics aggregator
    pub fn reset_metrics(&mut self) {
        self.block_pickups = 0;
        self.block_drops = 0;
        self.penalty_count = 0;
    }
}

impl Spatial for Cache {
    fn rloc(&self) -> Vec2 {
        self.center
    }

    fn dloc(&self) -> GridCoord {
        self.dcenter
    }

    fn dims(&self) -> Vec2 {
        Vec2::new(self.dimension, self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_at(center: Vec2, blocks: Vec<BlockId>) -> Cache {
        Cache::new(CacheId(0), 0.6, 0.2, center, blocks, 0)
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(5), BlockId(9)]);
        cache.block_add(BlockId(2));

        assert_eq!(cache.n_blocks(), 3);
        assert_eq!(cache.oldest_block(), Some(BlockId(5)));

        // Removing a middle member keeps the rest in order
        assert!(cache.block_remove(BlockId(9)));
        assert_eq!(cache.blocks(), &[BlockId(5), BlockId(2)]);
        assert_eq!(cache.oldest_block(), Some(BlockId(5)));
    }

    #[test]
    fn test_remove_missing_block() {
        let mut cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(1), BlockId(2)]);
        assert!(!cache.block_remove(BlockId(42)));
        assert_eq!(cache.n_blocks(), 2);
    }

    #[test]
    fn test_contains_block() {
        let cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(1), BlockId(2)]);
        assert!(cache.contains_block(BlockId(2)));
        assert!(!cache.contains_block(BlockId(3)));
    }

    #[test]
    fn test_explicit_comparisons() {
        let a = Cache::new(
            CacheId(1),
            0.6,
            0.2,
            Vec2::new(1.0, 1.0),
            vec![BlockId(0), BlockId(1)],
            0,
        );
        let b = Cache::new(
            CacheId(2),
            0.6,
            0.2,
            Vec2::new(1.0, 1.0),
            vec![BlockId(2), BlockId(3)],
            0,
        );
        assert!(!a.idcmp(&b));
        assert!(a.dloccmp(&b));
    }

    #[test]
    fn test_extent_cells_cover_footprint() {
        // 0.6m square at 0.2m resolution -> 3x3 cells centered on the host
        let cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(0), BlockId(1)]);
        let cells = cache.extent_cells();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], cache.host_cell());
        assert!(cells.contains(&GridCoord::new(4, 4)));
        assert!(cells.contains(&GridCoord::new(6, 6)));
    }

    #[test]
    fn test_extent_cells_even_footprint_stays_square() {
        // 0.8m square at 0.2m resolution -> exactly 4x4 cells, not 5x5
        let cache = Cache::new(
            CacheId(0),
            0.8,
            0.2,
            Vec2::new(1.0, 1.0),
            vec![BlockId(0), BlockId(1)],
            0,
        );
        let cells = cache.extent_cells();
        assert_eq!(cells.len(), 16);
        assert_eq!(cells[0], cache.host_cell());
        assert!(cells.contains(&GridCoord::new(4, 4)));
        assert!(cells.contains(&GridCoord::new(7, 7)));
        assert!(!cells.contains(&GridCoord::new(3, 3)));
        assert!(!cells.contains(&GridCoord::new(8, 8)));
    }

    #[test]
    fn test_perception_clone_shares_member_ids() {
        let cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(7), BlockId(8)]);
        let snapshot = cache.clone_for_perception();
        assert!(snapshot.idcmp(&cache));
        assert_eq!(snapshot.blocks(), cache.blocks());
    }

    #[test]
    fn test_metrics_reset() {
        let mut cache = cache_at(Vec2::new(1.0, 1.0), vec![BlockId(0), BlockId(1)]);
        cache.record_pickup();
        cache.record_drop();
        cache.record_drop();
        cache.record_penalty(3);
        assert_eq!(cache.block_pickups(), 1);
        assert_eq!(cache.block_drops(), 2);
        assert_eq!(cache.penalty_count(), 3);

        cache.reset_metrics();
        assert_eq!(cache.block_pickups(), 0);
        assert_eq!(cache.block_drops(), 0);
        assert_eq!(cache.penalty_count(), 0);
    }
}
