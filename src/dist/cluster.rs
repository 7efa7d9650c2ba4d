//! Capacity-bounded cluster distribution
//!
//! A cluster is a rectangular grid sub-view plus a capacity. Membership is
//! not tracked separately: the resident block count is whatever the view's
//! cells currently hold, so blocks picked up out of the region naturally
//! free capacity.

use rand::rngs::SmallRng;
use tracing::debug;

use crate::arena::block::Block;
use crate::arena::grid::{ArenaGrid, GridView};
use crate::dist::random::RandomDistributor;
use crate::dist::{DistributionError, ExistingEntities};

/// Distributes blocks into one bounded region until capacity is reached
#[derive(Debug, Clone)]
pub struct ClusterDistributor {
    random: RandomDistributor,
    capacity: usize,
}

impl ClusterDistributor {
    pub fn new(view: GridView, resolution: f64, capacity: usize) -> Self {
        Self {
            random: RandomDistributor::new(view, resolution),
            capacity,
        }
    }

    pub fn view(&self) -> &GridView {
        self.random.view()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks currently resident in the cluster's region
    pub fn block_count(&self, grid: &ArenaGrid) -> usize {
        self.view()
            .iter_coords()
            .filter(|c| {
                let cell = grid.cell(*c);
                debug_assert!(
                    !cell.has_cache() && !cell.in_cache_extent(),
                    "cache inside a block cluster region at {c:?}"
                );
                cell.has_block()
            })
            .count()
    }

    pub fn is_full(&self, grid: &ArenaGrid) -> bool {
        self.block_count(grid) >= self.capacity
    }

    pub fn distribute_block(
        &self,
        block: &mut Block,
        grid: &mut ArenaGrid,
        entities: &mut ExistingEntities,
        rng: &mut SmallRng,
    ) -> Result<(), DistributionError> {
        if self.is_full(grid) {
            debug!(
                block = block.id().0,
                capacity = self.capacity,
                "cluster at capacity, rejecting block"
            );
            return Err(DistributionError::PlacementExhausted { attempts: 0 });
        }
        self.random.distribute_block(block, grid, entities, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::block::{Block, Block2D, BlockId, Spatial};
    use crate::util::span::GridRange;
    use crate::util::vec2::Vec2;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn block(id: u32) -> Block {
        Block::TwoD(Block2D::new(BlockId(id), Vec2::new(0.2, 0.2)))
    }

    #[test]
    fn test_accepts_until_capacity() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let view = GridView::new(GridRange::new(2, 6), GridRange::new(2, 6));
        let dist = ClusterDistributor::new(view, 1.0, 3);
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(1);

        for i in 0..3 {
            let mut b = block(i);
            dist.distribute_block(&mut b, &mut grid, &mut entities, &mut rng)
                .expect("placement under capacity");
            assert!(view.contains(b.dloc()));
        }
        assert!(dist.is_full(&grid));
        assert_eq!(dist.block_count(&grid), 3);

        let mut overflow = block(3);
        assert!(dist
            .distribute_block(&mut overflow, &mut grid, &mut entities, &mut rng)
            .is_err());
    }

    #[test]
    fn test_pickup_frees_capacity() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let view = GridView::new(GridRange::new(0, 4), GridRange::new(0, 4));
        let dist = ClusterDistributor::new(view, 1.0, 1);
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(2);

        let mut b = block(0);
        dist.distribute_block(&mut b, &mut grid, &mut entities, &mut rng)
            .expect("placement");
        assert!(dist.is_full(&grid));

        // Count scans live cell state: removing the resident block frees
        // the slot
        grid.cell_mut(b.dloc()).event_block_pickup();
        assert!(!dist.is_full(&grid));
        assert_eq!(dist.block_count(&grid), 0);
    }
}
