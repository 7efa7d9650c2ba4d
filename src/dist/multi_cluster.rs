//! Multi-cluster distribution across disjoint sub-views
//!
//! Owns one independent cluster distributor per sub-view; placement picks a
//! sub-view uniformly at random and retries with a fresh choice when the
//! chosen cluster is at capacity. Used for symmetric dual-/quad-source
//! configurations.

use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use crate::arena::block::Block;
use crate::arena::grid::ArenaGrid;
use crate::dist::cluster::ClusterDistributor;
use crate::dist::{DistributionError, ExistingEntities, MAX_DIST_TRIES};

#[derive(Debug)]
pub struct MultiClusterDistributor {
    dists: Vec<ClusterDistributor>,
}

impl MultiClusterDistributor {
    pub fn new(dists: Vec<ClusterDistributor>) -> Self {
        debug_assert!(!dists.is_empty(), "multi-cluster with zero sub-views");
        Self { dists }
    }

    pub fn clusters(&self) -> &[ClusterDistributor] {
        &self.dists
    }

    pub fn distribute_block(
        &self,
        block: &mut Block,
        grid: &mut ArenaGrid,
        entities: &mut ExistingEntities,
        rng: &mut SmallRng,
    ) -> Result<(), DistributionError> {
        for attempt in 0..MAX_DIST_TRIES {
            let idx = rng.gen_range(0..self.dists.len());
            let dist = &self.dists[idx];

            if dist.is_full(grid) {
                debug!(
                    block = block.id().0,
                    cluster = idx,
                    capacity = dist.capacity(),
                    attempt,
                    "cluster at capacity, re-rolling sub-view"
                );
                continue;
            }
            debug!(
                block = block.id().0,
                cluster = idx,
                count = dist.block_count(grid),
                "placing into sub-view"
            );
            return dist.distribute_block(block, grid, entities, rng);
        }
        Err(DistributionError::PlacementExhausted {
            attempts: MAX_DIST_TRIES,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::block::{Block, Block2D, BlockId, Spatial};
    use crate::arena::grid::GridView;
    use crate::util::span::GridRange;
    use crate::util::vec2::Vec2;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn block(id: u32) -> Block {
        Block::TwoD(Block2D::new(BlockId(id), Vec2::new(0.2, 0.2)))
    }

    fn two_bands() -> (GridView, GridView) {
        (
            GridView::new(GridRange::new(0, 4), GridRange::new(0, 10)),
            GridView::new(GridRange::new(6, 10), GridRange::new(0, 10)),
        )
    }

    #[test]
    fn test_places_across_subviews() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let (left, right) = two_bands();
        let dist = MultiClusterDistributor::new(vec![
            ClusterDistributor::new(left, 1.0, usize::MAX),
            ClusterDistributor::new(right, 1.0, usize::MAX),
        ]);
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(11);

        let mut seen_left = false;
        let mut seen_right = false;
        for i in 0..20 {
            let mut b = block(i);
            dist.distribute_block(&mut b, &mut grid, &mut entities, &mut rng)
                .expect("placement");
            seen_left |= left.contains(b.dloc());
            seen_right |= right.contains(b.dloc());
            assert!(left.contains(b.dloc()) || right.contains(b.dloc()));
        }
        // With 20 seeded draws both bands get used
        assert!(seen_left && seen_right);
    }

    #[test]
    fn test_retries_into_open_subview() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let (left, right) = two_bands();
        // Left band can hold a single block; everything else must land right
        let dist = MultiClusterDistributor::new(vec![
            ClusterDistributor::new(left, 1.0, 1),
            ClusterDistributor::new(right, 1.0, usize::MAX),
        ]);
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(5);

        let mut in_right = 0;
        for i in 0..10 {
            let mut b = block(i);
            dist.distribute_block(&mut b, &mut grid, &mut entities, &mut rng)
                .expect("placement");
            if right.contains(b.dloc()) {
                in_right += 1;
            }
        }
        assert!(in_right >= 9);
    }

    #[test]
    fn test_all_full_fails_deterministically() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let (left, right) = two_bands();
        let dist = MultiClusterDistributor::new(vec![
            ClusterDistributor::new(left, 1.0, 0),
            ClusterDistributor::new(right, 1.0, 0),
        ]);
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(9);

        let mut b = block(0);
        let err = dist
            .distribute_block(&mut b, &mut grid, &mut entities, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            DistributionError::PlacementExhausted {
                attempts: MAX_DIST_TRIES
            }
        ));
    }
}
