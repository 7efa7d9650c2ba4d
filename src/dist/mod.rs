//! Block distribution strategies
//!
//! Common contract: `distribute_block` places a single block onto a free,
//! conflict-free grid region and registers it in the caller's entity
//! registry for later overlap checks; `distribute_blocks` applies this to a
//! whole collection and fails overall on the first failed placement. All
//! strategies draw from a caller-supplied seeded RNG, never a process-global
//! one.

pub mod cluster;
pub mod dispatcher;
pub mod multi_cluster;
pub mod powerlaw;
pub mod random;

use rand::rngs::SmallRng;
use tracing::error;

use crate::arena::block::{Block, Spatial};
use crate::arena::grid::ArenaGrid;
use crate::util::span::Span;

pub use cluster::ClusterDistributor;
pub use dispatcher::dispatch;
pub use multi_cluster::MultiClusterDistributor;
pub use powerlaw::PowerlawDistributor;
pub use random::RandomDistributor;

/// How many placement attempts before a strategy gives up
///
/// Exhausting this is fatal to the caller: no valid arena state exists, so
/// there is nothing left to retry.
pub const MAX_DIST_TRIES: usize = 1000;

/// Distribution failure surfaced to the caller
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("block placement failed after {attempts} attempts")]
    PlacementExhausted { attempts: usize },
    #[error("unable to place {n_clusters} clusters without overlap after {attempts} attempts")]
    ClusterPlacementExhausted { n_clusters: usize, attempts: usize },
}

/// Read-only registry of already-placed entity bounding spans
///
/// Distribution must avoid overlapping anything already in the arena
/// (blocks, caches, the nest); each successful placement registers the new
/// block here so later placements see it.
#[derive(Debug, Default, Clone)]
pub struct ExistingEntities {
    spans: Vec<(Span, Span)>,
}

impl ExistingEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: &dyn Spatial) {
        self.spans.push((entity.xspan(), entity.yspan()));
    }

    pub fn add_spans(&mut self, xspan: Span, yspan: Span) {
        self.spans.push((xspan, yspan));
    }

    /// Whether the proposed bounding box overlaps any registered entity
    pub fn any_overlap(&self, xspan: &Span, yspan: &Span) -> bool {
        self.spans
            .iter()
            .any(|(ex, ey)| ex.overlaps_with(xspan) && ey.overlaps_with(yspan))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// One configured distribution strategy
///
/// A tagged union rather than a trait object: the strategy set is closed and
/// every dispatch site matches exhaustively.
#[derive(Debug)]
pub enum Distributor {
    Random(RandomDistributor),
    Cluster(ClusterDistributor),
    MultiCluster(MultiClusterDistributor),
    Powerlaw(PowerlawDistributor),
}

impl Distributor {
    /// Place one block onto the grid
    ///
    /// On success the block's location fields and the target cell have been
    /// updated and the block is registered in `entities`. On failure nothing
    /// has been committed for this block.
    pub fn distribute_block(
        &self,
        block: &mut Block,
        grid: &mut ArenaGrid,
        entities: &mut ExistingEntities,
        rng: &mut SmallRng,
    ) -> Result<(), DistributionError> {
        match self {
            Distributor::Random(d) => d.distribute_block(block, grid, entities, rng),
            Distributor::Cluster(d) => d.distribute_block(block, grid, entities, rng),
            Distributor::MultiCluster(d) => d.distribute_block(block, grid, entities, rng),
            Distributor::Powerlaw(d) => d.distribute_block(block, grid, entities, rng),
        }
    }

    /// Place every block in the collection; fails overall on the first
    /// failed placement
    pub fn distribute_blocks(
        &self,
        blocks: &mut [Block],
        grid: &mut ArenaGrid,
        entities: &mut ExistingEntities,
        rng: &mut SmallRng,
    ) -> Result<(), DistributionError> {
        for block in blocks.iter_mut() {
            self.distribute_block(block, grid, entities, rng).map_err(|e| {
                error!(block = block.id().0, "block distribution failed: {e}");
                e
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::block::{Block2D, BlockId};
    use crate::util::span::Span;
    use crate::util::vec2::Vec2;
    use rand::SeedableRng;

    #[test]
    fn test_distribute_blocks_places_whole_collection() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let dist = Distributor::Random(RandomDistributor::new(grid.view(), 1.0));
        let mut blocks: Vec<Block> = (0..6)
            .map(|i| Block::TwoD(Block2D::new(BlockId(i), Vec2::new(0.2, 0.2))))
            .collect();
        let mut entities = ExistingEntities::new();
        let mut rng = SmallRng::seed_from_u64(23);

        dist.distribute_blocks(&mut blocks, &mut grid, &mut entities, &mut rng)
            .expect("collection placement");
        for block in &blocks {
            assert_eq!(grid.cell(block.dloc()).block_id(), Some(block.id()));
        }
        assert_eq!(entities.len(), 6);
    }

    #[test]
    fn test_entity_registry_overlap() {
        let mut entities = ExistingEntities::new();
        assert!(entities.is_empty());
        entities.add_spans(Span::new(0.0, 1.0), Span::new(0.0, 1.0));

        assert!(entities.any_overlap(&Span::new(0.5, 1.5), &Span::new(0.5, 1.5)));
        // Overlap on one axis only is not a conflict
        assert!(!entities.any_overlap(&Span::new(0.5, 1.5), &Span::new(2.0, 3.0)));
        assert!(!entities.any_overlap(&Span::new(2.0, 3.0), &Span::new(2.0, 3.0)));
        assert_eq!(entities.len(), 1);
    }
}
