//! Uniform random placement within a grid sub-view

use rand::rngs::SmallRng;
use rand::Rng;
use tracing::{debug, trace};

use crate::arena::block::{Block, Spatial};
use crate::arena::grid::{ArenaGrid, GridView};
use crate::dist::{DistributionError, ExistingEntities, MAX_DIST_TRIES};
use crate::util::span::Span;
use crate::util::vec2::GridCoord;

/// Places blocks uniformly at random among the free cells of one sub-view
#[derive(Debug, Clone)]
pub struct RandomDistributor {
    view: GridView,
    resolution: f64,
}

impl RandomDistributor {
    pub fn new(view: GridView, resolution: f64) -> Self {
        Self { view, resolution }
    }

    pub fn view(&self) -> &GridView {
        &self.view
    }

    /// Try up to [`MAX_DIST_TRIES`] uniformly random cells inside the view
    pub fn distribute_block(
        &self,
        block: &mut Block,
        grid: &mut ArenaGrid,
        entities: &mut ExistingEntities,
        rng: &mut SmallRng,
    ) -> Result<(), DistributionError> {
        let xr = self.view.xrange();
        let yr = self.view.yrange();
        debug_assert!(!xr.is_empty() && !yr.is_empty(), "empty distribution view");

        for attempt in 0..MAX_DIST_TRIES {
            let coord = GridCoord::new(
                rng.gen_range(xr.lo()..xr.hi()),
                rng.gen_range(yr.lo()..yr.hi()),
            );
            if !grid.cell(coord).is_empty() {
                trace!(?coord, attempt, "cell occupied, retrying");
                continue;
            }

            let rloc = coord.to_real(self.resolution);
            let xspan = Span::centered(rloc.x, block.dims().x);
            let yspan = Span::centered(rloc.y, block.dims().y);
            if entities.any_overlap(&xspan, &yspan) {
                trace!(?coord, attempt, "entity overlap, retrying");
                continue;
            }

            block.set_location(rloc, coord);
            grid.cell_mut(coord).event_block_drop(block.id());
            entities.add_spans(xspan, yspan);
            debug!(block = block.id().0, ?coord, attempt, "block distributed");
            return Ok(());
        }

        Err(DistributionError::PlacementExhausted {
            attempts: MAX_DIST_TRIES,
        })
    }
}
