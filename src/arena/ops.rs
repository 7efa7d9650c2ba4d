//! Block drop and pickup operations
//!
//! Externally triggered events (a robot releasing or grabbing a block) enter
//! here with a target coordinate and a session carrying whatever locks the
//! caller already holds. Drop dispatch follows a fixed priority:
//!
//! 1. Cache-occupied cell: the block is inserted into the cell's cache
//!    (resolving extent cells to the host), never converting the cell state.
//! 2. Spatial conflict (occupied cell, nest overlap, cache bounding-box
//!    overlap, or outside the distributable area): the drop is rerouted to
//!    arena-wide single-block redistribution. Conflicts are recovered here,
//!    never surfaced to the caller.
//! 3. Otherwise: direct in-place drop.
//!
//! Each step acquires only the locks the session does not already hold.

use tracing::debug;

use crate::arena::block::{BlockId, RobotId, Spatial};
use crate::arena::cache::CacheId;
use crate::arena::locking::{ArenaSession, LockMask};
use crate::arena::map::ArenaError;
use crate::metrics::ArenaMetrics;
use crate::util::span::Span;
use crate::util::vec2::GridCoord;

/// How a drop request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Placed in-place at the requested coordinate
    Direct,
    /// Inserted into the cache occupying the requested coordinate
    IntoCache(CacheId),
    /// Conflict at the requested coordinate; placed elsewhere by the
    /// arena-wide distributor
    Redistributed,
}

enum Route {
    Cache(CacheId),
    Conflict,
    Direct,
}

/// Drop a carried block at a target cell, dispatching per the priority
/// order above
///
/// Route decision and execution happen under one lock scope, so a
/// concurrent placement cannot invalidate the decision. Helpers invoked for
/// the chosen route re-enter the held domains as no-ops.
pub fn free_block_drop(
    session: &mut ArenaSession<'_>,
    id: BlockId,
    coord: GridCoord,
) -> Result<DropOutcome, ArenaError> {
    let map = session.map();

    session.with(LockMask::ALL, |s| {
        let route = {
            let grid = s.grid();
            // Off-grid targets never touch a cell; reroute before indexing
            if !grid.contains(coord) {
                Route::Conflict
            } else {
                let cell = grid.cell(coord);
                if cell.has_cache() || cell.in_cache_extent() {
                    Route::Cache(
                        cell.cache_id()
                            .expect("cache cells always reference their cache"),
                    )
                } else {
                    let rloc = coord.to_real(grid.resolution());
                    let block = s.blocks().get(id).ok_or(ArenaError::UnknownBlock(id.0))?;
                    let xspan = Span::centered(rloc.x, block.dims().x);
                    let yspan = Span::centered(rloc.y, block.dims().y);
                    let nest = map.nest();

                    let conflict = cell.has_block()
                        || (xspan.overlaps_with(&nest.xspan())
                            && yspan.overlaps_with(&nest.yspan()))
                        || s.caches().iter().any(|c| {
                            xspan.overlaps_with(&c.xspan()) && yspan.overlaps_with(&c.yspan())
                        })
                        || !map.distributable_xspan().contains(rloc.x)
                        || !map.distributable_yspan().contains(rloc.y);
                    if conflict {
                        Route::Conflict
                    } else {
                        Route::Direct
                    }
                }
            }
        };

        match route {
            Route::Cache(cache) => {
                cache_block_drop(s, id, cache)?;
                ArenaMetrics::incr(&map.metrics().drops_into_cache);
                Ok(DropOutcome::IntoCache(cache))
            }
            Route::Conflict => {
                debug!(
                    block = id.0,
                    ?coord,
                    "drop target conflicted, rerouting to redistribution"
                );
                map.distribute_single_block(s, id)?;
                ArenaMetrics::incr(&map.metrics().drops_rerouted);
                Ok(DropOutcome::Redistributed)
            }
            Route::Direct => {
                let (grid, blocks, _) = s.domains_mut();
                let grid = grid.expect("GRID held by with()");
                let blocks = blocks.expect("BLOCKS held by with()");
                let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;

                block.md_mut().robot_id_reset();
                block.set_location(coord.to_real(grid.resolution()), coord);
                grid.cell_mut(coord).event_block_drop(id);
                debug!(block = id.0, ?coord, "direct block drop");
                ArenaMetrics::incr(&map.metrics().drops_direct);
                Ok(DropOutcome::Direct)
            }
        }
    })
}

/// Atomic check-and-insert of a block into a cache
///
/// The block's location becomes the cache center; the host cell's state is
/// untouched.
pub fn cache_block_drop(
    session: &mut ArenaSession<'_>,
    id: BlockId,
    cache: CacheId,
) -> Result<(), ArenaError> {
    session.with(LockMask::CACHES | LockMask::BLOCKS, |s| {
        let (_, blocks, caches) = s.domains_mut();
        let blocks = blocks.expect("BLOCKS held by with()");
        let caches = caches.expect("CACHES held by with()");

        let cache = caches
            .get_mut(cache)
            .ok_or(ArenaError::UnknownCache(cache.0))?;
        let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;
        debug_assert!(
            !cache.contains_block(id),
            "block {} already a member of cache {}",
            id.0,
            cache.id().0
        );

        block.md_mut().robot_id_reset();
        block.set_location(cache.rloc(), cache.host_cell());
        cache.block_add(id);
        cache.record_drop();
        debug!(
            block = id.0,
            cache = cache.id().0,
            n_blocks = cache.n_blocks(),
            "block dropped into cache"
        );
        Ok(())
    })
}

/// Pick up a free block from the grid
///
/// The block's cell empties and the block moves to the out-of-sight sentinel
/// until it is dropped again.
pub fn free_block_pickup(
    session: &mut ArenaSession<'_>,
    id: BlockId,
    robot: RobotId,
    t: u64,
) -> Result<(), ArenaError> {
    session.with(LockMask::BLOCKS | LockMask::GRID, |s| {
        let (grid, blocks, _) = s.domains_mut();
        let grid = grid.expect("GRID held by with()");
        let blocks = blocks.expect("BLOCKS held by with()");
        let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;

        let dloc = block.dloc();
        if grid.contains(dloc) && grid.cell(dloc).block_id() == Some(id) {
            grid.cell_mut(dloc).event_block_pickup();
        }
        block.robot_pickup_event(robot, t);
        debug!(block = id.0, robot = robot.0, "free block pickup");
        Ok::<(), ArenaError>(())
    })?;
    ArenaMetrics::incr(&session.map().metrics().block_pickups);
    Ok(())
}

/// Pick up the oldest block in a cache
///
/// Returns the removed block's id. The caller is responsible for purging the
/// cache if its membership drops below the structural minimum.
pub fn cache_block_pickup(
    session: &mut ArenaSession<'_>,
    cache: CacheId,
    robot: RobotId,
    t: u64,
) -> Result<BlockId, ArenaError> {
    session.with(LockMask::CACHES | LockMask::BLOCKS, |s| {
        let (_, blocks, caches) = s.domains_mut();
        let blocks = blocks.expect("BLOCKS held by with()");
        let caches = caches.expect("CACHES held by with()");

        let cache = caches
            .get_mut(cache)
            .ok_or(ArenaError::UnknownCache(cache.0))?;
        let id = cache
            .oldest_block()
            .ok_or(ArenaError::EmptyCache(cache.id().0))?;
        let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;

        cache.block_remove(id);
        cache.record_pickup();
        block.robot_pickup_event(robot, t);
        debug!(
            block = id.0,
            cache = cache.id().0,
            robot = robot.0,
            n_blocks = cache.n_blocks(),
            "block picked up from cache"
        );
        Ok(id)
    })
}
