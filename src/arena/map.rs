//! The arena map: owner of the grid, block, and cache collections
//!
//! Each collection sits behind its own mutex so unrelated structural
//! mutations (a cache list edit, a free-block insertion elsewhere on the
//! grid) proceed without contention. All access from operation code goes
//! through an [`ArenaSession`], which enforces the fixed acquisition order.
//!
//! The map owns invariant enforcement for caches: a cache that falls below
//! [`Cache::MIN_BLOCKS`] members is destroyed here via [`purge_invalid`],
//! never by the cache itself.
//!
//! [`purge_invalid`]: ArenaMap::purge_invalid

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::arena::block::{Block, Block2D, BlockId, IdAllocator, Spatial};
use crate::arena::cache::{Cache, CacheId};
use crate::arena::cell::CellState;
use crate::arena::grid::{ArenaGrid, LocalView};
use crate::arena::locking::{ArenaSession, LockMask};
use crate::arena::nest::Nest;
use crate::config::ArenaMapConfig;
use crate::dist::{dispatcher, DistributionError, Distributor, ExistingEntities};
use crate::metrics::ArenaMetrics;
use crate::util::span::Span;
use crate::util::vec2::{GridCoord, Vec2};

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error("cache requires at least {min} blocks, got {got}")]
    CacheTooSmall { min: usize, got: usize },

    #[error("no block with id {0}")]
    UnknownBlock(u32),

    #[error("no cache with id {0}")]
    UnknownCache(u32),

    #[error("cache {0} has no blocks to pick up")]
    EmptyCache(u32),
}

/// All blocks in the arena, keyed by id
#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocks: HashMap<BlockId, Block>,
    allocator: IdAllocator,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new planar block; its location is unset until distributed
    pub fn create(&mut self, dims: Vec2) -> BlockId {
        let id = BlockId(self.allocator.allocate());
        self.blocks.insert(id, Block::TwoD(Block2D::new(id, dims)));
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// All live caches in the arena, keyed by id
#[derive(Debug, Default)]
pub struct CacheRegistry {
    caches: HashMap<CacheId, Cache>,
    allocator: IdAllocator,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&mut self) -> CacheId {
        CacheId(self.allocator.allocate())
    }

    pub(crate) fn insert(&mut self, cache: Cache) {
        self.caches.insert(cache.id(), cache);
    }

    pub fn get(&self, id: CacheId) -> Option<&Cache> {
        self.caches.get(&id)
    }

    pub fn get_mut(&mut self, id: CacheId) -> Option<&mut Cache> {
        self.caches.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: CacheId) -> Option<Cache> {
        self.caches.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cache> {
        self.caches.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cache> {
        self.caches.values_mut()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

/// Concurrent spatial state for one foraging arena
pub struct ArenaMap {
    grid: Mutex<ArenaGrid>,
    blocks: Mutex<BlockRegistry>,
    caches: Mutex<CacheRegistry>,
    nest: Nest,
    distributor: Distributor,
    rng: Mutex<SmallRng>,
    /// Real-valued ranges blocks may legally occupy
    distributable_x: Span,
    distributable_y: Span,
    lock_acquisitions: AtomicU64,
    metrics: ArenaMetrics,
}

impl ArenaMap {
    /// Build the arena: grid, nest, distributor, and the initial block
    /// population, fully distributed
    ///
    /// Construction is single-threaded; the mutexes exist for the simulation
    /// phase that follows.
    pub fn new(config: &ArenaMapConfig) -> Result<Self, ArenaError> {
        config.validate().map_err(ArenaError::Config)?;

        let resolution = config.grid.resolution;
        let mut grid = ArenaGrid::new(config.grid.xdsize(), config.grid.ydsize(), resolution);
        let nest = Nest::new(&config.nest, resolution);
        let mut rng = SmallRng::seed_from_u64(config.seed);

        let distributor = dispatcher::dispatch(&grid, &config.block_dist, &mut rng)?;

        let mut blocks = BlockRegistry::new();
        let ids: Vec<BlockId> = (0..config.n_blocks)
            .map(|_| blocks.create(config.block_dims))
            .collect();

        let metrics = ArenaMetrics::new();
        let mut entities = ExistingEntities::new();
        entities.add(&nest);
        // Distribute in allocation order; registry iteration order is not
        // stable across constructions, which would break seeded determinism
        for id in ids {
            let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;
            distributor.distribute_block(block, &mut grid, &mut entities, &mut rng)?;
            ArenaMetrics::incr(&metrics.blocks_distributed);
        }
        info!(
            n_blocks = config.n_blocks,
            dist_type = ?config.block_dist.dist_type,
            "arena map initialized"
        );

        let xr = dispatcher::usable_range(grid.xdsize(), config.block_dist.grid_padding);
        let yr = dispatcher::usable_range(grid.ydsize(), config.block_dist.grid_padding);
        Ok(Self {
            grid: Mutex::new(grid),
            blocks: Mutex::new(blocks),
            caches: Mutex::new(CacheRegistry::new()),
            nest,
            distributor,
            rng: Mutex::new(rng),
            distributable_x: Span::new(xr.lo() as f64 * resolution, xr.hi() as f64 * resolution),
            distributable_y: Span::new(yr.lo() as f64 * resolution, yr.hi() as f64 * resolution),
            lock_acquisitions: AtomicU64::new(0),
            metrics,
        })
    }

    /// Start a session holding no locks
    pub fn session(&self) -> ArenaSession<'_> {
        ArenaSession::new(self)
    }

    pub fn nest(&self) -> &Nest {
        &self.nest
    }

    /// Whole-arena counters, read by external metrics collectors
    pub fn metrics(&self) -> &ArenaMetrics {
        &self.metrics
    }

    /// X range blocks may legally occupy (real-valued)
    pub fn distributable_xspan(&self) -> Span {
        self.distributable_x
    }

    /// Y range blocks may legally occupy (real-valued)
    pub fn distributable_yspan(&self) -> Span {
        self.distributable_y
    }

    // --- lock domain acquisition (session plumbing) ---

    pub(crate) fn lock_grid(&self) -> MutexGuard<'_, ArenaGrid> {
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
        self.grid.lock()
    }

    pub(crate) fn lock_blocks(&self) -> MutexGuard<'_, BlockRegistry> {
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
        self.blocks.lock()
    }

    pub(crate) fn lock_caches(&self) -> MutexGuard<'_, CacheRegistry> {
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
        self.caches.lock()
    }

    /// Total lock acquisition count across all domains
    pub fn lock_acquisitions(&self) -> u64 {
        self.lock_acquisitions.load(Ordering::Relaxed)
    }

    /// Redistribution body shared by [`distribute_single_block`] and cache
    /// creation; the caller already holds every domain it passes in
    ///
    /// [`distribute_single_block`]: ArenaMap::distribute_single_block
    fn redistribute_locked(
        &self,
        grid: &mut ArenaGrid,
        blocks: &mut BlockRegistry,
        caches: &CacheRegistry,
        pending_cache: Option<&Cache>,
        id: BlockId,
    ) -> Result<(), ArenaError> {
        // A block being relocated off the grid must release its old cell
        let old = blocks.get(id).ok_or(ArenaError::UnknownBlock(id.0))?.dloc();
        if grid.contains(old) && grid.cell(old).block_id() == Some(id) {
            grid.cell_mut(old).event_block_pickup();
        }

        let mut entities = ExistingEntities::new();
        entities.add(&self.nest);
        let mut others: Vec<&Block> = blocks
            .iter()
            .filter(|b| b.id() != id && !b.is_carried() && !b.is_out_of_sight())
            .collect();
        others.sort_by_key(|b| b.id().0);
        for other in others {
            entities.add(other);
        }
        let mut existing: Vec<&Cache> = caches.iter().collect();
        existing.sort_by_key(|c| c.id().0);
        for cache in existing {
            entities.add(cache);
        }
        if let Some(cache) = pending_cache {
            entities.add(cache);
        }

        let block = blocks.get_mut(id).ok_or(ArenaError::UnknownBlock(id.0))?;
        block.md_mut().robot_id_reset();
        let mut rng = self.rng.lock();
        match self
            .distributor
            .distribute_block(block, grid, &mut entities, &mut rng)
        {
            Ok(()) => {
                ArenaMetrics::incr(&self.metrics.blocks_distributed);
                Ok(())
            }
            Err(e) => {
                ArenaMetrics::incr(&self.metrics.distribution_failures);
                Err(e.into())
            }
        }
    }

    /// Redistribute a single block to a fresh conflict-free location
    ///
    /// Used by drop operations that hit a spatial conflict. Runs under all
    /// three domains; placement attempts are bounded, so lock hold time is
    /// too.
    pub fn distribute_single_block(
        &self,
        session: &mut ArenaSession<'_>,
        id: BlockId,
    ) -> Result<(), ArenaError> {
        session.with(LockMask::ALL, |s| {
            let (grid, blocks, caches) = s.domains_mut();
            let grid = grid.expect("GRID held by with()");
            let blocks = blocks.expect("BLOCKS held by with()");
            let caches = caches.expect("CACHES held by with()");
            self.redistribute_locked(grid, blocks, caches, None, id)
        })
    }

    /// Create a cache from co-located free blocks
    ///
    /// The member blocks leave the free state: their grid cells are cleared
    /// and their locations rewritten to the cache center. Fails if fewer
    /// than [`Cache::MIN_BLOCKS`] members are supplied.
    pub fn create_cache(
        &self,
        session: &mut ArenaSession<'_>,
        center: Vec2,
        dimension: f64,
        members: Vec<BlockId>,
        t: u64,
    ) -> Result<CacheId, ArenaError> {
        if members.len() < Cache::MIN_BLOCKS {
            return Err(ArenaError::CacheTooSmall {
                min: Cache::MIN_BLOCKS,
                got: members.len(),
            });
        }
        session.with(LockMask::ALL, |s| {
            let (grid, blocks, caches) = s.domains_mut();
            let grid = grid.expect("GRID held by with()");
            let blocks = blocks.expect("BLOCKS held by with()");
            let caches = caches.expect("CACHES held by with()");
            let resolution = grid.resolution();

            for id in &members {
                let block = blocks.get_mut(*id).ok_or(ArenaError::UnknownBlock(id.0))?;
                let dloc = block.dloc();
                if grid.contains(dloc) && grid.cell(dloc).block_id() == Some(*id) {
                    grid.cell_mut(dloc).event_block_pickup();
                }
                block.set_location(center, center.to_grid(resolution));
            }

            let id = caches.allocate_id();
            let cache = Cache::new(id, dimension, resolution, center, members, t);
            let extents = cache.extent_cells();

            // Free blocks already sitting under the new footprint get moved
            // out of the way before the cells transition
            let squatters: Vec<BlockId> = extents
                .iter()
                .filter(|c| grid.contains(**c))
                .filter_map(|c| grid.cell(*c).block_id())
                .collect();
            for squatter in squatters {
                let dloc = blocks
                    .get(squatter)
                    .ok_or(ArenaError::UnknownBlock(squatter.0))?
                    .dloc();
                grid.cell_mut(dloc).event_block_pickup();
                self.redistribute_locked(grid, blocks, caches, Some(&cache), squatter)?;
            }

            for (i, coord) in extents.into_iter().enumerate() {
                if !grid.contains(coord) {
                    continue;
                }
                if i == 0 {
                    grid.cell_mut(coord).event_cache_created(id);
                } else {
                    grid.cell_mut(coord).event_cache_extent(id);
                }
            }
            info!(cache = id.0, n_blocks = cache.n_blocks(), "cache created");
            caches.insert(cache);
            Ok(id)
        })
    }

    /// Destroy every cache whose membership fell below [`Cache::MIN_BLOCKS`]
    ///
    /// Owner-side invariant enforcement: caches never self-destruct. Returns
    /// the ids of the caches destroyed.
    pub fn purge_invalid(&self, session: &mut ArenaSession<'_>) -> Vec<CacheId> {
        session.with(LockMask::CACHES | LockMask::GRID, |s| {
            let (grid, _, caches) = s.domains_mut();
            let grid = grid.expect("GRID held by with()");
            let caches = caches.expect("CACHES held by with()");

            let invalid: Vec<CacheId> = caches
                .iter()
                .filter(|c| c.n_blocks() < Cache::MIN_BLOCKS)
                .map(|c| c.id())
                .collect();
            for id in &invalid {
                if let Some(cache) = caches.remove(*id) {
                    warn!(
                        cache = id.0,
                        n_blocks = cache.n_blocks(),
                        "cache below minimum membership, destroying"
                    );
                    for coord in cache.extent_cells() {
                        if grid.contains(coord) && grid.cell(coord).cache_id() == Some(*id) {
                            grid.cell_mut(coord).event_cache_removed();
                        }
                    }
                    ArenaMetrics::incr(&self.metrics.caches_purged);
                }
            }
            invalid
        })
    }

    // --- robot-facing queries (read-only at this boundary) ---

    pub fn cell_state(&self, coord: GridCoord) -> CellState {
        self.lock_grid().cell(coord).state()
    }

    /// Cloned local-view snapshot for robot perception
    pub fn local_view(&self, center: GridCoord, radius: usize) -> LocalView {
        self.lock_grid().local_view(center, radius)
    }

    pub fn cache_block_count(&self, id: CacheId) -> Option<usize> {
        self.lock_caches().get(id).map(Cache::n_blocks)
    }

    pub fn cache_contains_block(&self, id: CacheId, block: BlockId) -> Option<bool> {
        self.lock_caches().get(id).map(|c| c.contains_block(block))
    }

    /// Independent cache snapshot for robot perception
    pub fn cache_for_perception(&self, id: CacheId) -> Option<Cache> {
        self.lock_caches().get(id).map(Cache::clone_for_perception)
    }

    pub fn n_blocks(&self) -> usize {
        self.lock_blocks().len()
    }

    pub fn n_caches(&self) -> usize {
        self.lock_caches().len()
    }

    // --- metrics surface (read by external collectors) ---

    /// Per-cache (pickups, drops, penalty) counters
    pub fn cache_metrics(&self, id: CacheId) -> Option<(u32, u32, u64)> {
        self.lock_caches()
            .get(id)
            .map(|c| (c.block_pickups(), c.block_drops(), c.penalty_count()))
    }

    /// Interval reset, invoked only by the external metrics aggregator
    pub fn reset_cache_metrics(&self) {
        for cache in self.lock_caches().iter_mut() {
            cache.reset_metrics();
        }
    }
}
