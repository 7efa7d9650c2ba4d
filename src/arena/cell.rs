//! Grid cell occupancy state machine
//!
//! One cell per discrete grid location. Cells are never destroyed; only
//! their occupancy state transitions. A cache covers one host cell
//! (`HasCache`) plus zero or more extent cells (`CacheExtent`) that all
//! reference the same cache id.

use crate::arena::block::BlockId;
use crate::arena::cache::CacheId;

/// Discriminated occupancy state for a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    HasBlock,
    HasCache,
    CacheExtent,
}

/// Which entity occupies a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEntity {
    Block(BlockId),
    Cache(CacheId),
}

/// One grid location: occupancy state plus an optional entity reference
#[derive(Debug, Clone)]
pub struct Cell {
    state: CellState,
    entity: Option<CellEntity>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            state: CellState::Empty,
            entity: None,
        }
    }
}

impl Cell {
    #[inline]
    pub fn state(&self) -> CellState {
        self.state
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state == CellState::Empty
    }

    #[inline]
    pub fn has_block(&self) -> bool {
        self.state == CellState::HasBlock
    }

    #[inline]
    pub fn has_cache(&self) -> bool {
        self.state == CellState::HasCache
    }

    #[inline]
    pub fn in_cache_extent(&self) -> bool {
        self.state == CellState::CacheExtent
    }

    /// Block occupying this cell, if any
    pub fn block_id(&self) -> Option<BlockId> {
        match self.entity {
            Some(CellEntity::Block(id)) => Some(id),
            _ => None,
        }
    }

    /// Cache this cell hosts or extends, if any
    pub fn cache_id(&self) -> Option<CacheId> {
        match self.entity {
            Some(CellEntity::Cache(id)) => Some(id),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<CellEntity> {
        self.entity
    }

    /// A block has been dropped here
    pub fn event_block_drop(&mut self, id: BlockId) {
        debug_assert!(
            self.state == CellState::Empty,
            "block drop on non-empty cell ({:?})",
            self.state
        );
        self.state = CellState::HasBlock;
        self.entity = Some(CellEntity::Block(id));
    }

    /// The resident block has been picked up
    pub fn event_block_pickup(&mut self) {
        debug_assert!(
            self.state == CellState::HasBlock,
            "block pickup on cell without block ({:?})",
            self.state
        );
        self.event_empty();
    }

    /// Unconditional reset to the empty state
    pub fn event_empty(&mut self) {
        self.state = CellState::Empty;
        self.entity = None;
    }

    /// This cell is now the host cell of a cache
    pub fn event_cache_created(&mut self, id: CacheId) {
        self.state = CellState::HasCache;
        self.entity = Some(CellEntity::Cache(id));
    }

    /// This cell is now geometrically covered by a cache's footprint
    pub fn event_cache_extent(&mut self, id: CacheId) {
        debug_assert!(
            self.state == CellState::Empty,
            "cache extent over occupied cell ({:?})",
            self.state
        );
        self.state = CellState::CacheExtent;
        self.entity = Some(CellEntity::Cache(id));
    }

    /// The cache covering this cell has been destroyed by its owner
    pub fn event_cache_removed(&mut self) {
        debug_assert!(
            self.state == CellState::HasCache || self.state == CellState::CacheExtent,
            "cache removal on cell without cache ({:?})",
            self.state
        );
        self.event_empty();
    }
}
