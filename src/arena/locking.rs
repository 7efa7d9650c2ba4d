//! Composable multi-lock protocol for the arena map
//!
//! Three named critical sections guard the structural integrity of the
//! arena's collections: caches, blocks, and the grid. Every externally
//! invokable operation is threaded through an [`ArenaSession`], which records
//! which domains the caller already holds. [`ArenaSession::with`] acquires
//! only the locks not already held, in the fixed order caches -> blocks ->
//! grid, and releases exactly what it acquired in the reverse order grid ->
//! blocks -> caches on every exit path. Re-entering with a domain already
//! held performs zero additional acquire/release actions, so a top-level
//! operation can hold everything once and call helpers that would otherwise
//! lock for themselves, without self-deadlock.

use std::ops::{BitOr, BitOrAssign};

use parking_lot::MutexGuard;

use crate::arena::grid::ArenaGrid;
use crate::arena::map::{ArenaMap, BlockRegistry, CacheRegistry};

/// Bitmask over the arena's lock domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockMask(u8);

impl LockMask {
    pub const NONE: LockMask = LockMask(0);
    pub const BLOCKS: LockMask = LockMask(1 << 0);
    pub const CACHES: LockMask = LockMask(1 << 1);
    pub const GRID: LockMask = LockMask(1 << 2);
    pub const ALL: LockMask = LockMask(1 << 0 | 1 << 1 | 1 << 2);

    #[inline]
    pub fn contains(&self, other: LockMask) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LockMask {
    type Output = LockMask;
    fn bitor(self, rhs: LockMask) -> LockMask {
        LockMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LockMask {
    fn bitor_assign(&mut self, rhs: LockMask) {
        self.0 |= rhs.0;
    }
}

/// A caller's held-lock set plus the guards backing it
///
/// Owns at most one guard per domain; the mask reported by [`held`] is
/// always derived from guard presence, so it cannot drift from reality.
///
/// [`held`]: ArenaSession::held
pub struct ArenaSession<'m> {
    map: &'m ArenaMap,
    // Field order is release order: grid, then blocks, then caches.
    grid: Option<MutexGuard<'m, ArenaGrid>>,
    blocks: Option<MutexGuard<'m, BlockRegistry>>,
    caches: Option<MutexGuard<'m, CacheRegistry>>,
}

impl<'m> ArenaSession<'m> {
    pub(crate) fn new(map: &'m ArenaMap) -> Self {
        Self {
            map,
            grid: None,
            blocks: None,
            caches: None,
        }
    }

    /// Lock domains this session currently holds
    pub fn held(&self) -> LockMask {
        let mut mask = LockMask::NONE;
        if self.blocks.is_some() {
            mask |= LockMask::BLOCKS;
        }
        if self.caches.is_some() {
            mask |= LockMask::CACHES;
        }
        if self.grid.is_some() {
            mask |= LockMask::GRID;
        }
        mask
    }

    pub fn map(&self) -> &'m ArenaMap {
        self.map
    }

    /// Run `f` with at least the `wanted` domains held
    ///
    /// Domains already held cost nothing; missing ones are acquired in the
    /// fixed caches -> blocks -> grid order and released (grid -> blocks ->
    /// caches) when `f` returns, whatever path it returns by.
    pub fn with<R>(&mut self, wanted: LockMask, f: impl FnOnce(&mut ArenaSession<'m>) -> R) -> R {
        let entry_held = self.held();
        let mut acquired = LockMask::NONE;

        if wanted.contains(LockMask::CACHES) && self.caches.is_none() {
            self.caches = Some(self.map.lock_caches());
            acquired |= LockMask::CACHES;
        }
        if wanted.contains(LockMask::BLOCKS) && self.blocks.is_none() {
            self.blocks = Some(self.map.lock_blocks());
            acquired |= LockMask::BLOCKS;
        }
        if wanted.contains(LockMask::GRID) && self.grid.is_none() {
            self.grid = Some(self.map.lock_grid());
            acquired |= LockMask::GRID;
        }

        let out = f(self);

        if acquired.contains(LockMask::GRID) {
            self.grid = None;
        }
        if acquired.contains(LockMask::BLOCKS) {
            self.blocks = None;
        }
        if acquired.contains(LockMask::CACHES) {
            self.caches = None;
        }
        debug_assert_eq!(self.held(), entry_held, "session lock imbalance");
        out
    }

    /// Grid domain; caller must hold GRID
    pub fn grid(&self) -> &ArenaGrid {
        self.grid
            .as_deref()
            .expect("GRID domain accessed without holding its lock")
    }

    pub fn grid_mut(&mut self) -> &mut ArenaGrid {
        self.grid
            .as_deref_mut()
            .expect("GRID domain accessed without holding its lock")
    }

    /// Block registry; caller must hold BLOCKS
    pub fn blocks(&self) -> &BlockRegistry {
        self.blocks
            .as_deref()
            .expect("BLOCKS domain accessed without holding its lock")
    }

    pub fn blocks_mut(&mut self) -> &mut BlockRegistry {
        self.blocks
            .as_deref_mut()
            .expect("BLOCKS domain accessed without holding its lock")
    }

    /// Cache registry; caller must hold CACHES
    pub fn caches(&self) -> &CacheRegistry {
        self.caches
            .as_deref()
            .expect("CACHES domain accessed without holding its lock")
    }

    pub fn caches_mut(&mut self) -> &mut CacheRegistry {
        self.caches
            .as_deref_mut()
            .expect("CACHES domain accessed without holding its lock")
    }

    /// Simultaneous mutable access to every held domain
    ///
    /// For operations that mutate across domains in one structural step
    /// (e.g. writing a block's location while transitioning its cell).
    /// Unheld domains come back as `None`.
    pub fn domains_mut(
        &mut self,
    ) -> (
        Option<&mut ArenaGrid>,
        Option<&mut BlockRegistry>,
        Option<&mut CacheRegistry>,
    ) {
        (
            self.grid.as_deref_mut(),
            self.blocks.as_deref_mut(),
            self.caches.as_deref_mut(),
        )
    }
}
