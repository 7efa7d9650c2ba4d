//! Bounded 2D cell grid backing the arena
//!
//! Stores one [`Cell`] per discrete location in row-major order. Sub-views
//! are coordinate descriptors, not borrows, so distribution strategies can
//! hold them across calls without pinning the grid.

use crate::arena::cell::{Cell, CellState};
use crate::util::span::GridRange;
use crate::util::vec2::{GridCoord, Vec2};

/// The arena's cell grid
#[derive(Debug, Clone)]
pub struct ArenaGrid {
    xdsize: usize,
    ydsize: usize,
    resolution: f64,
    cells: Vec<Cell>,
}

impl ArenaGrid {
    pub fn new(xdsize: usize, ydsize: usize, resolution: f64) -> Self {
        Self {
            xdsize,
            ydsize,
            resolution,
            cells: vec![Cell::default(); xdsize * ydsize],
        }
    }

    #[inline]
    pub fn xdsize(&self) -> usize {
        self.xdsize
    }

    #[inline]
    pub fn ydsize(&self) -> usize {
        self.ydsize
    }

    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x < self.xdsize && coord.y < self.ydsize
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> usize {
        debug_assert!(self.contains(coord), "coord {coord:?} outside grid");
        coord.y * self.xdsize + coord.x
    }

    #[inline]
    pub fn cell(&self, coord: GridCoord) -> &Cell {
        &self.cells[self.index(coord)]
    }

    #[inline]
    pub fn cell_mut(&mut self, coord: GridCoord) -> &mut Cell {
        let idx = self.index(coord);
        &mut self.cells[idx]
    }

    /// Full-grid view
    pub fn view(&self) -> GridView {
        GridView::new(
            GridRange::new(0, self.xdsize),
            GridRange::new(0, self.ydsize),
        )
    }

    /// Real-valued center of a cell
    pub fn cell_center(&self, coord: GridCoord) -> Vec2 {
        Vec2::new(
            (coord.x as f64 + 0.5) * self.resolution,
            (coord.y as f64 + 0.5) * self.resolution,
        )
    }

    /// Number of empty cells inside a view
    pub fn free_cell_count(&self, view: &GridView) -> usize {
        view.iter_coords()
            .filter(|c| self.cell(*c).state() == CellState::Empty)
            .count()
    }

    /// Read-only local-view extraction for robot perception
    ///
    /// Returns a cloned snapshot of the cells within `radius` cells of
    /// `center`, clipped to the grid boundary.
    pub fn local_view(&self, center: GridCoord, radius: usize) -> LocalView {
        let x_lo = center.x.saturating_sub(radius);
        let y_lo = center.y.saturating_sub(radius);
        let x_hi = (center.x + radius + 1).min(self.xdsize);
        let y_hi = (center.y + radius + 1).min(self.ydsize);

        let mut cells = Vec::with_capacity((x_hi - x_lo) * (y_hi - y_lo));
        for y in y_lo..y_hi {
            for x in x_lo..x_hi {
                cells.push(self.cell(GridCoord::new(x, y)).clone());
            }
        }
        LocalView {
            origin: GridCoord::new(x_lo, y_lo),
            xdsize: x_hi - x_lo,
            ydsize: y_hi - y_lo,
            cells,
        }
    }
}

/// Rectangular grid sub-view, described by half-open cell ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridView {
    x: GridRange,
    y: GridRange,
}

impl GridView {
    pub fn new(x: GridRange, y: GridRange) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn xrange(&self) -> GridRange {
        self.x
    }

    #[inline]
    pub fn yrange(&self) -> GridRange {
        self.y
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.x.len() * self.y.len()
    }

    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.x.contains(coord.x) && self.y.contains(coord.y)
    }

    /// Bounding boxes disjointness test against another view
    pub fn overlaps_with(&self, other: &GridView) -> bool {
        self.x.overlaps_with(&other.x) && self.y.overlaps_with(&other.y)
    }

    /// Row-major iteration over the view's coordinates
    pub fn iter_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        let (x, y) = (self.x, self.y);
        (y.lo()..y.hi())
            .flat_map(move |yy| (x.lo()..x.hi()).map(move |xx| GridCoord::new(xx, yy)))
    }
}

/// Cloned sub-grid snapshot handed to robot perception code
#[derive(Debug, Clone)]
pub struct LocalView {
    origin: GridCoord,
    xdsize: usize,
    ydsize: usize,
    cells: Vec<Cell>,
}

impl LocalView {
    pub fn origin(&self) -> GridCoord {
        self.origin
    }

    pub fn xdsize(&self) -> usize {
        self.xdsize
    }

    pub fn ydsize(&self) -> usize {
        self.ydsize
    }

    /// Cell at an absolute grid coordinate, if inside the snapshot
    pub fn cell(&self, coord: GridCoord) -> Option<&Cell> {
        if coord.x < self.origin.x || coord.y < self.origin.y {
            return None;
        }
        let (dx, dy) = (coord.x - self.origin.x, coord.y - self.origin.y);
        if dx >= self.xdsize || dy >= self.ydsize {
            return None;
        }
        Some(&self.cells[dy * self.xdsize + dx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::block::BlockId;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = ArenaGrid::new(10, 8, 0.5);
        assert_eq!(grid.xdsize(), 10);
        assert_eq!(grid.ydsize(), 8);
        assert_eq!(grid.free_cell_count(&grid.view()), 80);
    }

    #[test]
    fn test_cell_indexing() {
        let mut grid = ArenaGrid::new(4, 4, 1.0);
        grid.cell_mut(GridCoord::new(2, 3)).event_block_drop(BlockId(1));
        assert!(grid.cell(GridCoord::new(2, 3)).has_block());
        assert!(grid.cell(GridCoord::new(3, 2)).is_empty());
    }

    #[test]
    fn test_cell_center() {
        let grid = ArenaGrid::new(10, 10, 0.5);
        assert_eq!(grid.cell_center(GridCoord::new(0, 0)), Vec2::new(0.25, 0.25));
        assert_eq!(grid.cell_center(GridCoord::new(3, 1)), Vec2::new(1.75, 0.75));
    }

    #[test]
    fn test_view_iteration() {
        let view = GridView::new(GridRange::new(1, 3), GridRange::new(2, 4));
        let coords: Vec<_> = view.iter_coords().collect();
        assert_eq!(coords.len(), 4);
        assert!(coords.contains(&GridCoord::new(1, 2)));
        assert!(coords.contains(&GridCoord::new(2, 3)));
        assert!(view.contains(GridCoord::new(2, 2)));
        assert!(!view.contains(GridCoord::new(3, 2)));
    }

    #[test]
    fn test_view_overlap() {
        let a = GridView::new(GridRange::new(0, 4), GridRange::new(0, 4));
        let b = GridView::new(GridRange::new(4, 8), GridRange::new(0, 4));
        let c = GridView::new(GridRange::new(3, 5), GridRange::new(3, 5));
        assert!(!a.overlaps_with(&b));
        assert!(a.overlaps_with(&c));
        assert!(b.overlaps_with(&c));
    }

    #[test]
    fn test_local_view_clipping() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        grid.cell_mut(GridCoord::new(1, 1)).event_block_drop(BlockId(9));

        let los = grid.local_view(GridCoord::new(0, 0), 2);
        assert_eq!(los.origin(), GridCoord::new(0, 0));
        assert_eq!(los.xdsize(), 3);
        assert_eq!(los.ydsize(), 3);
        assert!(los.cell(GridCoord::new(1, 1)).unwrap().has_block());
        assert!(los.cell(GridCoord::new(5, 5)).is_none());
    }

    #[test]
    fn test_local_view_is_a_snapshot() {
        let mut grid = ArenaGrid::new(10, 10, 1.0);
        let los = grid.local_view(GridCoord::new(5, 5), 1);
        grid.cell_mut(GridCoord::new(5, 5)).event_block_drop(BlockId(2));
        // Snapshot does not observe later grid mutation
        assert!(los.cell(GridCoord::new(5, 5)).unwrap().is_empty());
    }
}
