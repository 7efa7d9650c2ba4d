use serde::{Deserialize, Serialize};

/// Real-valued 2D vector for arena-space positions and dimensions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Discretize to a grid coordinate at the given cell resolution
    #[inline]
    pub fn to_grid(&self, resolution: f64) -> GridCoord {
        GridCoord {
            x: (self.x / resolution).floor() as usize,
            y: (self.y / resolution).floor() as usize,
        }
    }
}

/// Discrete grid-cell coordinate
///
/// Related to real-valued positions via the arena's cell resolution ratio:
/// `rloc = dloc * resolution`, `dloc = floor(rloc / resolution)`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: usize,
    pub y: usize,
}

impl GridCoord {
    #[inline]
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Real-valued position of this cell's origin at the given resolution
    #[inline]
    pub fn to_real(&self, resolution: f64) -> Vec2 {
        Vec2 {
            x: self.x as f64 * resolution,
            y: self.y as f64 * resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_round_trip() {
        let coord = GridCoord::new(7, 3);
        let real = coord.to_real(0.5);
        assert_eq!(real, Vec2::new(3.5, 1.5));
        assert_eq!(real.to_grid(0.5), coord);
    }

    #[test]
    fn test_discretize_floors() {
        // Anywhere inside a cell discretizes to that cell's coordinate
        assert_eq!(Vec2::new(1.99, 0.01).to_grid(1.0), GridCoord::new(1, 0));
        assert_eq!(Vec2::new(2.0, 2.0).to_grid(1.0), GridCoord::new(2, 2));
    }
}
