//! Nest region: the drop-off zone blocks must never be distributed into

use crate::arena::block::Spatial;
use crate::config::NestConfig;
use crate::util::vec2::{GridCoord, Vec2};

/// Axis-aligned nest region
#[derive(Debug, Clone)]
pub struct Nest {
    center: Vec2,
    dims: Vec2,
    resolution: f64,
}

impl Nest {
    pub fn new(config: &NestConfig, resolution: f64) -> Self {
        Self {
            center: config.center,
            dims: config.dims,
            resolution,
        }
    }
}

impl Spatial for Nest {
    fn rloc(&self) -> Vec2 {
        self.center
    }

    fn dloc(&self) -> GridCoord {
        self.center.to_grid(self.resolution)
    }

    fn dims(&self) -> Vec2 {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nest_spans() {
        let nest = Nest::new(
            &NestConfig {
                center: Vec2::new(2.0, 5.0),
                dims: Vec2::new(1.0, 4.0),
            },
            0.2,
        );
        assert!(nest.xspan().contains(1.5));
        assert!(!nest.xspan().contains(2.6));
        assert!(nest.yspan().contains(3.0));
        assert_eq!(nest.dloc(), GridCoord::new(10, 25));
    }
}
