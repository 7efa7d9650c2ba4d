//! Arena and block-distribution configuration
//!
//! Parsed by an external layer (XML/ron/whatever the simulation frontend
//! uses); everything here is validated before the arena map is constructed,
//! so the core never sees out-of-range values.

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Which block-distribution strategy the dispatcher should build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistType {
    /// Uniform random placement across the distributable area
    Random,
    /// One cluster occupying the right-hand band of the arena
    SingleSource,
    /// Two symmetric clusters (left/right bands)
    DualSource,
    /// Four symmetric clusters (left/right/bottom/top bands)
    QuadSource,
    /// Randomly placed clusters with power-law sizes
    Powerlaw,
}

/// Discrete grid geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Arena X dimension in meters
    pub x_size: f64,
    /// Arena Y dimension in meters
    pub y_size: f64,
    /// Cell resolution ratio (meters per cell)
    pub resolution: f64,
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.x_size <= 0.0 || self.y_size <= 0.0 {
            return Err("grid dimensions must be positive".to_string());
        }
        if self.resolution <= 0.0 {
            return Err("grid resolution must be positive".to_string());
        }
        if self.x_size < self.resolution || self.y_size < self.resolution {
            return Err("grid dimensions cannot be smaller than one cell".to_string());
        }
        Ok(())
    }

    /// Arena X dimension in cells
    pub fn xdsize(&self) -> usize {
        (self.x_size / self.resolution).round() as usize
    }

    /// Arena Y dimension in cells
    pub fn ydsize(&self) -> usize {
        (self.y_size / self.resolution).round() as usize
    }
}

/// Nest region geometry (real-valued, axis-aligned)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestConfig {
    pub center: Vec2,
    pub dims: Vec2,
}

impl NestConfig {
    pub fn validate(&self, grid: &GridConfig) -> Result<(), String> {
        if self.dims.x <= 0.0 || self.dims.y <= 0.0 {
            return Err("nest dimensions must be positive".to_string());
        }
        if self.center.x < 0.0
            || self.center.y < 0.0
            || self.center.x > grid.x_size
            || self.center.y > grid.y_size
        {
            return Err("nest center lies outside the arena".to_string());
        }
        Ok(())
    }
}

/// Power-law cluster sizing parameters
///
/// Cluster sizes are drawn as powers of two in `[2^pwr_min, 2^pwr_max]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerlawConfig {
    /// Number of clusters to place
    pub n_clusters: usize,
    /// Minimum size exponent
    pub pwr_min: u32,
    /// Maximum size exponent
    pub pwr_max: u32,
}

impl PowerlawConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_clusters == 0 {
            return Err("n_clusters must be at least 1".to_string());
        }
        if self.pwr_min > self.pwr_max {
            return Err("pwr_min cannot exceed pwr_max".to_string());
        }
        Ok(())
    }
}

/// Block distribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDistConfig {
    pub dist_type: DistType,
    /// Max blocks per cluster for the single/dual/quad source strategies;
    /// `None` means unlimited
    pub cluster_capacity: Option<usize>,
    pub powerlaw: PowerlawConfig,
    /// Grid padding subtracted from the usable area so nothing is placed
    /// near simulation-boundary artifacts
    pub grid_padding: f64,
}

impl BlockDistConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_padding < 0.0 {
            return Err("grid_padding cannot be negative".to_string());
        }
        if self.dist_type == DistType::Powerlaw {
            self.powerlaw.validate()?;
        }
        Ok(())
    }
}

/// Top-level arena map configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaMapConfig {
    pub grid: GridConfig,
    pub nest: NestConfig,
    pub block_dist: BlockDistConfig,
    /// Number of blocks to create at scenario initialization
    pub n_blocks: usize,
    /// Block physical dimensions (meters)
    pub block_dims: Vec2,
    /// RNG seed for deterministic distribution
    pub seed: u64,
}

impl ArenaMapConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.grid.validate()?;
        self.nest.validate(&self.grid)?;
        self.block_dist.validate()?;
        if self.n_blocks == 0 {
            return Err("n_blocks must be at least 1".to_string());
        }
        if self.block_dims.x <= 0.0 || self.block_dims.y <= 0.0 {
            return Err("block dimensions must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for ArenaMapConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig {
                x_size: 10.0,
                y_size: 10.0,
                resolution: 0.2,
            },
            nest: NestConfig {
                center: Vec2::new(2.0, 5.0),
                dims: Vec2::new(1.0, 4.0),
            },
            block_dist: BlockDistConfig {
                dist_type: DistType::Random,
                cluster_capacity: None,
                powerlaw: PowerlawConfig {
                    n_clusters: 4,
                    pwr_min: 1,
                    pwr_max: 4,
                },
                grid_padding: 0.0,
            },
            n_blocks: 20,
            block_dims: Vec2::new(0.2, 0.2),
            seed: 0,
        }
    }
}
