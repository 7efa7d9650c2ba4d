//! Strategy selection for initial block distribution
//!
//! Builds exactly one [`Distributor`] from the configured distribution type.
//! Source-based strategies get deterministic axis-aligned partitions of the
//! arena: the usable range on each axis is `[15%, 85%]` of the padding-
//! adjusted dimension, keeping distributed content away from simulation
//! boundary artifacts. Dual-source bisects the usable range along X;
//! quad-source adds the same bisection along Y.

use rand::rngs::SmallRng;
use tracing::info;

use crate::arena::grid::{ArenaGrid, GridView};
use crate::config::{BlockDistConfig, DistType};
use crate::dist::{
    ClusterDistributor, DistributionError, Distributor, MultiClusterDistributor,
    PowerlawDistributor, RandomDistributor,
};
use crate::util::span::GridRange;

/// Usable `[lo, hi]` bounds for one axis under the 15%/85% padding rule
///
/// Kept real-valued: band fractions are computed on these and truncated
/// last, so fractional bounds do not compound into off-by-cells errors.
pub(crate) fn usable_bounds(dsize: usize, padding: f64) -> (f64, f64) {
    (
        dsize as f64 * 0.15,
        (dsize as f64 - padding * 2.0) * 0.85,
    )
}

/// Usable `[lo, hi)` cell range for one axis under the 15%/85% padding rule
pub(crate) fn usable_range(dsize: usize, padding: f64) -> GridRange {
    let (lo, hi) = usable_bounds(dsize, padding);
    GridRange::new(lo as usize, hi as usize)
}

/// Construct and initialize the distributor selected by `config`
pub fn dispatch(
    grid: &ArenaGrid,
    config: &BlockDistConfig,
    rng: &mut SmallRng,
) -> Result<Distributor, DistributionError> {
    let resolution = grid.resolution();
    let (x_lo, x_hi) = usable_bounds(grid.xdsize(), config.grid_padding);
    let (y_lo, y_hi) = usable_bounds(grid.ydsize(), config.grid_padding);
    let x = GridRange::new(x_lo as usize, x_hi as usize);
    let y = GridRange::new(y_lo as usize, y_hi as usize);
    // Source strategies are capacity-unbounded unless configured otherwise
    let capacity = config.cluster_capacity.unwrap_or(usize::MAX);

    let dist = match config.dist_type {
        DistType::Random => {
            Distributor::Random(RandomDistributor::new(GridView::new(x, y), resolution))
        }
        DistType::SingleSource => {
            // Single source sits against the far X wall of the usable area
            let view = GridView::new(GridRange::new((x_lo * 5.0) as usize, x.hi()), y);
            Distributor::Cluster(ClusterDistributor::new(view, resolution, capacity))
        }
        DistType::DualSource => {
            let left = GridView::new(
                GridRange::new(x.lo(), (x_hi * 0.25 / 0.85) as usize),
                y,
            );
            let right = GridView::new(GridRange::new((x_lo * 5.0) as usize, x.hi()), y);
            Distributor::MultiCluster(MultiClusterDistributor::new(
                [left, right]
                    .into_iter()
                    .map(|v| ClusterDistributor::new(v, resolution, capacity))
                    .collect(),
            ))
        }
        DistType::QuadSource => {
            let left = GridView::new(
                GridRange::new(x.lo(), (x_hi * 0.25 / 0.85) as usize),
                y,
            );
            let right = GridView::new(GridRange::new((x_lo * 5.0) as usize, x.hi()), y);
            let bottom = GridView::new(
                x,
                GridRange::new(y.lo(), (y_hi * 0.25 / 0.85) as usize),
            );
            let top = GridView::new(x, GridRange::new((y_lo * 5.0) as usize, y.hi()));
            Distributor::MultiCluster(MultiClusterDistributor::new(
                [left, right, bottom, top]
                    .into_iter()
                    .map(|v| ClusterDistributor::new(v, resolution, capacity))
                    .collect(),
            ))
        }
        DistType::Powerlaw => {
            let mut p = PowerlawDistributor::new(&config.powerlaw, resolution);
            p.map_clusters(grid, rng)?;
            Distributor::Powerlaw(p)
        }
    };
    info!(dist_type = ?config.dist_type, "block distributor initialized");
    Ok(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PowerlawConfig;
    use rand::SeedableRng;

    fn config(dist_type: DistType) -> BlockDistConfig {
        BlockDistConfig {
            dist_type,
            cluster_capacity: None,
            powerlaw: PowerlawConfig {
                n_clusters: 2,
                pwr_min: 1,
                pwr_max: 2,
            },
            grid_padding: 0.0,
        }
    }

    #[test]
    fn test_usable_range_padding_rule() {
        // 100-cell axis: [15, 85) without padding
        assert_eq!(usable_range(100, 0.0), GridRange::new(15, 85));
        // Padding shrinks the upper bound twice over
        assert_eq!(usable_range(100, 5.0), GridRange::new(15, 76));
    }

    #[test]
    fn test_random_covers_usable_area() {
        let grid = ArenaGrid::new(100, 100, 0.5);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::Random), &mut rng).unwrap();
        match dist {
            Distributor::Random(r) => {
                assert_eq!(r.view().xrange(), GridRange::new(15, 85));
                assert_eq!(r.view().yrange(), GridRange::new(15, 85));
            }
            other => panic!("expected random distributor, got {other:?}"),
        }
    }

    #[test]
    fn test_single_source_band() {
        let grid = ArenaGrid::new(100, 100, 0.5);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::SingleSource), &mut rng).unwrap();
        match dist {
            Distributor::Cluster(c) => {
                // Band starts at 75% of the X dimension
                assert_eq!(c.view().xrange(), GridRange::new(75, 85));
                assert_eq!(c.view().yrange(), GridRange::new(15, 85));
            }
            other => panic!("expected cluster distributor, got {other:?}"),
        }
    }

    #[test]
    fn test_band_fractions_truncate_last() {
        // 50-cell axis: real bounds are [7.5, 42.5]. The single-source band
        // starts at 7.5 * 5 = 37.5 -> 37, not floor(7.5) * 5 = 35
        let grid = ArenaGrid::new(50, 50, 0.2);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::SingleSource), &mut rng).unwrap();
        match dist {
            Distributor::Cluster(c) => {
                assert_eq!(c.view().xrange(), GridRange::new(37, 42));
                assert_eq!(c.view().yrange(), GridRange::new(7, 42));
            }
            other => panic!("expected cluster distributor, got {other:?}"),
        }
    }

    #[test]
    fn test_dual_source_bands_are_symmetric() {
        let grid = ArenaGrid::new(100, 100, 0.5);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::DualSource), &mut rng).unwrap();
        match dist {
            Distributor::MultiCluster(mc) => {
                let views: Vec<&GridView> = mc.clusters().iter().map(|c| c.view()).collect();
                assert_eq!(views.len(), 2);
                assert_eq!(views[0].xrange(), GridRange::new(15, 25));
                assert_eq!(views[1].xrange(), GridRange::new(75, 85));
                assert!(!views[0].overlaps_with(views[1]));
            }
            other => panic!("expected multi-cluster distributor, got {other:?}"),
        }
    }

    #[test]
    fn test_quad_source_has_four_bands() {
        let grid = ArenaGrid::new(100, 100, 0.5);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::QuadSource), &mut rng).unwrap();
        match dist {
            Distributor::MultiCluster(mc) => {
                assert_eq!(mc.clusters().len(), 4);
            }
            other => panic!("expected multi-cluster distributor, got {other:?}"),
        }
    }

    #[test]
    fn test_powerlaw_is_mapped_at_dispatch() {
        let grid = ArenaGrid::new(40, 40, 0.5);
        let mut rng = SmallRng::seed_from_u64(1);
        let dist = dispatch(&grid, &config(DistType::Powerlaw), &mut rng).unwrap();
        match dist {
            Distributor::Powerlaw(p) => assert_eq!(p.clusters().count(), 2),
            other => panic!("expected powerlaw distributor, got {other:?}"),
        }
    }
}
