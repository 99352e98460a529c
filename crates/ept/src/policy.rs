//! Depth-dependent elevation filter policy.
//!
//! Shallow tiles (depth <= 7) use fixed bounds `[0, 1000]`. Deeper tiles use
//! their own Z statistics: `[mean - 4 std, mean + 8 std]`, biased upward so
//! canopy and roof returns survive while below-ground noise is cut.

use crate::PointTable;

/// Deepest level that still uses the fixed bounds.
pub const STATISTICAL_DEPTH_THRESHOLD: u32 = 7;

/// Standard deviations kept below the tile mean.
pub const BELOW_SIGMA: f64 = 4.0;

/// Standard deviations kept above the tile mean.
pub const ABOVE_SIGMA: f64 = 8.0;

pub const FIXED_LOW: f64 = 0.0;
pub const FIXED_HIGH: f64 = 1000.0;

/// Inclusive Z range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationBounds {
    pub low: f64,
    pub high: f64,
}

impl ElevationBounds {
    #[inline]
    pub fn contains(&self, z: f64) -> bool {
        z >= self.low && z <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationPolicy {
    pub statistical_depth_threshold: u32,
    pub below_sigma: f64,
    pub above_sigma: f64,
    pub fixed: ElevationBounds,
}

impl Default for ElevationPolicy {
    fn default() -> Self {
        Self {
            statistical_depth_threshold: STATISTICAL_DEPTH_THRESHOLD,
            below_sigma: BELOW_SIGMA,
            above_sigma: ABOVE_SIGMA,
            fixed: ElevationBounds {
                low: FIXED_LOW,
                high: FIXED_HIGH,
            },
        }
    }
}

impl ElevationPolicy {
    /// Bounds for one decoded tile at `depth`.
    ///
    /// A deep tile with fewer than two points has no deviation; it falls back
    /// to the fixed bounds.
    pub fn bounds_for(&self, depth: u32, tile: &PointTable) -> ElevationBounds {
        if depth <= self.statistical_depth_threshold {
            return self.fixed;
        }

        match tile.z_stats() {
            Some((mean, std)) => ElevationBounds {
                low: mean - self.below_sigma * std,
                high: mean + self.above_sigma * std,
            },
            None => {
                tracing::warn!(
                    depth,
                    points = tile.len(),
                    "too few points for Z statistics, using fixed bounds"
                );
                self.fixed
            }
        }
    }
}

/// When elevation bounds are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum FilterMode {
    /// Bounds are recomputed for every tile, and only the bounds of the last
    /// tile processed are applied, once, to the whole merged table.
    #[default]
    LastTile,
    /// Every tile is filtered by its own bounds before it is merged.
    PerTile,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FilterMode::LastTile => "last-tile",
            FilterMode::PerTile => "per-tile",
        };

        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PointRecord;

    fn tile(zs: &[f64]) -> PointTable {
        zs.iter()
            .map(|&z| PointRecord {
                x: 0.0,
                y: 0.0,
                z,
                intensity: 0,
                classification: 2,
                return_number: 1,
                number_of_returns: 1,
            })
            .collect()
    }

    #[test]
    fn deep_tiles_use_their_own_statistics() {
        // mean 10, sample std 2
        let t = tile(&[8.0, 10.0, 12.0]);
        let b = ElevationPolicy::default().bounds_for(8, &t);
        assert!((b.low - 2.0).abs() < 1e-12);
        assert!((b.high - 26.0).abs() < 1e-12);
    }

    #[test]
    fn shallow_tiles_use_fixed_bounds() {
        let t = tile(&[8.0, 10.0, 12.0]);
        let policy = ElevationPolicy::default();
        for depth in [0, 3, 7] {
            assert_eq!(
                policy.bounds_for(depth, &t),
                ElevationBounds {
                    low: 0.0,
                    high: 1000.0
                }
            );
        }
    }

    #[test]
    fn sparse_deep_tiles_fall_back_to_fixed_bounds() {
        let policy = ElevationPolicy::default();
        assert_eq!(policy.bounds_for(9, &tile(&[42.0])), policy.fixed);
        assert_eq!(policy.bounds_for(9, &tile(&[])), policy.fixed);
    }

    #[test]
    fn bounds_are_inclusive() {
        let b = ElevationBounds {
            low: 2.0,
            high: 26.0,
        };
        assert!(b.contains(2.0));
        assert!(b.contains(26.0));
        assert!(!b.contains(26.000_001));
    }

    #[test]
    fn filter_mode_names() {
        assert_eq!(FilterMode::default(), FilterMode::LastTile);
        assert_eq!(FilterMode::LastTile.to_string(), "last-tile");
        assert_eq!(FilterMode::PerTile.to_string(), "per-tile");
    }
}
