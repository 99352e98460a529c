//! Octree tile addressing and the point-tile loader.

use crate::{EptError, PointRecord, PointTable, Result, DATA_DIR, ROOT_TILE, TILE_EXTENSION};
use las::{Read, Reader};
use std::fmt;
use std::path::Path;

/// One octree node in the (x, y) plane.
///
/// Depth `d` splits each axis into `2^d` bins. The Z bin is left as a
/// wildcard, so an address matches every vertical sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub depth: u32,
    pub bin_x: u64,
    pub bin_y: u64,
}

impl TileAddress {
    pub const ROOT: TileAddress = TileAddress {
        depth: 0,
        bin_x: 0,
        bin_y: 0,
    };

    /// Node at `depth` containing the normalised position `(locator_x, locator_y)`.
    ///
    /// `bin = floor(locator * 2^depth)`. Locators below 0 fall into bin 0 and
    /// locators at or above 1 into the last bin.
    pub fn containing(locator_x: f64, locator_y: f64, depth: u32) -> Self {
        Self {
            depth,
            bin_x: bin_index(locator_x, depth),
            bin_y: bin_index(locator_y, depth),
        }
    }

    #[inline]
    pub fn bins_per_axis(&self) -> u64 {
        1u64 << self.depth
    }

    /// Key prefix listing every Z sibling: `{dataset}ept-data/{d}-{x}-{y}-`.
    pub fn key_prefix(&self, dataset_prefix: &str) -> String {
        format!("{dataset_prefix}{DATA_DIR}/{self}-")
    }

    /// Key of the depth-0 tile.
    pub fn root_key(dataset_prefix: &str) -> String {
        format!("{dataset_prefix}{DATA_DIR}/{ROOT_TILE}.{TILE_EXTENSION}")
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.depth, self.bin_x, self.bin_y)
    }
}

#[inline]
fn bin_index(locator: f64, depth: u32) -> u64 {
    let bins = 1u64 << depth;
    let scaled = (locator * bins as f64).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as u64).min(bins - 1)
    }
}

/// Last path component of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Tile decoding capability: compressed point file on disk -> point table.
pub trait TileDecoder {
    fn decode(&self, path: &Path) -> Result<PointTable>;
}

/// LAS/LAZ decoder backed by the `las` crate.
///
/// Coordinates come out as `raw * scale + offset` using the header's
/// per-axis transforms; attributes are copied verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct LasDecoder;

impl TileDecoder for LasDecoder {
    fn decode(&self, path: &Path) -> Result<PointTable> {
        let bad = |reason: String| EptError::Decode {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(bad("file does not exist".into()));
        }

        let mut reader = Reader::from_path(path).map_err(|e| bad(e.to_string()))?;

        let header = reader.header();
        let transforms = header.transforms();
        for (axis, t) in [("x", &transforms.x), ("y", &transforms.y), ("z", &transforms.z)] {
            if !t.scale.is_finite() || t.scale == 0.0 || !t.offset.is_finite() {
                return Err(bad(format!(
                    "invalid {axis} transform (scale {}, offset {})",
                    t.scale, t.offset
                )));
            }
        }

        let expected = header.number_of_points();
        let mut table = PointTable::with_capacity(usize::try_from(expected).unwrap_or(0));

        for point in reader.points() {
            let point = point.map_err(|e| bad(e.to_string()))?;
            table.push(PointRecord {
                x: point.x,
                y: point.y,
                z: point.z,
                intensity: point.intensity,
                classification: u8::from(point.classification),
                return_number: point.return_number,
                number_of_returns: point.number_of_returns,
            });
        }

        if (table.len() as u64) < expected {
            return Err(bad(format!(
                "truncated: header declares {expected} points, read {}",
                table.len()
            )));
        }

        tracing::debug!(path = %path.display(), points = table.len(), "decoded tile");
        Ok(table)
    }
}
