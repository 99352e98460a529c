//! EPT: octree tile locator and merger for Entwine Point Tile LIDAR datasets.
//!
//! - Reads `ept.json` for a dataset (EPSG code, cube bounds, root span).
//! - Projects a WGS-84 (lat, lon) query point into the dataset frame.
//! - Walks the octree from depth 0 down to a fixed cutoff, fetching the tiles
//!   whose (x, y) bin contains the query point.
//! - Caches every tile on disk, decodes it, merges it, and finally filters by
//!   elevation and crops to a square box around the query point.
//!
//! Remote layout (one dataset prefix):
//!   {prefix}ept.json                 : dataset metadata
//!   {prefix}ept-data/0-0-0-0.laz     : root tile, full extent
//!   {prefix}ept-data/D-X-Y-Z.laz     : node at depth D, bins X/Y/Z in [0, 2^D)
//!
//! Local cache layout:
//!   {cache_root}/{prefix}/D-X-Y-Z.laz  (write-once, keyed by filename)
//!
//! The object store, the reprojection backend and the tile decoder are narrow
//! traits ([`ObjectStore`], [`Projector`], [`TileDecoder`]) so [`Locator`] can
//! run against in-memory fakes.

pub mod cache;
pub mod error;
pub mod export;
pub mod footprint;
pub mod locator;
pub mod metadata;
pub mod policy;
pub mod projection;
pub mod store;
pub mod table;
pub mod tile;

pub use cache::{CacheOutcome, TileCache};
pub use error::{EptError, Result};
pub use footprint::{read_footprints, Footprint};
pub use locator::{Locator, LocatorConfig, Query, Stack, StackReport};
pub use metadata::DatasetMetadata;
pub use policy::{ElevationBounds, ElevationPolicy, FilterMode};
pub use projection::{Proj4Projector, Projector};
pub use store::{HttpBucket, ObjectStore, StoreConfig};
pub use table::{PointRecord, PointTable};
pub use tile::{LasDecoder, TileAddress, TileDecoder};

/// Name of the per-dataset metadata object.
pub const METADATA_FILE: &str = "ept.json";

/// Directory (below the dataset prefix) that holds the octree tiles.
pub const DATA_DIR: &str = "ept-data";

/// Stem of the depth-0 tile that covers the full dataset bounds.
pub const ROOT_TILE: &str = "0-0-0-0";

/// Extension of the compressed tile files.
pub const TILE_EXTENSION: &str = "laz";

/// Deepest octree level consulted during refinement (inclusive).
pub const MAX_DEPTH: u32 = 9;

/// Default side length of the crop box, in dataset units.
pub const DEFAULT_BOX_SIZE: f64 = 100.0;

/// Default dataset prefix in the public USGS bucket.
pub const DEFAULT_DATASET: &str = "NY_NewYorkCity/";

/// EPSG code of the geographic frame query coordinates are given in.
pub const EPSG_WGS84: u32 = 4326;
