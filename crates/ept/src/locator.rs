//! Octree tile locator and merger.
//!
//! Per query:
//!   1. read `{prefix}ept.json`
//!   2. project (lat, lon) into the dataset frame -> (x, y)
//!   3. normalise (x, y) against the dataset bounds -> locator in [0, 1)
//!   4. fetch and decode the root tile `0-0-0-0`
//!   5. for depth 1..=max_depth, fetch every Z sibling of the (x, y) bin
//!      containing the locator, decode and merge
//!   6. elevation filter, then crop to the box around (x, y)
//!
//! Everything runs sequentially on the calling thread and any error aborts
//! the whole query.

use crate::metadata::DatasetMetadata;
use crate::policy::{ElevationBounds, ElevationPolicy, FilterMode};
use crate::tile::file_name;
use crate::{
    EptError, ObjectStore, PointTable, Projector, Result, TileAddress, TileCache, TileDecoder,
    DEFAULT_BOX_SIZE, MAX_DEPTH, METADATA_FILE,
};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Dataset directory in the bucket, always ending in `/`.
    pub dataset_prefix: String,
    /// Parent of the per-dataset cache directories.
    pub cache_root: PathBuf,
    /// Deepest level consulted (inclusive). Levels past the dataset's real
    /// depth simply list nothing.
    pub max_depth: u32,
    pub policy: ElevationPolicy,
    pub filter_mode: FilterMode,
}

impl LocatorConfig {
    pub fn new(dataset_prefix: &str, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_prefix: normalize_prefix(dataset_prefix),
            cache_root: cache_root.into(),
            max_depth: MAX_DEPTH,
            policy: ElevationPolicy::default(),
            filter_mode: FilterMode::default(),
        }
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_policy(mut self, policy: ElevationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Query centre in WGS-84 degrees and crop size in dataset units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Query {
    pub lat: f64,
    pub lon: f64,
    pub box_size: f64,
}

impl Query {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            box_size: DEFAULT_BOX_SIZE,
        }
    }

    pub fn with_box_size(mut self, box_size: f64) -> Self {
        self.box_size = box_size;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackReport {
    /// Tile files consulted, root included.
    pub tiles: usize,
    pub downloaded: usize,
    pub cache_hits: usize,
    /// Deepest level that contributed at least one tile.
    pub deepest_level: u32,
    pub points_merged: usize,
    pub points_returned: usize,
}

/// Result of one query.
#[derive(Debug, Clone)]
pub struct Stack {
    pub table: PointTable,
    pub metadata: DatasetMetadata,
    /// Query point in the dataset frame.
    pub center: (f64, f64),
    /// Query point normalised against the dataset bounds.
    pub locator: (f64, f64),
    /// Bounds applied to the merged table; `None` in per-tile mode.
    pub applied_bounds: Option<ElevationBounds>,
    pub report: StackReport,
}

pub struct Locator<S, P, D> {
    store: S,
    projector: P,
    decoder: D,
    config: LocatorConfig,
}

impl<S, P, D> Locator<S, P, D>
where
    S: ObjectStore,
    P: Projector,
    D: TileDecoder,
{
    pub fn new(store: S, projector: P, decoder: D, config: LocatorConfig) -> Self {
        Self {
            store,
            projector,
            decoder,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn cache(&self) -> TileCache {
        TileCache::new(&self.config.cache_root, &self.config.dataset_prefix)
    }

    /// Find and parse the dataset's `ept.json`.
    pub fn metadata(&self) -> Result<DatasetMetadata> {
        let prefix = &self.config.dataset_prefix;
        let listing = format!("{prefix}{METADATA_FILE}");

        let key = self
            .store
            .list(&listing)?
            .into_iter()
            .find(|k| file_name(k) == METADATA_FILE)
            .ok_or_else(|| EptError::MetadataNotFound {
                prefix: prefix.clone(),
            })?;

        let body = self.store.get(&key)?;
        DatasetMetadata::from_slice(&key, &body)
    }

    /// Merged, filtered and cropped points around `query`.
    pub fn stack_tiles(&self, query: &Query) -> Result<PointTable> {
        Ok(self.stack(query)?.table)
    }

    /// Like [`Locator::stack_tiles`], with the intermediate values and a report.
    pub fn stack(&self, query: &Query) -> Result<Stack> {
        let prefix = self.config.dataset_prefix.as_str();
        let policy = &self.config.policy;
        let mode = self.config.filter_mode;

        tracing::info!(
            dataset = prefix,
            lat = query.lat,
            lon = query.lon,
            box_size = query.box_size,
            filter_mode = %mode,
            "stacking tiles"
        );

        // ---------------------------------------------------------------------
        // Metadata, projection, normalisation
        // ---------------------------------------------------------------------
        let metadata = self.metadata()?;
        let (x, y) = self.projector.project(query.lat, query.lon, metadata.epsg)?;
        let (locator_x, locator_y) = metadata.locate(x, y);

        tracing::debug!(
            epsg = metadata.epsg,
            span = metadata.span,
            x,
            y,
            locator_x,
            locator_y,
            "query located in dataset"
        );

        if !(0.0..1.0).contains(&locator_x) || !(0.0..1.0).contains(&locator_y) {
            tracing::warn!(
                locator_x,
                locator_y,
                "query point lies outside the dataset bounds; edge bins will be used"
            );
        }

        let cache = self.cache();
        cache.ensure_dir()?;

        let mut report = StackReport::default();

        // ---------------------------------------------------------------------
        // Root tile: always the base layer
        // ---------------------------------------------------------------------
        let root_key = TileAddress::root_key(prefix);
        let mut table = self.load(&cache, &root_key, &mut report)?;
        if mode == FilterMode::PerTile {
            let bounds = policy.bounds_for(0, &table);
            table.retain_elevation(bounds.low, bounds.high);
        }

        // ---------------------------------------------------------------------
        // Progressive refinement
        // ---------------------------------------------------------------------
        let mut last_bounds: Option<ElevationBounds> = None;

        for depth in 1..=self.config.max_depth {
            let address = TileAddress::containing(locator_x, locator_y, depth);
            let tile_prefix = address.key_prefix(prefix);

            let keys = self
                .store
                .list(&tile_prefix)
                .map_err(|e| e.at_depth(depth, address.bin_x, address.bin_y))?;

            tracing::debug!(depth, bin = %address, tiles = keys.len(), "refining");

            for key in &keys {
                let mut tile = self
                    .load(&cache, key, &mut report)
                    .map_err(|e| e.at_depth(depth, address.bin_x, address.bin_y))?;

                let bounds = policy.bounds_for(depth, &tile);
                match mode {
                    FilterMode::LastTile => last_bounds = Some(bounds),
                    FilterMode::PerTile => tile.retain_elevation(bounds.low, bounds.high),
                }

                report.deepest_level = depth;
                table.merge(tile);
            }
        }

        report.points_merged = table.len();

        // ---------------------------------------------------------------------
        // Final filter and crop
        // ---------------------------------------------------------------------
        let applied_bounds = match mode {
            FilterMode::LastTile => {
                let bounds = last_bounds.unwrap_or(policy.fixed);
                table.retain_elevation(bounds.low, bounds.high);
                Some(bounds)
            }
            FilterMode::PerTile => None,
        };

        table.crop(x, y, query.box_size);
        report.points_returned = table.len();

        tracing::info!(
            dataset = prefix,
            tiles = report.tiles,
            downloaded = report.downloaded,
            cache_hits = report.cache_hits,
            deepest_level = report.deepest_level,
            merged = report.points_merged,
            returned = report.points_returned,
            "stack complete"
        );

        Ok(Stack {
            table,
            metadata,
            center: (x, y),
            locator: (locator_x, locator_y),
            applied_bounds,
            report,
        })
    }

    fn load(&self, cache: &TileCache, key: &str, report: &mut StackReport) -> Result<PointTable> {
        let outcome = cache.fetch(&self.store, key)?;

        report.tiles += 1;
        if outcome.downloaded {
            report.downloaded += 1;
        } else {
            report.cache_hits += 1;
        }

        self.decoder.decode(&outcome.path)
    }
}
