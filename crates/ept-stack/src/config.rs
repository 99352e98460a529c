use clap::{Args, Parser, Subcommand};
use ept::{FilterMode, DEFAULT_BOX_SIZE, DEFAULT_DATASET, MAX_DEPTH};
use std::path::PathBuf;
use std::time::Duration;

/// `ept-stack` - pull LIDAR points around a coordinate out of a public
/// Entwine Point Tile dataset.
#[derive(Parser, Debug)]
#[command(name = "ept-stack", version, about, long_about = None)]
pub struct Config {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge octree tiles around a point and write the cropped cloud.
    Stack(StackArgs),

    /// List the features of a GeoJSON footprint file.
    Footprints {
        /// GeoJSON FeatureCollection with `properties.name` per feature.
        path: PathBuf,
    },

    /// Print the parsed `ept.json` of a dataset.
    Metadata {
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

/// Where the dataset lives.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Dataset prefix in the bucket (see https://usgs.entwine.io/).
    #[arg(long, env = "EPT_DATASET", default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// S3-compatible endpoint; the bucket is addressed path-style below it.
    #[arg(long, env = "EPT_ENDPOINT", default_value = ept::store::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, env = "EPT_BUCKET", default_value = ept::store::DEFAULT_BUCKET)]
    pub bucket: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl RemoteArgs {
    pub fn store_config(&self) -> ept::StoreConfig {
        ept::StoreConfig {
            endpoint: self.endpoint.clone(),
            bucket: self.bucket.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args, Debug)]
pub struct StackArgs {
    /// Latitude of the centre point, WGS-84 degrees.
    #[arg(long, allow_hyphen_values = true, required_unless_present = "footprints")]
    pub lat: Option<f64>,

    /// Longitude of the centre point, WGS-84 degrees.
    #[arg(long, allow_hyphen_values = true, required_unless_present = "footprints")]
    pub lon: Option<f64>,

    /// Use the centroid of a named footprint instead of --lat/--lon.
    #[arg(long, requires = "name", conflicts_with_all = ["lat", "lon"])]
    pub footprints: Option<PathBuf>,

    /// Feature name inside --footprints.
    #[arg(long)]
    pub name: Option<String>,

    /// Crop side length in dataset units (feet for EPSG:2263).
    #[arg(long, default_value_t = DEFAULT_BOX_SIZE)]
    pub box_size: f64,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Local tile cache; one subdirectory per dataset.
    #[arg(long, env = "EPT_CACHE_ROOT", default_value = "laz")]
    pub cache_root: PathBuf,

    /// Deepest octree level to consult.
    #[arg(long, default_value_t = MAX_DEPTH)]
    pub max_depth: u32,

    /// When elevation bounds are applied to the merged cloud.
    #[arg(long, value_enum, default_value_t = FilterMode::LastTile)]
    pub filter_mode: FilterMode,

    /// Output file: `.las`/`.laz` for point files, `.json` for offset rows.
    #[arg(long, short)]
    pub output: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Las,
    OffsetJson,
}

impl OutputFormat {
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())?;

        match ext.as_str() {
            "las" | "laz" => Some(OutputFormat::Las),
            "json" => Some(OutputFormat::OffsetJson),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Config::command().debug_assert();
    }

    #[test]
    fn parses_stack_with_coordinates() {
        let config = Config::try_parse_from([
            "ept-stack", "stack", "--lat", "40.7", "--lon", "-73.99", "--box-size", "50",
            "--filter-mode", "per-tile", "-o", "out.laz",
        ])
        .unwrap();

        let Command::Stack(args) = config.command else {
            panic!("expected stack");
        };
        assert_eq!(args.lat, Some(40.7));
        assert_eq!(args.lon, Some(-73.99));
        assert_eq!(args.box_size, 50.0);
        assert_eq!(args.max_depth, 9);
        assert_eq!(args.filter_mode, FilterMode::PerTile);
        assert_eq!(args.remote.bucket, "usgs-lidar-public");
    }

    #[test]
    fn filter_mode_defaults_to_last_tile() {
        let config =
            Config::try_parse_from(["ept-stack", "stack", "--lat", "1", "--lon", "2", "-o", "a.las"])
                .unwrap();
        let Command::Stack(args) = config.command else {
            panic!("expected stack");
        };
        assert_eq!(args.filter_mode, FilterMode::LastTile);

        assert!(Config::try_parse_from([
            "ept-stack", "stack", "--lat", "1", "--lon", "2", "--filter-mode", "nearest", "-o",
            "a.las"
        ])
        .is_err());
    }

    #[test]
    fn stack_needs_a_centre() {
        assert!(Config::try_parse_from(["ept-stack", "stack", "-o", "x.json"]).is_err());
        assert!(Config::try_parse_from([
            "ept-stack", "stack", "--footprints", "f.geojson", "--name", "A", "-o", "x.json"
        ])
        .is_ok());
    }

    #[test]
    fn output_format_follows_extension() {
        use std::path::Path;
        assert_eq!(OutputFormat::from_path(Path::new("a.LAZ")), Some(OutputFormat::Las));
        assert_eq!(OutputFormat::from_path(Path::new("a.las")), Some(OutputFormat::Las));
        assert_eq!(OutputFormat::from_path(Path::new("a.json")), Some(OutputFormat::OffsetJson));
        assert_eq!(OutputFormat::from_path(Path::new("a.csv")), None);
    }
}
