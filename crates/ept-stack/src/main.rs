mod config;

use crate::config::{Command, Config, OutputFormat, RemoteArgs, StackArgs};
use anyhow::{bail, Context, Result};
use clap::Parser;
use ept::{
    export, read_footprints, HttpBucket, LasDecoder, Locator, LocatorConfig, Proj4Projector,
    Query,
};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_json);

    match config.command {
        Command::Stack(args) => run_stack(args),
        Command::Footprints { path } => run_footprints(&path),
        Command::Metadata { remote } => run_metadata(&remote),
    }
}

/// Centre of the query: explicit coordinates or a footprint centroid.
fn resolve_centre(args: &StackArgs) -> Result<(f64, f64)> {
    if let Some(path) = &args.footprints {
        let name = args.name.as_deref().context("--footprints needs --name")?;
        let footprints = read_footprints(path)
            .with_context(|| format!("Failed to read footprints from {}", path.display()))?;

        let footprint = footprints
            .iter()
            .find(|f| f.name == name)
            .with_context(|| format!("No footprint named '{name}' in {}", path.display()))?;

        let centre = footprint
            .centroid()
            .with_context(|| format!("Footprint '{name}' has no vertices"))?;

        tracing::info!(name, lat = centre.0, lon = centre.1, "using footprint centroid");
        return Ok(centre);
    }

    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => bail!("either --lat/--lon or --footprints/--name is required"),
    }
}

fn run_stack(args: StackArgs) -> Result<()> {
    let format = OutputFormat::from_path(&args.output).with_context(|| {
        format!(
            "Unsupported output extension for {} (use .las, .laz or .json)",
            args.output.display()
        )
    })?;

    if !args.box_size.is_finite() || args.box_size <= 0.0 {
        bail!("--box-size must be a positive number, got {}", args.box_size);
    }

    let (lat, lon) = resolve_centre(&args)?;

    let store = HttpBucket::new(&args.remote.store_config())
        .context("Failed to set up the object store client")?;

    let locator_config = LocatorConfig::new(&args.remote.dataset, args.cache_root.clone())
        .with_max_depth(args.max_depth)
        .with_filter_mode(args.filter_mode);

    let locator = Locator::new(store, Proj4Projector::new(), LasDecoder, locator_config);

    let query = Query::new(lat, lon).with_box_size(args.box_size);
    let stack = locator
        .stack(&query)
        .with_context(|| format!("Failed to stack tiles for {}", args.remote.dataset))?;

    if stack.table.is_empty() {
        tracing::warn!("query returned no points; writing an empty file");
    }

    write_output(&stack.table, &args.output, stack.center, format)?;

    tracing::info!(
        output = %args.output.display(),
        points = stack.table.len(),
        tiles = stack.report.tiles,
        downloaded = stack.report.downloaded,
        "done"
    );

    Ok(())
}

fn write_output(
    table: &ept::PointTable,
    path: &Path,
    center: (f64, f64),
    format: OutputFormat,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let written = match format {
        OutputFormat::Las => export::write_las(table, path, center),
        OutputFormat::OffsetJson => export::write_offset_json(table, path, center),
    };

    written.with_context(|| format!("Failed to write {}", path.display()))
}

fn run_footprints(path: &Path) -> Result<()> {
    let footprints = read_footprints(path)
        .with_context(|| format!("Failed to read footprints from {}", path.display()))?;

    for footprint in &footprints {
        match (footprint.centroid(), footprint.bbox()) {
            (Some((lat, lon)), Some(bb)) => println!(
                "{}\t{} vertices\tcentroid {:.7},{:.7}\tbbox lon=[{:.7}, {:.7}] lat=[{:.7}, {:.7}]",
                footprint.name,
                footprint.vertices.len(),
                lat,
                lon,
                bb.lon_min,
                bb.lon_max,
                bb.lat_min,
                bb.lat_max
            ),
            _ => println!("{}\t0 vertices", footprint.name),
        }
    }

    tracing::info!(count = footprints.len(), "listed footprints");
    Ok(())
}

fn run_metadata(remote: &RemoteArgs) -> Result<()> {
    let store = HttpBucket::new(&remote.store_config())
        .context("Failed to set up the object store client")?;

    // Only metadata is read; the cache directory is never created.
    let locator = Locator::new(
        store,
        Proj4Projector::new(),
        LasDecoder,
        LocatorConfig::new(&remote.dataset, "laz"),
    );

    let metadata = locator
        .metadata()
        .with_context(|| format!("Failed to read metadata for {}", remote.dataset))?;

    let [xmin, ymin, zmin, xmax, ymax, zmax] = metadata.bounds;
    println!("dataset   {}", locator.config().dataset_prefix);
    println!("epsg      {}", metadata.epsg);
    if let Some(vertical) = &metadata.vertical {
        println!("vertical  {vertical}");
    }
    println!("span      {}", metadata.span);
    if let Some(points) = metadata.points {
        println!("points    {points}");
    }
    println!("bounds    x=[{xmin}, {xmax}] y=[{ymin}, {ymax}] z=[{zmin}, {zmax}]");

    Ok(())
}
