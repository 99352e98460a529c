//! GeoJSON footprints (e.g. building outlines) used to pick query centres.

use crate::{EptError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GeoJsonRoot {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Rings,
}

/// Polygon (`[ring][vertex][axis]`) or MultiPolygon (`[polygon][ring][vertex][axis]`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Rings {
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
    Polygon(Vec<Vec<Vec<f64>>>),
}

#[derive(Debug, Deserialize)]
struct Properties {
    name: String,
}

/// Named outline as a flat list of `[lon, lat]` vertices (all rings, in order).
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub name: String,
    pub vertices: Vec<[f64; 2]>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBboxDeg {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl Footprint {
    /// Vertex mean as `(lat, lon)`, ready for a [`crate::Query`].
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.vertices.is_empty() {
            return None;
        }

        let n = self.vertices.len() as f64;
        let (lon_sum, lat_sum) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(lo, la), &[lon, lat]| (lo + lon, la + lat));

        Some((lat_sum / n, lon_sum / n))
    }

    pub fn bbox(&self) -> Option<GeoBboxDeg> {
        // Initialise the extents.
        let (mut lon_min, mut lat_min) = (f64::INFINITY, f64::INFINITY);
        let (mut lon_max, mut lat_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        for &[lon, lat] in &self.vertices {
            lon_min = lon_min.min(lon);
            lon_max = lon_max.max(lon);
            lat_min = lat_min.min(lat);
            lat_max = lat_max.max(lat);
        }

        if !lon_min.is_finite() {
            return None;
        }

        Some(GeoBboxDeg {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        })
    }
}

fn flatten(rings: Rings) -> Vec<[f64; 2]> {
    let polygons = match rings {
        Rings::MultiPolygon(polys) => polys,
        Rings::Polygon(rings) => vec![rings],
    };

    polygons
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|position| match position.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some([*lon, *lat]),
            _ => None,
        })
        .collect()
}

/// Parse every feature of a GeoJSON FeatureCollection.
pub fn read_footprints(path: impl AsRef<Path>) -> Result<Vec<Footprint>> {
    let path = path.as_ref();

    // Open and deserialize the GeoJSON feature collection.
    let file = File::open(path).map_err(|e| EptError::io(path, e))?;
    let reader = BufReader::new(file);
    let root: GeoJsonRoot =
        serde_json::from_reader(reader).map_err(|e| EptError::Footprint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let footprints = root
        .features
        .into_iter()
        .map(|feature| Footprint {
            name: feature.properties.name,
            vertices: flatten(feature.geometry.coordinates),
        })
        .collect::<Vec<_>>();

    tracing::debug!(path = %path.display(), count = footprints.len(), "read footprints");
    Ok(footprints)
}
