//! Shared fixtures: an in-memory bucket, a fixed projector and LAS tile bytes.
#![allow(dead_code)]

use ept::{export, EptError, ObjectStore, PointRecord, PointTable, Projector, Result};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;

pub const DATASET: &str = "TEST_Dataset/";

/// Bucket held in memory. Keys list in lexical order, like S3.
#[derive(Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
    pub downloads: Cell<usize>,
    pub listed: RefCell<Vec<String>>,
    /// Listing any prefix starting with this fails.
    pub fail_list: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, body: Vec<u8>) {
        self.objects.insert(key.into(), body);
    }

    pub fn with_metadata(bounds: [f64; 6]) -> Self {
        let mut store = Self::new();
        store.put(format!("{DATASET}ept.json"), metadata_json(bounds, "2263"));
        store
    }

    pub fn put_tile(&mut self, name: &str, z: &[f64], xy: (f64, f64)) {
        self.put(format!("{DATASET}ept-data/{name}.laz"), tile_bytes(z, xy));
    }

    fn missing(operation: &'static str, key: &str) -> EptError {
        EptError::RemoteAccess {
            operation,
            target: key.to_string(),
            reason: "404 Not Found".into(),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.listed.borrow_mut().push(prefix.to_string());

        if let Some(fail) = &self.fail_list {
            if prefix.starts_with(fail.as_str()) {
                return Err(EptError::RemoteAccess {
                    operation: "list",
                    target: prefix.to_string(),
                    reason: "503 Slow Down".into(),
                });
            }
        }

        Ok(self
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Self::missing("get", key))
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64> {
        let body = self
            .objects
            .get(key)
            .ok_or_else(|| Self::missing("download", key))?;
        std::fs::write(dest, body).map_err(|e| EptError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        self.downloads.set(self.downloads.get() + 1);
        Ok(body.len() as u64)
    }
}

/// Projects every query to the same dataset coordinate.
pub struct FixedProjector {
    pub x: f64,
    pub y: f64,
    pub seen_epsg: Cell<Option<u32>>,
}

impl FixedProjector {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            seen_epsg: Cell::new(None),
        }
    }
}

impl Projector for FixedProjector {
    fn project(&self, _lat: f64, _lon: f64, target_epsg: u32) -> Result<(f64, f64)> {
        self.seen_epsg.set(Some(target_epsg));
        Ok((self.x, self.y))
    }
}

/// Knows no frame at all.
pub struct NoProjector;

impl Projector for NoProjector {
    fn project(&self, _lat: f64, _lon: f64, target_epsg: u32) -> Result<(f64, f64)> {
        Err(EptError::Projection {
            epsg: target_epsg,
            reason: "unknown EPSG code".into(),
        })
    }
}

pub fn metadata_json(bounds: [f64; 6], horizontal: &str) -> Vec<u8> {
    serde_json::json!({
        "bounds": bounds,
        "boundsConforming": bounds,
        "dataType": "laszip",
        "hierarchyType": "json",
        "points": 1234,
        "schema": [],
        "span": 128,
        "srs": { "authority": "EPSG", "horizontal": horizontal, "vertical": "6360" },
        "version": "1.0.0"
    })
    .to_string()
    .into_bytes()
}

pub fn record(x: f64, y: f64, z: f64) -> PointRecord {
    PointRecord {
        x,
        y,
        z,
        intensity: 100,
        classification: 2,
        return_number: 1,
        number_of_returns: 1,
    }
}

/// LAS bytes holding one point per `z`, all at `xy`.
pub fn tile_bytes(z: &[f64], xy: (f64, f64)) -> Vec<u8> {
    let table: PointTable = z.iter().map(|&z| record(xy.0, xy.1, z)).collect();
    table_bytes(&table)
}

pub fn table_bytes(table: &PointTable) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.las");
    export::write_las(table, &path, (0.0, 0.0)).unwrap();
    std::fs::read(&path).unwrap()
}

/// Z values of a table, sorted.
pub fn zs(table: &PointTable) -> Vec<f64> {
    let mut z: Vec<f64> = table.iter().map(|p| p.z).collect();
    z.sort_by(f64::total_cmp);
    z
}
