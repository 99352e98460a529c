//! Writers for a merged point table.
//!
//! - LAS 1.4 / point format 6 via the `las` crate; `.laz` paths are compressed.
//! - Offset JSON: one array per point,
//!     [X - cx, Y - cy, Z, intensity / max_intensity, return_number, number_of_returns]
//!   i.e. positions relative to the query centre, as consumed by web viewers
//!   that place the cloud at the query coordinate.

use crate::{EptError, PointTable, Result};
use las::point::{Classification, Format};
use las::{Builder, Transform, Vector, Write as _, Writer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output coordinate resolution, in dataset units.
pub const LAS_SCALE: f64 = 0.01;

/// Write `table` as LAS/LAZ, offsetting X/Y by `center` to keep integers small.
pub fn write_las(table: &PointTable, path: impl AsRef<Path>, center: (f64, f64)) -> Result<()> {
    let path = path.as_ref();
    let fail = |reason: String| EptError::Export {
        path: path.to_path_buf(),
        reason,
    };

    let mut builder = Builder::from((1, 4));
    builder.point_format = Format::new(6).map_err(|e| fail(e.to_string()))?;
    builder.transforms = Vector {
        x: Transform {
            scale: LAS_SCALE,
            offset: center.0.round(),
        },
        y: Transform {
            scale: LAS_SCALE,
            offset: center.1.round(),
        },
        z: Transform {
            scale: LAS_SCALE,
            offset: 0.0,
        },
    };
    let header = builder.into_header().map_err(|e| fail(e.to_string()))?;

    let mut writer = Writer::from_path(path, header).map_err(|e| fail(e.to_string()))?;

    for record in table {
        let classification =
            Classification::new(record.classification).map_err(|e| fail(e.to_string()))?;

        let point = las::Point {
            x: record.x,
            y: record.y,
            z: record.z,
            intensity: record.intensity,
            return_number: record.return_number,
            number_of_returns: record.number_of_returns,
            classification,
            // Point format 6 always carries a GPS time.
            gps_time: Some(0.0),
            ..Default::default()
        };

        writer.write(point).map_err(|e| fail(e.to_string()))?;
    }

    writer.close().map_err(|e| fail(e.to_string()))?;

    tracing::info!(path = %path.display(), points = table.len(), "wrote point file");
    Ok(())
}

/// Offset JSON rows (see module docs).
pub fn offset_rows(table: &PointTable, center: (f64, f64)) -> Vec<(f64, f64, f64, f64, u8, u8)> {
    let max_intensity = table.max_intensity().unwrap_or(0);

    table
        .iter()
        .map(|p| {
            let intensity = if max_intensity == 0 {
                0.0
            } else {
                p.intensity as f64 / max_intensity as f64
            };

            (
                p.x - center.0,
                p.y - center.1,
                p.z,
                intensity,
                p.return_number,
                p.number_of_returns,
            )
        })
        .collect()
}

pub fn write_offset_json_to<W: Write>(
    table: &PointTable,
    center: (f64, f64),
    writer: W,
) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &offset_rows(table, center))
}

pub fn write_offset_json(
    table: &PointTable,
    path: impl AsRef<Path>,
    center: (f64, f64),
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| EptError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    write_offset_json_to(table, center, &mut writer).map_err(|e| EptError::Export {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    writer.flush().map_err(|e| EptError::io(path, e))?;

    tracing::info!(path = %path.display(), points = table.len(), "wrote offset json");
    Ok(())
}
