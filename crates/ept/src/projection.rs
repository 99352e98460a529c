//! Coordinate transformer: WGS-84 (lat, lon) into a projected EPSG frame.

use crate::{EptError, Result, EPSG_WGS84};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Reprojection capability consumed by the locator.
pub trait Projector {
    /// Project a WGS-84 `(lat, lon)` in degrees into `target_epsg`.
    ///
    /// Output is in the target frame's linear units (metres, US feet, ...).
    fn project(&self, lat: f64, lon: f64, target_epsg: u32) -> Result<(f64, f64)>;
}

impl<P: Projector + ?Sized> Projector for &P {
    fn project(&self, lat: f64, lon: f64, target_epsg: u32) -> Result<(f64, f64)> {
        (**self).project(lat, lon, target_epsg)
    }
}

/// Look up the proj4 definition of an EPSG code.
pub fn proj_string(epsg: u32) -> Option<&'static str> {
    let code = u16::try_from(epsg).ok()?;
    crs_definitions::from_code(code).map(|def| def.proj4)
}

#[inline]
fn is_geographic(definition: &str) -> bool {
    definition.contains("+proj=longlat") || definition.contains("+proj=latlong")
}

/// Pure-Rust projector backed by `proj4rs` and the bundled EPSG registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct Proj4Projector;

impl Proj4Projector {
    pub fn new() -> Self {
        Self
    }
}

impl Projector for Proj4Projector {
    fn project(&self, lat: f64, lon: f64, target_epsg: u32) -> Result<(f64, f64)> {
        let fail = |reason: String| EptError::Projection {
            epsg: target_epsg,
            reason,
        };

        if !lat.is_finite() || !lon.is_finite() {
            return Err(fail(format!("non-finite input ({lat}, {lon})")));
        }

        let target_def =
            proj_string(target_epsg).ok_or_else(|| fail("unknown EPSG code".into()))?;
        let source_def = proj_string(EPSG_WGS84)
            .ok_or_else(|| fail("WGS-84 definition unavailable".into()))?;

        let source = Proj::from_proj_string(source_def).map_err(|e| fail(format!("{e:?}")))?;
        let target = Proj::from_proj_string(target_def).map_err(|e| fail(format!("{e:?}")))?;

        // proj4rs works in radians for geographic frames, x = lon.
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&source, &target, &mut point).map_err(|e| fail(format!("{e:?}")))?;

        let (x, y) = if is_geographic(target_def) {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(fail(format!("transform of ({lat}, {lon}) produced ({x}, {y})")));
        }

        tracing::trace!(lat, lon, target_epsg, x, y, "projected query point");
        Ok((x, y))
    }
}
