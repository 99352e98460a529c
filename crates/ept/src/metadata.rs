//! Dataset metadata (`ept.json`).
//!
//! Only the fields the locator needs are decoded:
//!   srs.horizontal : EPSG code of the horizontal frame (string or integer)
//!   bounds         : [xmin, ymin, zmin, xmax, ymax, zmax] in that frame
//!   span           : tile resolution at depth 0
//!
//! `points` and `srs.vertical` are optional and only reported.

use crate::{EptError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMetadata {
    /// Horizontal EPSG code; fixed for the duration of a query.
    pub epsg: u32,
    /// `[xmin, ymin, zmin, xmax, ymax, zmax]`
    pub bounds: [f64; 6],
    pub span: u64,
    pub points: Option<u64>,
    pub vertical: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    srs: RawSrs,
    bounds: Vec<f64>,
    span: u64,
    #[serde(default)]
    points: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSrs {
    horizontal: Option<EpsgCode>,
    #[serde(default)]
    vertical: Option<EpsgCode>,
}

/// Entwine writes codes as strings (`"2263"`); hand-written files often use integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpsgCode {
    Number(u32),
    Text(String),
}

impl EpsgCode {
    fn as_text(&self) -> String {
        match self {
            EpsgCode::Number(n) => n.to_string(),
            EpsgCode::Text(s) => s.clone(),
        }
    }

    fn parse(&self) -> Option<u32> {
        match self {
            EpsgCode::Number(n) => Some(*n),
            EpsgCode::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl DatasetMetadata {
    /// Parse an `ept.json` body. `key` is only used for error context.
    pub fn from_slice(key: &str, body: &[u8]) -> Result<Self> {
        let bad = |reason: String| EptError::MetadataParse {
            key: key.to_string(),
            reason,
        };

        let raw: RawMetadata = serde_json::from_slice(body).map_err(|e| bad(e.to_string()))?;

        let horizontal = raw
            .srs
            .horizontal
            .ok_or_else(|| bad("missing srs.horizontal".into()))?;
        let epsg = horizontal
            .parse()
            .filter(|&code| code > 0)
            .ok_or_else(|| bad(format!("srs.horizontal '{}' is not an EPSG code", horizontal.as_text())))?;

        let bounds: [f64; 6] = raw
            .bounds
            .as_slice()
            .try_into()
            .map_err(|_| bad(format!("bounds must have 6 values, got {}", raw.bounds.len())))?;

        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(bad("bounds contain non-finite values".into()));
        }
        if bounds[3] <= bounds[0] || bounds[4] <= bounds[1] {
            return Err(bad(format!("degenerate bounds {bounds:?}")));
        }

        Ok(Self {
            epsg,
            bounds,
            span: raw.span,
            points: raw.points,
            vertical: raw.srs.vertical.map(|v| v.as_text()),
        })
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.bounds[0]
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.bounds[1]
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.bounds[3]
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.bounds[4]
    }

    /// Normalised position of `(x, y)` inside the dataset bounds.
    ///
    /// Points inside the footprint land in `[0, 1)`. Points outside are not
    /// clamped; the caller gets values outside that range.
    #[inline]
    pub fn locate(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.xmin()) / (self.xmax() - self.xmin()),
            (y - self.ymin()) / (self.ymax() - self.ymin()),
        )
    }
}
