//! Rectangular latitude/longitude extent of a model mesh.

use serde::{Deserialize, Serialize};

/// Min/max latitude and longitude of a model grid.
///
/// This is the rectangle spanned by the whole mesh, not its outline. For a rotated or
/// otherwise non-rectangular mesh it admits points near the corners that lie outside the
/// actual grid.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Builds the extent of a set of mesh points. NaN coordinates are ignored.
    ///
    /// Returns `None` when there is no finite point at all.
    pub fn from_points(lats: &[f64], lons: &[f64]) -> Option<Self> {
        let (min_lat, max_lat) = finite_min_max(lats)?;
        let (min_lon, max_lon) = finite_min_max(lons)?;
        Some(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Inclusive membership: a point exactly on an edge is inside.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
