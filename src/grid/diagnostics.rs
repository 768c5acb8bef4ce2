//! Surface diagnostics that WRF does not write out directly and that are derived from the
//! raw fields at one grid cell: 2 m relative humidity and earth-relative 10 m wind.

use crate::grid::error::GridError;
use std::f64::consts::PI;

const RAD_PER_DEG: f64 = PI / 180.0;
const EPS: f64 = 0.622;

/// Diagnostic fields computed from other model variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// `rh2`: from `T2`, `PSFC` and `Q2`.
    RelativeHumidity2m,
    /// `uvmet10_wspd`: from `U10`, `V10`.
    WindSpeed10m,
    /// `uvmet10_wdir`: from `U10`, `V10`, rotated to earth coordinates.
    WindDirection10m,
}

impl Diagnostic {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rh2" => Some(Diagnostic::RelativeHumidity2m),
            "uvmet10_wspd" => Some(Diagnostic::WindSpeed10m),
            "uvmet10_wdir" => Some(Diagnostic::WindDirection10m),
            _ => None,
        }
    }

    /// Raw fields the diagnostic is computed from.
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            Diagnostic::RelativeHumidity2m => &["T2", "PSFC", "Q2"],
            Diagnostic::WindSpeed10m | Diagnostic::WindDirection10m => &["U10", "V10"],
        }
    }
}

/// Map projection of a WRF domain, as far as wind rotation is concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapProjection {
    LambertConformal {
        truelat1: f64,
        truelat2: f64,
        stand_lon: f64,
    },
    PolarStereographic {
        stand_lon: f64,
    },
    Mercator,
    LatLon,
}

impl MapProjection {
    /// Builds the projection from the `MAP_PROJ` global attribute and its parameters.
    pub fn from_wrf(
        map_proj: i32,
        truelat1: f64,
        truelat2: f64,
        stand_lon: f64,
    ) -> Result<Self, GridError> {
        match map_proj {
            1 => Ok(MapProjection::LambertConformal {
                truelat1,
                truelat2,
                stand_lon,
            }),
            2 => Ok(MapProjection::PolarStereographic { stand_lon }),
            3 => Ok(MapProjection::Mercator),
            0 | 6 => Ok(MapProjection::LatLon),
            other => Err(GridError::UnsupportedProjection(other)),
        }
    }

    /// Cone factor and standard longitude, or `None` when grid winds are already
    /// earth-relative.
    fn cone(&self) -> Option<(f64, f64)> {
        match *self {
            MapProjection::LambertConformal {
                truelat1,
                truelat2,
                stand_lon,
            } => Some((lambert_cone(truelat1, truelat2), stand_lon)),
            MapProjection::PolarStereographic { stand_lon } => Some((1.0, stand_lon)),
            MapProjection::Mercator | MapProjection::LatLon => None,
        }
    }

    /// Rotates grid-relative `(u, v)` at `(latitude, longitude)` to earth-relative.
    pub fn earth_relative(&self, u: f64, v: f64, latitude: f64, longitude: f64) -> (f64, f64) {
        let Some((cone, stand_lon)) = self.cone() else {
            return (u, v);
        };
        let mut diff = longitude - stand_lon;
        if diff > 180.0 {
            diff -= 360.0;
        }
        if diff < -180.0 {
            diff += 360.0;
        }
        let alpha = if latitude < 0.0 {
            -diff * cone * RAD_PER_DEG
        } else {
            diff * cone * RAD_PER_DEG
        };
        (
            v * alpha.sin() + u * alpha.cos(),
            v * alpha.cos() - u * alpha.sin(),
        )
    }
}

fn lambert_cone(truelat1: f64, truelat2: f64) -> f64 {
    if (truelat1 - truelat2).abs() > 0.1 {
        let num = (truelat1 * RAD_PER_DEG).cos().log10() - (truelat2 * RAD_PER_DEG).cos().log10();
        let den = ((45.0 - truelat1.abs() / 2.0) * RAD_PER_DEG).tan().log10()
            - ((45.0 - truelat2.abs() / 2.0) * RAD_PER_DEG).tan().log10();
        num / den
    } else {
        (truelat1.abs() * RAD_PER_DEG).sin()
    }
}

/// Relative humidity in percent from temperature (K), pressure (Pa) and water vapour
/// mixing ratio (kg/kg), clamped to `[0, 100]`.
pub fn relative_humidity(temperature: f64, pressure: f64, mixing_ratio: f64) -> f64 {
    let es = 6.112 * (17.67 * (temperature - 273.15) / (temperature - 29.65)).exp();
    let qvs = EPS * es / (0.01 * pressure - (1.0 - EPS) * es);
    100.0 * (mixing_ratio / qvs).clamp(0.0, 1.0)
}

pub fn wind_speed(u: f64, v: f64) -> f64 {
    u.hypot(v)
}

/// Meteorological wind direction (degrees the wind blows *from*), in `[0, 360)`.
pub fn wind_direction(u: f64, v: f64) -> f64 {
    (270.0 - v.atan2(u) / RAD_PER_DEG) % 360.0
}
