//! Gridded model output: the horizontal mesh, the time axis and per-cell extraction of
//! surface variables.
//!
//! [`ModelGrid`] is implemented by [`MemoryGrid`] (arrays held in memory) and, with the
//! `netcdf` feature, by [`WrfGrid`] (a sequence of `wrfout` files).

pub mod diagnostics;
pub mod error;
pub mod memory;
pub mod mesh;
#[cfg(feature = "netcdf")]
pub mod wrf;

pub use memory::MemoryGrid;
pub use mesh::{GridCell, Mesh};
#[cfg(feature = "netcdf")]
pub use wrf::WrfGrid;

use crate::grid::diagnostics::{
    relative_humidity, wind_direction, wind_speed, Diagnostic, MapProjection,
};
use crate::grid::error::GridError;
use crate::types::bounding_box::BoundingBox;
use std::cmp::Ordering;

/// Read access to time-indexed gridded model output that shares one horizontal mesh.
pub trait ModelGrid {
    fn mesh(&self) -> &Mesh;

    /// Model output times in epoch seconds, strictly increasing, one per time step across
    /// all files.
    fn time_axis(&self) -> &[f64];

    fn projection(&self) -> MapProjection;

    /// Whether `name` is stored in the output (as opposed to derived).
    fn has_variable(&self, name: &str) -> bool;

    /// Reads a stored variable at one cell, one value per model time step. Variables with
    /// a vertical dimension are read at the lowest level.
    fn read_cell(&self, name: &str, cell: &GridCell) -> Result<Vec<f64>, GridError>;

    /// Rectangular extent of the whole mesh.
    fn extent(&self) -> BoundingBox {
        self.mesh().extent()
    }

    /// The grid cell nearest to a location.
    fn locate(&self, latitude: f64, longitude: f64) -> Option<GridCell> {
        self.mesh().nearest_cell(latitude, longitude)
    }

    /// Reads `name` at `cell`, computing it from its inputs when it is a known diagnostic
    /// that the output does not store.
    fn extract_at(&self, name: &str, cell: &GridCell) -> Result<Vec<f64>, GridError> {
        if self.has_variable(name) {
            return self.read_cell(name, cell);
        }
        match Diagnostic::from_name(name) {
            Some(diagnostic) => derive(self, diagnostic, cell),
            None => Err(GridError::VariableNotFound(name.to_string())),
        }
    }

    /// The time series of `name` at the grid cell nearest to `(latitude, longitude)`.
    fn extract_variable(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<f64>, GridError> {
        let cell = self
            .locate(latitude, longitude)
            .ok_or(GridError::EmptyMesh)?;
        self.extract_at(name, &cell)
    }
}

fn derive<G: ModelGrid + ?Sized>(
    grid: &G,
    diagnostic: Diagnostic,
    cell: &GridCell,
) -> Result<Vec<f64>, GridError> {
    let inputs = diagnostic
        .inputs()
        .iter()
        .map(|name| grid.read_cell(name, cell))
        .collect::<Result<Vec<_>, _>>()?;

    let values = match diagnostic {
        Diagnostic::RelativeHumidity2m => inputs[0]
            .iter()
            .zip(&inputs[1])
            .zip(&inputs[2])
            .map(|((&t2, &psfc), &q2)| relative_humidity(t2, psfc, q2))
            .collect(),
        Diagnostic::WindSpeed10m | Diagnostic::WindDirection10m => {
            let projection = grid.projection();
            inputs[0]
                .iter()
                .zip(&inputs[1])
                .map(|(&u, &v)| {
                    let (u, v) = projection.earth_relative(u, v, cell.latitude, cell.longitude);
                    if diagnostic == Diagnostic::WindSpeed10m {
                        wind_speed(u, v)
                    } else {
                        wind_direction(u, v)
                    }
                })
                .collect()
        }
    };
    Ok(values)
}

/// Picks the per-time-step values at `cell` out of a flattened `(time, y, x)` or
/// `(time, level, y, x)` array, using level 0 for the latter.
pub(crate) fn cell_series(
    name: &str,
    shape: &[usize],
    data: &[f64],
    mesh_shape: (usize, usize),
    cell: &GridCell,
) -> Result<Vec<f64>, GridError> {
    let unsupported = || GridError::UnsupportedShape {
        name: name.to_string(),
        shape: shape.to_vec(),
    };
    let (nt, nz, ny, nx) = match *shape {
        [nt, ny, nx] => (nt, 1, ny, nx),
        [nt, nz, ny, nx] => (nt, nz, ny, nx),
        _ => return Err(unsupported()),
    };
    if (ny, nx) != mesh_shape {
        return Err(unsupported());
    }
    let expected = nt * nz * ny * nx;
    if data.len() != expected {
        return Err(GridError::DataLength {
            name: name.to_string(),
            shape: shape.to_vec(),
            expected,
            found: data.len(),
        });
    }
    let step = nz * ny * nx;
    let offset = cell.j * nx + cell.i;
    Ok((0..nt).map(|t| data[t * step + offset]).collect())
}

/// Rejects a time axis that is not strictly increasing.
pub(crate) fn validate_time_axis(times: &[f64]) -> Result<(), GridError> {
    for (index, pair) in times.windows(2).enumerate() {
        if pair[1].partial_cmp(&pair[0]) != Some(Ordering::Greater) {
            return Err(GridError::NonMonotonicTime {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}
