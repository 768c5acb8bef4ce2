//! A [`ModelGrid`] held entirely in memory.

use crate::grid::diagnostics::MapProjection;
use crate::grid::error::GridError;
use crate::grid::mesh::{GridCell, Mesh};
use crate::grid::{cell_series, validate_time_axis, ModelGrid};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Field {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// Model output held in memory: a mesh, a time axis and named fields shaped
/// `(time, y, x)` or `(time, level, y, x)`, flattened row-major.
///
/// Useful for model output that was already loaded by other means and for tests.
#[derive(Debug, Clone)]
pub struct MemoryGrid {
    mesh: Mesh,
    times: Vec<f64>,
    projection: MapProjection,
    fields: HashMap<String, Field>,
}

impl MemoryGrid {
    /// Creates an empty grid. `times` are epoch seconds and must be strictly increasing.
    pub fn new(mesh: Mesh, times: Vec<f64>) -> Result<Self, GridError> {
        validate_time_axis(&times)?;
        Ok(Self {
            mesh,
            times,
            projection: MapProjection::LatLon,
            fields: HashMap::new(),
        })
    }

    pub fn with_projection(mut self, projection: MapProjection) -> Self {
        self.projection = projection;
        self
    }

    /// Adds a field. The time dimension must match the time axis and the last two
    /// dimensions the mesh.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        let (ny, nx) = self.mesh.shape();
        let spatial_ok = shape.len() >= 3 && shape[shape.len() - 2..] == [ny, nx];
        if !(3..=4).contains(&shape.len()) || !spatial_ok || shape[0] != self.times.len() {
            return Err(GridError::UnsupportedShape { name, shape });
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(GridError::DataLength {
                name,
                shape,
                expected,
                found: data.len(),
            });
        }
        self.fields.insert(name, Field { shape, data });
        Ok(self)
    }

    /// Adds a `(time, y, x)` field.
    pub fn with_surface_field(
        self,
        name: impl Into<String>,
        data: Vec<f64>,
    ) -> Result<Self, GridError> {
        let (ny, nx) = self.mesh.shape();
        let shape = vec![self.times.len(), ny, nx];
        self.with_field(name, shape, data)
    }
}

impl ModelGrid for MemoryGrid {
    fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn time_axis(&self) -> &[f64] {
        &self.times
    }

    fn projection(&self) -> MapProjection {
        self.projection
    }

    fn has_variable(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn read_cell(&self, name: &str, cell: &GridCell) -> Result<Vec<f64>, GridError> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| GridError::VariableNotFound(name.to_string()))?;
        cell_series(name, &field.shape, &field.data, self.mesh.shape(), cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::diagnostics::{relative_humidity, wind_direction};

    // 2 x 2 mesh, three hourly steps.
    fn grid() -> Result<MemoryGrid, GridError> {
        let mesh = Mesh::regular(&[40.0, 41.0], &[-112.0, -111.0])?;
        let times = vec![0.0, 3600.0, 7200.0];
        MemoryGrid::new(mesh, times)?
            .with_surface_field("T2", vec![
                280.0, 281.0, 282.0, 283.0, //
                284.0, 285.0, 286.0, 287.0, //
                288.0, 289.0, 290.0, 291.0,
            ])?
            .with_surface_field("U10", vec![5.0; 12])?
            .with_surface_field("V10", vec![0.0; 12])?
            .with_surface_field("PSFC", vec![85_000.0; 12])?
            .with_surface_field("Q2", vec![0.005; 12])
    }

    #[test]
    fn extract_variable_at_nearest_cell() -> Result<(), GridError> {
        let g = grid()?;
        assert_eq!(g.extract_variable("T2", 40.9, -111.2)?, vec![283.0, 287.0, 291.0]);
        assert_eq!(g.extract_variable("T2", 40.1, -111.9)?, vec![280.0, 284.0, 288.0]);
        Ok(())
    }

    #[test]
    fn diagnostics_are_derived_when_not_stored() -> Result<(), GridError> {
        let g = grid()?;
        let wdir = g.extract_variable("uvmet10_wdir", 40.0, -112.0)?;
        assert_eq!(wdir, vec![wind_direction(5.0, 0.0); 3]);
        let wspd = g.extract_variable("uvmet10_wspd", 40.0, -112.0)?;
        assert_eq!(wspd, vec![5.0; 3]);
        let rh = g.extract_variable("rh2", 40.0, -112.0)?;
        assert!((rh[0] - relative_humidity(280.0, 85_000.0, 0.005)).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn stored_field_wins_over_diagnostic() -> Result<(), GridError> {
        let g = grid()?.with_surface_field("rh2", vec![42.0; 12])?;
        assert_eq!(g.extract_variable("rh2", 40.0, -112.0)?, vec![42.0; 3]);
        Ok(())
    }

    #[test]
    fn missing_variable_is_an_error() -> Result<(), GridError> {
        let g = grid()?;
        let err = g.extract_variable("PM2_5_DRY", 40.0, -112.0).unwrap_err();
        assert!(matches!(err, GridError::VariableNotFound(ref name) if name == "PM2_5_DRY"));
        Ok(())
    }

    #[test]
    fn rejects_mismatched_fields_and_times() -> Result<(), GridError> {
        let mesh = Mesh::regular(&[40.0, 41.0], &[-112.0, -111.0])?;
        assert!(matches!(
            MemoryGrid::new(mesh.clone(), vec![0.0, 0.0]),
            Err(GridError::NonMonotonicTime { .. })
        ));
        let g = MemoryGrid::new(mesh, vec![0.0])?;
        assert!(g.clone().with_field("X", vec![2, 2, 2], vec![0.0; 8]).is_err());
        assert!(g.clone().with_field("X", vec![1, 2, 2], vec![0.0; 3]).is_err());
        assert!(g.with_field("X", vec![1, 3, 2, 2], vec![0.0; 12]).is_ok());
        Ok(())
    }
}
