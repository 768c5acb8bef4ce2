//! [`ModelGrid`] over a sequence of WRF `wrfout` NetCDF files.

use crate::grid::diagnostics::MapProjection;
use crate::grid::error::GridError;
use crate::grid::mesh::{GridCell, Mesh};
use crate::grid::{validate_time_axis, ModelGrid};
use chrono::NaiveDateTime;
use log::{debug, info};
use netcdf::AttributeValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "wrfout_d02";

const TIMES_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// A WRF run split over several output files that share one domain.
///
/// Only the mesh, the time axis and the projection are read on open. Variables are read
/// per grid cell on demand.
#[derive(Debug)]
pub struct WrfGrid {
    files: Vec<PathBuf>,
    mesh: Mesh,
    times: Vec<f64>,
    projection: MapProjection,
    variables: HashSet<String>,
}

impl WrfGrid {
    /// Opens every file in `dir` whose name starts with `prefix`.
    pub fn discover(dir: impl AsRef<Path>, prefix: Option<&str>) -> Result<Self, GridError> {
        let dir = dir.as_ref();
        let prefix = prefix.unwrap_or(DEFAULT_PREFIX);
        let entries =
            std::fs::read_dir(dir).map_err(|e| GridError::GridRead(dir.to_path_buf(), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GridError::GridRead(dir.to_path_buf(), e))?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix));
            if matches && entry.path().is_file() {
                files.push(entry.path());
            }
        }
        debug!("Found {} files matching '{}' in {}", files.len(), prefix, dir.display());
        Self::open(files)
    }

    /// Opens the given files, in lexicographic order.
    pub fn open(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Result<Self, GridError> {
        let mut files: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        files.sort();
        let first = files.first().ok_or(GridError::EmptyFileList)?;

        let file = open_file(first)?;
        let mesh = read_mesh(&file, first)?;
        let projection = read_projection(&file)?;
        let variables = file.variables().map(|v| v.name()).collect();
        drop(file);

        let mut times = Vec::new();
        for path in &files {
            let file = open_file(path)?;
            times.extend(read_times(&file, path)?);
        }
        validate_time_axis(&times)?;

        info!(
            "Opened {} model files: {} time steps on a {:?} mesh",
            files.len(),
            times.len(),
            mesh.shape()
        );
        Ok(Self {
            files,
            mesh,
            times,
            projection,
            variables,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl ModelGrid for WrfGrid {
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
        self.variables.contains(name)
    }

    fn read_cell(&self, name: &str, cell: &GridCell) -> Result<Vec<f64>, GridError> {
        let mut series = Vec::with_capacity(self.times.len());
        for path in &self.files {
            let file = open_file(path)?;
            let var = file
                .variable(name)
                .ok_or_else(|| GridError::VariableNotFound(name.to_string()))?;
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let unsupported = || GridError::UnsupportedShape {
                name: name.to_string(),
                shape: shape.clone(),
            };
            let (ny, nx) = self.mesh.shape();
            if shape.len() < 2 || shape[shape.len() - 2..] != [ny, nx] {
                return Err(unsupported());
            }
            let values = match shape.len() {
                3 => var.get_values::<f64, _>((.., cell.j, cell.i)),
                4 => var.get_values::<f64, _>((.., 0, cell.j, cell.i)),
                _ => return Err(unsupported()),
            }
            .map_err(|source| netcdf_error(path, source))?;
            series.extend(values);
        }
        Ok(series)
    }
}

fn open_file(path: &Path) -> Result<netcdf::File, GridError> {
    netcdf::open(path).map_err(|source| netcdf_error(path, source))
}

fn netcdf_error(path: &Path, source: netcdf::Error) -> GridError {
    GridError::Netcdf {
        path: path.to_path_buf(),
        source,
    }
}

/// `XLAT`/`XLONG` of the first time step, `(Time, south_north, west_east)`.
fn read_mesh(file: &netcdf::File, path: &Path) -> Result<Mesh, GridError> {
    let read = |name: &str| -> Result<(Vec<usize>, Vec<f64>), GridError> {
        let var = file
            .variable(name)
            .ok_or_else(|| GridError::VariableNotFound(name.to_string()))?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = match shape.len() {
            2 => var.get_values::<f64, _>(..),
            3 => var.get_values::<f64, _>((0, .., ..)),
            _ => {
                return Err(GridError::UnsupportedShape {
                    name: name.to_string(),
                    shape,
                })
            }
        }
        .map_err(|source| netcdf_error(path, source))?;
        Ok((shape, values))
    };
    let (shape, latitudes) = read("XLAT")?;
    let (_, longitudes) = read("XLONG")?;
    let (ny, nx) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    Mesh::new(ny, nx, latitudes, longitudes)
}

fn read_projection(file: &netcdf::File) -> Result<MapProjection, GridError> {
    let map_proj = global_f64(file, "MAP_PROJ")? as i32;
    let optional = |name: &str| global_f64(file, name).unwrap_or_default();
    MapProjection::from_wrf(
        map_proj,
        optional("TRUELAT1"),
        optional("TRUELAT2"),
        optional("STAND_LON"),
    )
}

fn global_f64(file: &netcdf::File, name: &str) -> Result<f64, GridError> {
    let missing = || GridError::MissingAttribute(name.to_string());
    let value = file
        .attribute(name)
        .ok_or_else(missing)?
        .value()
        .map_err(|_| missing())?;
    attribute_as_f64(value).ok_or_else(missing)
}

fn attribute_as_f64(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Ints(v) => v.first().map(|&v| f64::from(v)),
        AttributeValue::Floats(v) => v.first().map(|&v| f64::from(v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}

/// Epoch seconds of every time step in one file.
fn read_times(file: &netcdf::File, path: &Path) -> Result<Vec<f64>, GridError> {
    if let Some(var) = file.variable("Times") {
        let width = var.dimensions().last().map(|d| d.len()).unwrap_or(0);
        let raw = var
            .get_raw_values(..)
            .map_err(|source| netcdf_error(path, source))?;
        if width == 0 {
            return Ok(Vec::new());
        }
        return raw
            .chunks(width)
            .map(|chunk| parse_times_entry(chunk, path))
            .collect();
    }

    let var = file
        .variable("XTIME")
        .ok_or_else(|| GridError::VariableNotFound("Times".to_string()))?;
    let units = match var.attribute("units").map(|a| a.value()) {
        Some(Ok(AttributeValue::Str(units))) => units,
        _ => return Err(malformed(path, "XTIME has no units attribute")),
    };
    let (scale, origin) = parse_time_units(&units).ok_or_else(|| {
        malformed(path, &format!("unsupported XTIME units '{units}'"))
    })?;
    let offsets = var
        .get_values::<f64, _>(..)
        .map_err(|source| netcdf_error(path, source))?;
    Ok(offsets.into_iter().map(|v| origin + v * scale).collect())
}

fn parse_times_entry(bytes: &[u8], path: &Path) -> Result<f64, GridError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end_matches(['\0', ' ']);
    NaiveDateTime::parse_from_str(text, TIMES_FORMAT)
        .map(|dt| dt.and_utc().timestamp() as f64)
        .map_err(|e| malformed(path, &format!("'{text}': {e}")))
}

/// `"<unit> since YYYY-MM-DD HH:MM:SS"` to seconds per unit and the origin in epoch seconds.
fn parse_time_units(units: &str) -> Option<(f64, f64)> {
    let (unit, origin) = units.split_once(" since ")?;
    let scale = match unit.trim() {
        "seconds" => 1.0,
        "minutes" => 60.0,
        "hours" => 3600.0,
        "days" => 86400.0,
        _ => return None,
    };
    let origin = origin.trim();
    let origin = NaiveDateTime::parse_from_str(origin, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(origin, TIMES_FORMAT))
        .ok()?;
    Some((scale, origin.and_utc().timestamp() as f64))
}

fn malformed(path: &Path, message: &str) -> GridError {
    GridError::MalformedTime {
        source_name: path.display().to_string(),
        message: message.to_string(),
    }
}
