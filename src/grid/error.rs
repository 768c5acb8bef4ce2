use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("No model files to open")]
    EmptyFileList,

    #[error("Failed to read model file '{0}'")]
    GridRead(PathBuf, #[source] std::io::Error),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error in model file '{path}'")]
    Netcdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("Variable '{0}' not found in model output")]
    VariableNotFound(String),

    #[error("Variable '{name}' has unsupported shape {shape:?}, expected (time, y, x) or (time, level, y, x)")]
    UnsupportedShape { name: String, shape: Vec<usize> },

    #[error("Variable '{name}' holds {found} values, its shape {shape:?} needs {expected}")]
    DataLength {
        name: String,
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("Model mesh has no finite latitude/longitude points")]
    EmptyMesh,

    #[error("Mesh latitude ({lats}) and longitude ({lons}) sizes do not match {ny}x{nx}")]
    MeshShape {
        ny: usize,
        nx: usize,
        lats: usize,
        lons: usize,
    },

    #[error("Malformed time coordinate in '{source_name}': {message}")]
    MalformedTime {
        source_name: String,
        message: String,
    },

    #[error("Model time axis is not strictly increasing at step {index} ({previous} -> {current})")]
    NonMonotonicTime {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Series for '{name}' has {found} steps, the model time axis has {expected}")]
    SeriesLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Required global attribute '{0}' is missing")]
    MissingAttribute(String),

    #[error("Map projection code {0} is not supported")]
    UnsupportedProjection(i32),
}
