//! Matches MesoWest surface-station observations to WRF model output.
//!
//! Stations are read from a MesoWest time-series JSON response, filtered to the model
//! domain and a network allow-list, and for every station the model series at the nearest
//! grid cell is resampled onto the observation times. The result is one row per station
//! and observation time, written once as a polars `DataFrame`.

mod config;
mod error;
mod filtering;
mod grid;
mod matcher;
mod observations;
mod resample;
mod table;
mod types;

pub use config::{ConfigError, MatchConfig, DEFAULT_NETWORKS};
pub use error::MatchError;
pub use filtering::{in_allowed_network, in_domain, FilterDecision, StationFilter};
pub use matcher::{MatchOutput, MatchSummary, StationMatch, StationMatcher};
pub use resample::{interp_linear, interp_nearest, linear_interpolate, resample, NearestLowerBound};

pub use grid::diagnostics::{
    relative_humidity, wind_direction, wind_speed, Diagnostic, MapProjection,
};
pub use grid::error::GridError;
pub use grid::{GridCell, MemoryGrid, Mesh, ModelGrid};
#[cfg(feature = "netcdf")]
pub use grid::{wrf::DEFAULT_PREFIX, WrfGrid};

pub use observations::error::StationError;
pub use observations::loader::{
    load_stations, parse_header, parse_record, parse_station, parse_timestamp, parse_value,
    read_record, PendingStation, TIMESTAMP_FORMAT,
};
pub use observations::record::{
    NumberOrText, ObservationRecord, Observations, ResponseSummary, StationEntry,
};

pub use table::error::TableError;
pub use table::frame::MatchedLazyFrame;
pub use table::io::{read_table, scan_table, write_table, TableFormat};
pub use table::{
    MatchedRow, MatchedTable, StationBatch, TableSchema, IDENTITY_COLUMNS, LATITUDE_COLUMN,
    LONGITUDE_COLUMN, NETWORK_COLUMN, STATION_COLUMN, TIME_COLUMN,
};

pub use types::bounding_box::BoundingBox;
pub use types::station::{Location, SensorSeries, Station, StationSource};
pub use types::variable::{Interpolation, UnitConversion, VariableSpec, VariableTable};
