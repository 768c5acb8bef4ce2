//! The matched output table: per-station batches, their concatenation into a polars
//! `DataFrame`, persistence and lazy queries on the result.

pub mod error;
pub mod frame;
pub mod io;

use crate::table::error::TableError;
use crate::types::variable::VariableTable;
use chrono::{DateTime, Utc};
use polars::prelude::*;

pub const TIME_COLUMN: &str = "times";
pub const STATION_COLUMN: &str = "statID";
pub const NETWORK_COLUMN: &str = "netID";
pub const LATITUDE_COLUMN: &str = "lat";
pub const LONGITUDE_COLUMN: &str = "lon";

/// Leading columns of every output table, in order.
pub const IDENTITY_COLUMNS: [&str; 5] = [
    TIME_COLUMN,
    STATION_COLUMN,
    NETWORK_COLUMN,
    LATITUDE_COLUMN,
    LONGITUDE_COLUMN,
];

/// The fixed column set of a run: identity columns, then one column per observed variable,
/// then one per model variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    observed: Vec<String>,
    model: Vec<String>,
}

impl TableSchema {
    pub fn new(observed: Vec<String>, model: Vec<String>) -> Self {
        Self { observed, model }
    }

    pub fn from_variables(variables: &VariableTable) -> Self {
        Self {
            observed: variables.observed_names().map(str::to_string).collect(),
            model: variables.model_names().map(str::to_string).collect(),
        }
    }

    pub fn observed(&self) -> &[String] {
        &self.observed
    }

    pub fn model(&self) -> &[String] {
        &self.model
    }

    pub fn column_names(&self) -> Vec<&str> {
        IDENTITY_COLUMNS
            .into_iter()
            .chain(self.observed.iter().map(String::as_str))
            .chain(self.model.iter().map(String::as_str))
            .collect()
    }

    pub fn observed_index(&self, name: &str) -> Option<usize> {
        self.observed.iter().position(|n| n == name)
    }

    pub fn model_index(&self, name: &str) -> Option<usize> {
        self.model.iter().position(|n| n == name)
    }
}

/// One output row: a station at one observation time.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow {
    pub time: DateTime<Utc>,
    pub station_id: String,
    pub network_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Aligned with [`TableSchema::observed`].
    pub observed: Vec<Option<f64>>,
    /// Aligned with [`TableSchema::model`].
    pub model: Vec<Option<f64>>,
}

/// All rows of one station, stored column-wise.
///
/// Every column is present even when the station did not report the variable; such
/// columns hold only `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationBatch {
    pub station_id: String,
    pub network_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub times: Vec<DateTime<Utc>>,
    pub observed: Vec<Vec<Option<f64>>>,
    pub model: Vec<Vec<Option<f64>>>,
}

impl StationBatch {
    /// An all-missing batch for `times`, shaped after `schema`.
    pub fn empty(
        schema: &TableSchema,
        station_id: impl Into<String>,
        network_id: i64,
        latitude: f64,
        longitude: f64,
        times: Vec<DateTime<Utc>>,
    ) -> Self {
        let n = times.len();
        Self {
            station_id: station_id.into(),
            network_id,
            latitude,
            longitude,
            observed: vec![vec![None; n]; schema.observed.len()],
            model: vec![vec![None; n]; schema.model.len()],
            times,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = MatchedRow> + '_ {
        self.times.iter().enumerate().map(move |(k, &time)| MatchedRow {
            time,
            station_id: self.station_id.clone(),
            network_id: self.network_id,
            latitude: self.latitude,
            longitude: self.longitude,
            observed: self.observed.iter().map(|column| column[k]).collect(),
            model: self.model.iter().map(|column| column[k]).collect(),
        })
    }

    fn check(&self, schema: &TableSchema) -> Result<(), TableError> {
        let shape_error = |kind, expected, found| TableError::BatchShape {
            station: self.station_id.clone(),
            kind,
            expected,
            found,
        };
        if self.observed.len() != schema.observed.len() {
            return Err(shape_error("observed", schema.observed.len(), self.observed.len()));
        }
        if self.model.len() != schema.model.len() {
            return Err(shape_error("model", schema.model.len(), self.model.len()));
        }
        let names = schema.observed.iter().chain(&schema.model);
        for (name, column) in names.zip(self.observed.iter().chain(&self.model)) {
            if column.len() != self.len() {
                return Err(TableError::ColumnLength {
                    station: self.station_id.clone(),
                    column: name.clone(),
                    expected: self.len(),
                    found: column.len(),
                });
            }
        }
        Ok(())
    }
}

/// The append-only result of a run: station batches in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedTable {
    schema: TableSchema,
    batches: Vec<StationBatch>,
}

impl MatchedTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    /// Appends a station's rows after checking them against the schema.
    pub fn push(&mut self, batch: StationBatch) -> Result<(), TableError> {
        batch.check(&self.schema)?;
        self.batches.push(batch);
        Ok(())
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn batches(&self) -> &[StationBatch] {
        &self.batches
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.batches.iter().map(StationBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = MatchedRow> + '_ {
        self.batches.iter().flat_map(StationBatch::rows)
    }

    /// Concatenates all batches into one frame with the schema's column order.
    pub fn to_dataframe(&self) -> Result<DataFrame, TableError> {
        let rows = self.len();
        let mut millis = Vec::with_capacity(rows);
        let mut stations = Vec::with_capacity(rows);
        let mut networks = Vec::with_capacity(rows);
        let mut lats = Vec::with_capacity(rows);
        let mut lons = Vec::with_capacity(rows);
        let mut observed = vec![Vec::with_capacity(rows); self.schema.observed.len()];
        let mut model = vec![Vec::with_capacity(rows); self.schema.model.len()];

        for batch in &self.batches {
            let n = batch.len();
            millis.extend(batch.times.iter().map(DateTime::timestamp_millis));
            stations.extend(std::iter::repeat(batch.station_id.as_str()).take(n));
            networks.extend(std::iter::repeat(batch.network_id).take(n));
            lats.extend(std::iter::repeat(batch.latitude).take(n));
            lons.extend(std::iter::repeat(batch.longitude).take(n));
            for (out, column) in observed.iter_mut().zip(&batch.observed) {
                out.extend_from_slice(column);
            }
            for (out, column) in model.iter_mut().zip(&batch.model) {
                out.extend_from_slice(column);
            }
        }

        let times = Series::new(TIME_COLUMN.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let mut columns: Vec<Column> = vec![
            times.into(),
            Series::new(STATION_COLUMN.into(), stations).into(),
            Series::new(NETWORK_COLUMN.into(), networks).into(),
            Series::new(LATITUDE_COLUMN.into(), lats).into(),
            Series::new(LONGITUDE_COLUMN.into(), lons).into(),
        ];
        let names = self.schema.observed.iter().chain(&self.schema.model);
        for (name, values) in names.zip(observed.into_iter().chain(model)) {
            columns.push(Series::new(name.as_str().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}
