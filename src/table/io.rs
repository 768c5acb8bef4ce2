//! Writing and reading matched tables. Parquet is the native format; CSV is offered for
//! tools that cannot read Parquet.

use crate::table::error::TableError;
use crate::table::frame::MatchedLazyFrame;
use crate::table::{NETWORK_COLUMN, STATION_COLUMN, TIME_COLUMN};
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Csv,
}

impl TableFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("parquet" | "pq") => Ok(TableFormat::Parquet),
            Some("csv") => Ok(TableFormat::Csv),
            _ => Err(TableError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Writes `df` to `path` in the format implied by its extension.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), TableError> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    let mut file = File::create(path).map_err(|e| TableError::WriteIo(path.to_path_buf(), e))?;
    match format {
        TableFormat::Parquet => ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(df)
            .map(|_| ()),
        TableFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df),
    }
    .map_err(|e| TableError::WritePolars(path.to_path_buf(), e))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Reads a table written by [`write_table`].
///
/// CSV carries no types, so `times`, `statID` and `netID` are cast back to their output
/// types and every other column to `Float64`.
pub fn read_table(path: impl AsRef<Path>) -> Result<DataFrame, TableError> {
    let path = path.as_ref();
    match TableFormat::from_path(path)? {
        TableFormat::Parquet => {
            let file = File::open(path).map_err(|e| TableError::ReadIo(path.to_path_buf(), e))?;
            ParquetReader::new(file)
                .finish()
                .map_err(|e| TableError::ReadPolars(path.to_path_buf(), e))
        }
        TableFormat::Csv => read_csv(path),
    }
}

/// Lazily opens a table written by [`write_table`].
pub fn scan_table(path: impl AsRef<Path>) -> Result<MatchedLazyFrame, TableError> {
    let path = path.as_ref();
    let frame = match TableFormat::from_path(path)? {
        TableFormat::Parquet => LazyFrame::scan_parquet(path, Default::default())
            .map_err(|e| TableError::ReadPolars(path.to_path_buf(), e))?,
        TableFormat::Csv => read_csv(path)?.lazy(),
    };
    Ok(MatchedLazyFrame::new(frame))
}

fn read_csv(path: &Path) -> Result<DataFrame, TableError> {
    let polars_error = |e| TableError::ReadPolars(path.to_path_buf(), e);
    let overwrite = Schema::from_iter([Field::new(STATION_COLUMN.into(), DataType::String)]);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(overwrite)))
        .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(polars_error)?
        .finish()
        .map_err(polars_error)?;

    let casts: Vec<Expr> = df
        .get_column_names()
        .into_iter()
        .map(|name| {
            let dtype = match name.as_str() {
                TIME_COLUMN => DataType::Datetime(TimeUnit::Milliseconds, None),
                STATION_COLUMN => DataType::String,
                NETWORK_COLUMN => DataType::Int64,
                _ => DataType::Float64,
            };
            col(name.clone()).cast(dtype)
        })
        .collect();
    df.lazy().with_columns(casts).collect().map_err(polars_error)
}
