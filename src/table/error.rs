use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Unsupported table format for '{0}', expected .parquet, .pq or .csv")]
    UnsupportedFormat(PathBuf),

    #[error("I/O error writing table file '{0}'")]
    WriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing table file '{0}'")]
    WritePolars(PathBuf, #[source] PolarsError),

    #[error("I/O error reading table file '{0}'")]
    ReadIo(PathBuf, #[source] std::io::Error),
    #[error("Decoding error reading table file '{0}'")]
    ReadPolars(PathBuf, #[source] PolarsError),

    #[error("Batch for station '{station}' has {found} {kind} columns, the table has {expected}")]
    BatchShape {
        station: String,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' of station '{station}' has {found} values for {expected} timestamps")]
    ColumnLength {
        station: String,
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Failed building DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}
