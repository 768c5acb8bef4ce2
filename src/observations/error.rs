use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationError {
    #[error("Failed to read observation file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse observation record")]
    RecordParse(#[from] serde_json::Error),

    #[error("Station '{station}' has a missing or malformed '{field}'")]
    MalformedStation { station: String, field: String },

    #[error("Station '{station}' has malformed timestamp '{value}'")]
    MalformedTimestamp { station: String, value: String },
}
