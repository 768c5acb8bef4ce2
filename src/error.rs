use crate::config::ConfigError;
use crate::grid::error::GridError;
use crate::observations::error::StationError;
use crate::table::error::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Station(#[from] StationError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
