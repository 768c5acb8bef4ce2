//! Run configuration: the network allow-list, the variable table and the resampling bound.

use crate::resample::NearestLowerBound;
use crate::table::IDENTITY_COLUMNS;
use crate::types::variable::VariableTable;
use bon::bon;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// MesoWest network ids accepted by default (NWS/FAA, RAWS, UDOT, ... and UUNET).
pub const DEFAULT_NETWORKS: [i64; 5] = [1, 2, 4, 9, 153];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Variable '{0}' is listed more than once")]
    DuplicateVariable(String),

    #[error("Column '{0}' would appear more than once in the output table")]
    DuplicateColumn(String),
}

/// Everything that shapes a matching run. Built once, then only read.
///
/// Fields omitted from a JSON config file take the values of [`MatchConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    allowed_networks: Vec<i64>,
    variables: VariableTable,
    nearest_lower_bound: NearestLowerBound,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            allowed_networks: DEFAULT_NETWORKS.to_vec(),
            variables: VariableTable::default(),
            nearest_lower_bound: NearestLowerBound::default(),
        }
    }
}

#[bon]
impl MatchConfig {
    /// Builds a validated config; anything not set falls back to the default.
    ///
    /// ```
    /// use mesomatch::{MatchConfig, NearestLowerBound};
    ///
    /// let config = MatchConfig::builder()
    ///     .allowed_networks(vec![1, 153])
    ///     .nearest_lower_bound(NearestLowerBound::FirstStep)
    ///     .build()?;
    /// assert_eq!(config.allowed_networks(), &[1, 153]);
    /// # Ok::<(), mesomatch::ConfigError>(())
    /// ```
    #[builder(finish_fn = build)]
    pub fn new(
        allowed_networks: Option<Vec<i64>>,
        variables: Option<VariableTable>,
        nearest_lower_bound: Option<NearestLowerBound>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            allowed_networks: allowed_networks.unwrap_or_else(|| DEFAULT_NETWORKS.to_vec()),
            variables: variables.unwrap_or_default(),
            nearest_lower_bound: nearest_lower_bound.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// A copy of this config with a different network allow-list.
    pub fn with_allowed_networks(&self, networks: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed_networks: networks.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Observed and model names must be unique and must not shadow the identity columns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut observed = HashSet::new();
        for name in self.variables.observed_names() {
            if !observed.insert(name) {
                return Err(ConfigError::DuplicateVariable(name.to_string()));
            }
        }
        let mut columns: HashSet<&str> = IDENTITY_COLUMNS.into_iter().collect();
        let names = self
            .variables
            .observed_names()
            .chain(self.variables.model_names());
        for name in names {
            if !columns.insert(name) {
                return Err(ConfigError::DuplicateColumn(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn allowed_networks(&self) -> &[i64] {
        &self.allowed_networks
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn nearest_lower_bound(&self) -> NearestLowerBound {
        self.nearest_lower_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::variable::VariableSpec;
    use std::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.allowed_networks(), &[1, 2, 4, 9, 153]);
        assert_eq!(config.variables().len(), 5);
        assert_eq!(config.nearest_lower_bound(), NearestLowerBound::SecondStep);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() -> Result<(), Box<dyn Error>> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"allowed_networks": [1], "nearest_lower_bound": "first_step"}}"#)?;
        let config = MatchConfig::from_json_file(file.path())?;
        assert_eq!(config.allowed_networks(), &[1]);
        assert_eq!(config.nearest_lower_bound(), NearestLowerBound::FirstStep);
        assert_eq!(config.variables(), &VariableTable::default());
        Ok(())
    }

    #[test]
    fn bad_files() -> Result<(), Box<dyn Error>> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{{not json")?;
        assert!(matches!(
            MatchConfig::from_json_file(file.path()),
            Err(ConfigError::Parse(..))
        ));
        assert!(matches!(
            MatchConfig::from_json_file("/nonexistent/config.json"),
            Err(ConfigError::Read(..))
        ));
        Ok(())
    }

    #[test]
    fn builder_validates_names() {
        let duplicated = VariableTable::new(vec![
            VariableSpec::new("air_temp", "T2"),
            VariableSpec::observation_only("air_temp"),
        ]);
        assert!(matches!(
            MatchConfig::builder().variables(duplicated).build(),
            Err(ConfigError::DuplicateVariable(name)) if name == "air_temp"
        ));

        let shadowing = VariableTable::new(vec![VariableSpec::new("temperature", "lat")]);
        assert!(matches!(
            MatchConfig::builder().variables(shadowing).build(),
            Err(ConfigError::DuplicateColumn(name)) if name == "lat"
        ));
    }

    #[test]
    fn override_networks() -> Result<(), ConfigError> {
        let config = MatchConfig::builder().build()?.with_allowed_networks([2, 4]);
        assert_eq!(config.allowed_networks(), &[2, 4]);
        assert_eq!(config.variables(), &VariableTable::default());
        Ok(())
    }
}
