//! The observation-to-model variable table: which station variables are kept, which model
//! field each one is compared against, how model values are converted and how they are
//! brought onto the observation times.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversion applied to model values before resampling, so they share the observation's
/// units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitConversion {
    /// Values are used as read.
    #[default]
    None,
    /// Kelvin to degrees Celsius (`value - 273.15`).
    KelvinToCelsius,
    /// `value * scale + offset`.
    Linear { scale: f64, offset: f64 },
}

impl UnitConversion {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            UnitConversion::None => value,
            UnitConversion::KelvinToCelsius => value - 273.15,
            UnitConversion::Linear { scale, offset } => value * scale + offset,
        }
    }
}

/// How a model series is resampled onto observation times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Piecewise-linear in time. Used for scalar quantities.
    #[default]
    Linear,
    /// Value of the closest model step. Used for circular quantities such as wind
    /// direction, where averaging two angles is meaningless.
    Nearest,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Linear => write!(f, "linear"),
            Interpolation::Nearest => write!(f, "nearest"),
        }
    }
}

/// One row of the variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Station variable name as it appears under `SENSOR_VARIABLES`.
    pub observed: String,
    /// Model field compared against it. `None` keeps the observation column only.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub conversion: UnitConversion,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl VariableSpec {
    pub fn new(observed: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            observed: observed.into(),
            model: Some(model.into()),
            conversion: UnitConversion::None,
            interpolation: Interpolation::Linear,
        }
    }

    /// A variable that is copied into the table without a model counterpart.
    pub fn observation_only(observed: impl Into<String>) -> Self {
        Self {
            observed: observed.into(),
            model: None,
            conversion: UnitConversion::None,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn with_conversion(mut self, conversion: UnitConversion) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// Ordered list of [`VariableSpec`]s. The order fixes the order of the output columns.
///
/// Station variables missing from the table are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableTable(Vec<VariableSpec>);

impl VariableTable {
    pub fn new(specs: Vec<VariableSpec>) -> Self {
        Self(specs)
    }

    pub fn get(&self, observed: &str) -> Option<&VariableSpec> {
        self.0.iter().find(|spec| spec.observed == observed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSpec> {
        self.0.iter()
    }

    pub fn observed_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|spec| spec.observed.as_str())
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|spec| spec.model.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The five surface variables compared against WRF(-SFIRE-CHEM) output.
impl Default for VariableTable {
    fn default() -> Self {
        Self(vec![
            VariableSpec::new("air_temp", "T2").with_conversion(UnitConversion::KelvinToCelsius),
            VariableSpec::new("wind_speed", "uvmet10_wspd"),
            VariableSpec::new("wind_direction", "uvmet10_wdir")
                .with_interpolation(Interpolation::Nearest),
            VariableSpec::new("relative_humidity", "rh2"),
            VariableSpec::new("PM_25_concentration", "PM2_5_DRY"),
        ])
    }
}
