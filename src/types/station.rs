//! Defines the data structures representing a surface weather station as parsed from a
//! MesoWest/Synoptic time-series response: identity, network, location and the sensor
//! series it reported.

use crate::observations::error::StationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single surface station and everything it reported for the requested period.
///
/// A `Station` is built once from one entry of the observation record and is not
/// modified afterwards. All sensor series share the station's `times` axis.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The short station identifier (MesoWest `STID`, e.g. "WBB").
    pub id: String,
    /// Human readable station name.
    pub name: String,
    /// MesoWest network identifier (`MNET_ID`), truncated to an integer.
    pub network_id: i64,
    /// Geographical location of the station.
    pub location: Location,
    /// Observation timestamps (UTC), shared by every series in `variables`.
    pub times: Vec<DateTime<Utc>>,
    /// Sensor series in the order the record lists them.
    pub variables: Vec<SensorSeries>,
}

/// Represents the geographical location of a weather station.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
    /// Elevation as reported by the network, if available.
    pub elevation: Option<f64>,
}

/// One sensor variable of a station, e.g. `air_temp`, with its values aligned to
/// [`Station::times`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SensorSeries {
    /// The canonical variable name (`air_temp`, `wind_speed`, ...).
    pub name: String,
    /// The verbose key the values were read from (`air_temp_set_1`).
    pub set: String,
    /// One entry per timestamp; `None` marks a missing or unparseable reading.
    pub values: Vec<Option<f64>>,
}

/// Something that can be filtered by identity and position before its series are needed.
///
/// Implemented by a fully parsed [`Station`] and by a station entry whose timestamps and
/// values are still unparsed, so that rejected stations never reach series parsing.
pub trait StationSource {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn network_id(&self) -> i64;
    fn location(&self) -> &Location;

    /// Parses whatever is still pending.
    fn into_station(self) -> Result<Station, StationError>;
}

impl StationSource for Station {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn network_id(&self) -> i64 {
        self.network_id
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn into_station(self) -> Result<Station, StationError> {
        Ok(self)
    }
}

impl Station {
    /// Looks up a sensor series by its canonical variable name.
    pub fn variable(&self, name: &str) -> Option<&SensorSeries> {
        self.variables.iter().find(|series| series.name == name)
    }

    /// Observation times as seconds since the Unix epoch, the axis used for resampling.
    pub fn observation_seconds(&self) -> Vec<f64> {
        self.times
            .iter()
            .map(|t| t.timestamp() as f64 + f64::from(t.timestamp_subsec_millis()) / 1000.0)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn station() -> Station {
        Station {
            id: "WBB".to_string(),
            name: "U of U William Browning Building".to_string(),
            network_id: 153,
            location: Location {
                latitude: 40.76623,
                longitude: -111.84755,
                elevation: Some(4806.0),
            },
            times: vec![
                Utc.with_ymd_and_hms(2018, 9, 20, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2018, 9, 20, 0, 1, 0).unwrap(),
            ],
            variables: vec![SensorSeries {
                name: "air_temp".to_string(),
                set: "air_temp_set_1".to_string(),
                values: vec![Some(21.5), None],
            }],
        }
    }

    #[test]
    fn observation_seconds_are_epoch_based() {
        let s = station();
        assert_eq!(s.observation_seconds(), vec![1_537_401_600.0, 1_537_401_660.0]);
    }

    #[test]
    fn variable_lookup_by_name() {
        let s = station();
        assert_eq!(s.variable("air_temp").map(|v| v.set.as_str()), Some("air_temp_set_1"));
        assert!(s.variable("wind_speed").is_none());
        assert_eq!(s.len(), 2);
    }
}
