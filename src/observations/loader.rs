use crate::observations::error::StationError;
use crate::observations::record::{NumberOrText, ObservationRecord, StationEntry};
use crate::types::station::{Location, SensorSeries, Station, StationSource};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::path::Path;

/// Timestamp layout of `OBSERVATIONS.date_time` when requested with `obtimezone=UTC` and
/// a custom time format.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H%M%S";

/// Reads and parses a MesoWest JSON response from disk.
pub fn read_record(path: impl AsRef<Path>) -> Result<ObservationRecord, StationError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| StationError::Io(path.to_path_buf(), e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn parse_record(json: &str) -> Result<ObservationRecord, StationError> {
    Ok(serde_json::from_str(json)?)
}

/// Turns each `STATION` entry into a [`PendingStation`], lazily and in document order.
///
/// Only identity, network and location are parsed here. Timestamps and values are parsed
/// by [`StationSource::into_station`], after the station has passed the filters.
pub fn load_stations(
    record: &ObservationRecord,
) -> impl Iterator<Item = Result<PendingStation<'_>, StationError>> + '_ {
    if let Some(summary) = &record.summary {
        info!(
            "Observation record: response code {}, {}",
            summary
                .response_code
                .as_ref()
                .and_then(NumberOrText::as_f64)
                .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            summary.response_message.as_deref().unwrap_or("no message")
        );
    }
    record.stations.iter().map(parse_header)
}

/// A station entry with its identity and location parsed and its series left untouched.
#[derive(Debug, Clone)]
pub struct PendingStation<'a> {
    pub id: String,
    pub name: String,
    pub network_id: i64,
    pub location: Location,
    entry: &'a StationEntry,
}

impl StationSource for PendingStation<'_> {
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
        let PendingStation {
            id,
            name,
            network_id,
            location,
            entry,
        } = self;
        let times = entry
            .observations
            .date_time
            .iter()
            .map(|value| {
                parse_timestamp(value).ok_or_else(|| StationError::MalformedTimestamp {
                    station: id.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let variables = parse_series(&id, entry, times.len())?;
        Ok(Station {
            id,
            name,
            network_id,
            location,
            times,
            variables,
        })
    }
}

/// Parses identity, network id and location of one entry.
pub fn parse_header(entry: &StationEntry) -> Result<PendingStation<'_>, StationError> {
    let id = entry.stid.clone().unwrap_or_default();
    let malformed = |field: &str| StationError::MalformedStation {
        station: id.clone(),
        field: field.to_string(),
    };
    if id.is_empty() {
        return Err(malformed("STID"));
    }

    let number = |value: &Option<NumberOrText>, field: &str| {
        value
            .as_ref()
            .and_then(NumberOrText::as_f64)
            .ok_or_else(|| malformed(field))
    };
    let latitude = number(&entry.latitude, "LATITUDE")?;
    let longitude = number(&entry.longitude, "LONGITUDE")?;
    let network = number(&entry.mnet_id, "MNET_ID")?;
    if network.fract() != 0.0 {
        warn!("Station {id}: fractional network id {network} truncated to {}", network.trunc());
    }
    let elevation = entry.elevation.as_ref().and_then(NumberOrText::as_f64);

    Ok(PendingStation {
        name: entry.name.clone().unwrap_or_else(|| id.clone()),
        id,
        network_id: network.trunc() as i64,
        location: Location {
            latitude,
            longitude,
            elevation,
        },
        entry,
    })
}

/// Parses a whole entry, series included.
pub fn parse_station(entry: &StationEntry) -> Result<Station, StationError> {
    parse_header(entry)?.into_station()
}

fn parse_series(
    id: &str,
    entry: &StationEntry,
    len: usize,
) -> Result<Vec<SensorSeries>, StationError> {
    let mut variables = Vec::new();
    for name in entry.sensor_variables.keys() {
        if name == "date_time" {
            continue;
        }
        let Some(set) = entry.primary_set(name) else {
            debug!("Station {id}: no sensor set listed for '{name}'");
            continue;
        };
        let Some(raw) = entry.observations.series.get(set) else {
            warn!("Station {id}: '{set}' is listed for '{name}' but has no observations");
            continue;
        };
        let Some(raw) = raw.as_array() else {
            return Err(StationError::MalformedStation {
                station: id.to_string(),
                field: set.to_string(),
            });
        };
        let mut values: Vec<Option<f64>> = raw.iter().map(parse_value).collect();
        if values.len() != len {
            warn!("Station {id}: '{set}' has {} values for {len} timestamps", values.len());
            values.resize(len, None);
        }
        variables.push(SensorSeries {
            name: name.clone(),
            set: set.to_string(),
            values,
        });
    }
    Ok(variables)
}

/// Parses `YYYYMMDD HHMMSS` (UTC) or an RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// A single observation value; nulls, text and non-finite numbers are missing.
pub fn parse_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::error::Error;

    const RECORD: &str = r#"{
        "SUMMARY": {"RESPONSE_CODE": 1, "RESPONSE_MESSAGE": "OK", "NUMBER_OF_OBJECTS": 2},
        "STATION": [
            {
                "STID": "WBB",
                "NAME": "U of U William Browning Building",
                "MNET_ID": "153",
                "LATITUDE": "40.76623",
                "LONGITUDE": "-111.84755",
                "ELEVATION": "4806",
                "SENSOR_VARIABLES": {
                    "date_time": {"date_time": {}},
                    "air_temp": {"air_temp_set_1": {"position": "2.0"}},
                    "wind_direction": {"wind_direction_set_1": {}},
                    "pressure": {"pressure_set_1d": {"derived_from": []}}
                },
                "OBSERVATIONS": {
                    "date_time": ["20180920 000000", "20180920 000100", "20180920 000200"],
                    "air_temp_set_1": [21.5, null, "22.1"],
                    "wind_direction_set_1": [180.0, 190.0],
                    "pressure_set_1d": [86000.0, "", 86010.0]
                }
            },
            {
                "STID": "KSLC",
                "NAME": "Salt Lake City International Airport",
                "MNET_ID": 1,
                "LATITUDE": 40.77069,
                "LONGITUDE": -111.96503,
                "SENSOR_VARIABLES": {},
                "OBSERVATIONS": {"date_time": ["2018-09-20T00:00:00Z"]}
            }
        ]
    }"#;

    #[test]
    fn loads_stations_in_order() -> Result<(), Box<dyn Error>> {
        let record = parse_record(RECORD)?;
        let stations = load_stations(&record)
            .map(|pending| pending?.into_station())
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(stations.len(), 2);

        let wbb = &stations[0];
        assert_eq!(wbb.id, "WBB");
        assert_eq!(wbb.network_id, 153);
        assert_eq!(wbb.location.latitude, 40.76623);
        assert_eq!(wbb.location.elevation, Some(4806.0));
        assert_eq!(
            wbb.times[1],
            Utc.with_ymd_and_hms(2018, 9, 20, 0, 1, 0).unwrap()
        );
        let names: Vec<&str> = wbb.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["air_temp", "wind_direction", "pressure"]);

        let kslc = &stations[1];
        assert_eq!(kslc.network_id, 1);
        assert!(kslc.variables.is_empty());
        assert_eq!(kslc.observation_seconds(), vec![1_537_401_600.0]);
        Ok(())
    }

    #[test]
    fn unparseable_values_become_missing() -> Result<(), Box<dyn Error>> {
        let record = parse_record(RECORD)?;
        let wbb = parse_station(&record.stations[0])?;
        let air_temp = wbb.variable("air_temp").unwrap();
        assert_eq!(air_temp.set, "air_temp_set_1");
        assert_eq!(air_temp.values, vec![Some(21.5), None, Some(22.1)]);
        assert_eq!(
            wbb.variable("pressure").unwrap().values,
            vec![Some(86000.0), None, Some(86010.0)]
        );
        Ok(())
    }

    #[test]
    fn short_series_are_padded() -> Result<(), Box<dyn Error>> {
        let record = parse_record(RECORD)?;
        let wbb = parse_station(&record.stations[0])?;
        assert_eq!(
            wbb.variable("wind_direction").unwrap().values,
            vec![Some(180.0), Some(190.0), None]
        );
        Ok(())
    }

    #[test]
    fn malformed_location_is_an_error() -> Result<(), Box<dyn Error>> {
        let mut record = parse_record(RECORD)?;
        record.stations[0].latitude = Some(NumberOrText::Text("north".into()));
        let mut stations = load_stations(&record);
        assert!(matches!(
            stations.next(),
            Some(Err(StationError::MalformedStation { ref field, .. })) if field == "LATITUDE"
        ));
        assert!(stations.next().is_some_and(|s| s.is_ok()));
        Ok(())
    }

    #[test]
    fn fractional_network_id_is_truncated() -> Result<(), Box<dyn Error>> {
        let mut record = parse_record(RECORD)?;
        record.stations[1].mnet_id = Some(NumberOrText::Number(2.7));
        assert_eq!(parse_station(&record.stations[1])?.network_id, 2);
        record.stations[1].mnet_id = None;
        assert!(parse_station(&record.stations[1]).is_err());
        Ok(())
    }

    #[test]
    fn timestamps() {
        let expected = Utc.with_ymd_and_hms(2018, 9, 20, 13, 5, 9).unwrap();
        assert_eq!(parse_timestamp("20180920 130509"), Some(expected));
        assert_eq!(parse_timestamp("2018-09-20T13:05:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2018-09-20T15:05:09+02:00"), Some(expected));
        assert_eq!(parse_timestamp("20/09/2018"), None);
    }

    #[test]
    fn malformed_timestamp_is_an_error() -> Result<(), Box<dyn Error>> {
        let mut record = parse_record(RECORD)?;
        record.stations[1].observations.date_time = vec!["yesterday".into()];
        assert!(matches!(
            parse_station(&record.stations[1]),
            Err(StationError::MalformedTimestamp { ref value, .. }) if value == "yesterday"
        ));
        Ok(())
    }

    #[test]
    fn timestamps_are_parsed_after_the_header() -> Result<(), Box<dyn Error>> {
        let mut record = parse_record(RECORD)?;
        record.stations[0].observations.date_time = vec!["2018-09-20 00:00".into()];
        let pending = parse_header(&record.stations[0])?;
        assert_eq!(pending.id(), "WBB");
        assert_eq!(pending.network_id(), 153);
        assert!(matches!(
            pending.into_station(),
            Err(StationError::MalformedTimestamp { ref station, .. }) if station == "WBB"
        ));
        Ok(())
    }

    #[test]
    fn values() {
        assert_eq!(parse_value(&json!(1.5)), Some(1.5));
        assert_eq!(parse_value(&json!("2")), Some(2.0));
        assert_eq!(parse_value(&json!(null)), None);
        assert_eq!(parse_value(&json!("M")), None);
        assert_eq!(parse_value(&json!(true)), None);
    }

    #[test]
    fn broken_document_is_fatal() {
        assert!(matches!(
            parse_record(r#"{"STATIONS": []}"#),
            Err(StationError::RecordParse(_))
        ));
        assert!(matches!(
            read_record("/nonexistent/observations.json"),
            Err(StationError::Io(..))
        ));
    }
}
