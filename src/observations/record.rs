//! Serde model of a MesoWest time-series response.
//!
//! Only the parts the matcher reads are typed. Numeric fields arrive as numbers or strings
//! depending on the endpoint, so they are kept as [`NumberOrText`] and parsed per station,
//! where a bad value can be reported against the station that carries it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The whole response document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(rename = "STATION")]
    pub stations: Vec<StationEntry>,
    #[serde(rename = "SUMMARY", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ResponseSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResponseSummary {
    #[serde(default)]
    pub response_code: Option<NumberOrText>,
    #[serde(default)]
    pub response_message: Option<String>,
    #[serde(default)]
    pub number_of_objects: Option<NumberOrText>,
}

/// One entry of the `STATION` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StationEntry {
    #[serde(default)]
    pub stid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mnet_id: Option<NumberOrText>,
    #[serde(default)]
    pub latitude: Option<NumberOrText>,
    #[serde(default)]
    pub longitude: Option<NumberOrText>,
    #[serde(default)]
    pub elevation: Option<NumberOrText>,
    /// Variable name to its sets, e.g. `"air_temp": {"air_temp_set_1": {...}}`. Key order
    /// is the document order.
    #[serde(default)]
    pub sensor_variables: Map<String, Value>,
    #[serde(default)]
    pub observations: Observations,
}

/// The `OBSERVATIONS` block: `date_time` plus one list per verbose set name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observations {
    #[serde(default)]
    pub date_time: Vec<String>,
    #[serde(flatten)]
    pub series: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// The value as a finite float, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumberOrText::Number(v) => *v,
            NumberOrText::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl StationEntry {
    /// The first verbose set name listed for `variable`, e.g. `air_temp_set_1`.
    pub fn primary_set(&self, variable: &str) -> Option<&str> {
        self.sensor_variables
            .get(variable)?
            .as_object()?
            .keys()
            .next()
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn numbers_or_text() {
        assert_eq!(NumberOrText::Number(40.5).as_f64(), Some(40.5));
        assert_eq!(NumberOrText::Text(" -111.9 ".into()).as_f64(), Some(-111.9));
        assert_eq!(NumberOrText::Text("n/a".into()).as_f64(), None);
        assert_eq!(NumberOrText::Text("NaN".into()).as_f64(), None);
    }

    #[test]
    fn primary_set_keeps_document_order() -> Result<(), Box<dyn Error>> {
        let entry: StationEntry = serde_json::from_str(
            r#"{
                "STID": "WBB",
                "SENSOR_VARIABLES": {
                    "air_temp": {"air_temp_set_2": {}, "air_temp_set_1": {}}
                },
                "OBSERVATIONS": {"date_time": [], "air_temp_set_2": []}
            }"#,
        )?;
        assert_eq!(entry.primary_set("air_temp"), Some("air_temp_set_2"));
        assert_eq!(entry.primary_set("wind_speed"), None);
        assert!(entry.observations.series.contains_key("air_temp_set_2"));
        Ok(())
    }
}
