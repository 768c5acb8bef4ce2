//! Drives a run: filters stations, extracts model series at each station's grid cell,
//! resamples them onto the observation times and collects the rows.

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::filtering::{FilterDecision, StationFilter};
use crate::grid::error::GridError;
use crate::grid::ModelGrid;
use crate::observations::error::StationError;
use crate::resample::resample;
use crate::table::{MatchedTable, StationBatch, TableSchema};
use crate::types::station::{Station, StationSource};
use bon::bon;
use log::{debug, info, warn};
use std::fmt;

/// Result of matching a single station.
#[derive(Debug, Clone, PartialEq)]
pub enum StationMatch {
    Matched(StationBatch),
    Skipped(FilterDecision),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub stations_seen: usize,
    pub stations_matched: usize,
    pub skipped_outside_domain: usize,
    pub skipped_network: usize,
    pub rows: usize,
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stations read, {} matched ({} rows), {} outside the model domain, {} in other networks",
            self.stations_seen,
            self.stations_matched,
            self.rows,
            self.skipped_outside_domain,
            self.skipped_network
        )
    }
}

#[derive(Debug, Clone)]
pub struct MatchOutput {
    pub table: MatchedTable,
    pub summary: MatchSummary,
}

/// Matches stations against one model grid.
///
/// The grid is only read; stations are processed one at a time and their rows appended in
/// the order they arrive.
pub struct StationMatcher<'g, G: ModelGrid + ?Sized> {
    grid: &'g G,
    config: MatchConfig,
    filter: StationFilter,
    schema: TableSchema,
}

#[bon]
impl<'g, G: ModelGrid + ?Sized> StationMatcher<'g, G> {
    /// Creates a matcher for `grid`. Without a config, [`MatchConfig::default`] is used.
    ///
    /// ```no_run
    /// # #[cfg(feature = "netcdf")]
    /// # fn main() -> Result<(), mesomatch::MatchError> {
    /// use mesomatch::{load_stations, read_record, StationMatcher, WrfGrid};
    ///
    /// let grid = WrfGrid::discover("wrf_output", None)?;
    /// let record = read_record("mesowest.json")?;
    /// let output = StationMatcher::builder().grid(&grid).build().run(load_stations(&record))?;
    /// println!("{}", output.summary);
    /// # Ok(())
    /// # }
    /// # #[cfg(not(feature = "netcdf"))]
    /// # fn main() {}
    /// ```
    #[builder(finish_fn = build)]
    pub fn new(grid: &'g G, config: Option<MatchConfig>) -> Self {
        let config = config.unwrap_or_default();
        let filter = StationFilter::new(grid.extent(), config.allowed_networks().iter().copied());
        let schema = TableSchema::from_variables(config.variables());
        Self {
            grid,
            config,
            filter,
            schema,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Filters one station and, if accepted, builds its rows.
    pub fn match_station(&self, station: &Station) -> Result<StationMatch, GridError> {
        match self.screen(station) {
            FilterDecision::Accept => self.match_accepted(station).map(StationMatch::Matched),
            decision => Ok(StationMatch::Skipped(decision)),
        }
    }

    fn screen(&self, station: &impl StationSource) -> FilterDecision {
        let decision = self.filter.check(station);
        if decision != FilterDecision::Accept {
            warn!("Skipping station {} ({}): {}", station.id(), station.name(), decision);
        }
        decision
    }

    fn match_accepted(&self, station: &Station) -> Result<StationBatch, GridError> {
        let (latitude, longitude) = (station.location.latitude, station.location.longitude);
        let cell = self
            .grid
            .locate(latitude, longitude)
            .ok_or(GridError::EmptyMesh)?;
        debug!(
            "Station {} uses grid cell (j={}, i={}) at {:.4}, {:.4}, {:.2} km away",
            station.id, cell.j, cell.i, cell.latitude, cell.longitude, cell.distance_km
        );

        let mut batch = StationBatch::empty(
            &self.schema,
            station.id.clone(),
            station.network_id,
            latitude,
            longitude,
            station.times.clone(),
        );
        let observation_times = station.observation_seconds();
        let model_times = self.grid.time_axis();

        for series in &station.variables {
            let Some(spec) = self.config.variables().get(&series.name) else {
                debug!("Station {}: dropping unmapped variable '{}'", station.id, series.name);
                continue;
            };
            if let Some(column) = self.schema.observed_index(&spec.observed) {
                batch.observed[column] = series.values.clone();
            }
            let Some(model_name) = spec.model.as_deref() else {
                continue;
            };
            let Some(column) = self.schema.model_index(model_name) else {
                continue;
            };

            let values = self.grid.extract_at(model_name, &cell)?;
            if values.len() != model_times.len() {
                return Err(GridError::SeriesLength {
                    name: model_name.to_string(),
                    expected: model_times.len(),
                    found: values.len(),
                });
            }
            let converted: Vec<f64> = values.iter().map(|&v| spec.conversion.apply(v)).collect();
            batch.model[column] = resample(
                spec.interpolation,
                &observation_times,
                model_times,
                &converted,
                self.config.nearest_lower_bound(),
            );
            debug!(
                "Station {}: {} -> {} ({})",
                station.id, spec.observed, model_name, spec.interpolation
            );
        }

        Ok(batch)
    }

    /// Processes every station in order and collects the matched rows.
    ///
    /// The first failing station entry or model read ends the run. Series of stations the
    /// filters reject are never parsed.
    pub fn run<I, S>(&self, stations: I) -> Result<MatchOutput, MatchError>
    where
        I: IntoIterator<Item = Result<S, StationError>>,
        S: StationSource,
    {
        info!(
            "Matching stations against {} model time steps, networks {:?}",
            self.grid.time_axis().len(),
            self.config.allowed_networks()
        );
        let mut table = MatchedTable::new(self.schema.clone());
        let mut summary = MatchSummary::default();

        for (index, station) in stations.into_iter().enumerate() {
            let station = station?;
            summary.stations_seen += 1;
            info!("Working on station ({index}) {} [{}]", station.name(), station.id());

            match self.screen(&station) {
                FilterDecision::Accept => {
                    let batch = self.match_accepted(&station.into_station()?)?;
                    summary.stations_matched += 1;
                    summary.rows += batch.len();
                    table.push(batch)?;
                }
                FilterDecision::OutsideDomain => summary.skipped_outside_domain += 1,
                FilterDecision::ExcludedNetwork => summary.skipped_network += 1,
            }
        }

        info!("Finished matching: {summary}");
        Ok(MatchOutput { table, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MemoryGrid, Mesh};
    use crate::observations::loader::{load_stations, parse_record};
    use crate::resample::NearestLowerBound;
    use crate::types::station::{Location, SensorSeries};
    use crate::types::variable::{VariableSpec, VariableTable};
    use chrono::{DateTime, TimeZone, Utc};
    use std::error::Error;

    const T0: i64 = 1_537_401_600;

    fn grid() -> Result<MemoryGrid, GridError> {
        let mesh = Mesh::regular(&[40.0, 41.0], &[-112.0, -111.0])?;
        let times = vec![T0 as f64, (T0 + 3600) as f64, (T0 + 7200) as f64];
        let t2: Vec<f64> = [290.15, 291.15, 292.15]
            .iter()
            .flat_map(|&t| [t, t + 10.0, t + 20.0, t + 30.0])
            .collect();
        MemoryGrid::new(mesh, times)?
            .with_surface_field("T2", t2)?
            .with_surface_field("U10", vec![5.0; 12])?
            .with_surface_field("V10", vec![0.0; 12])?
            .with_surface_field("PSFC", vec![85_000.0; 12])?
            .with_surface_field("Q2", vec![0.005; 12])
    }

    fn at(offset: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(T0 + offset, 0).unwrap()
    }

    fn series(name: &str, values: Vec<Option<f64>>) -> SensorSeries {
        SensorSeries {
            name: name.to_string(),
            set: format!("{name}_set_1"),
            values,
        }
    }

    fn station(id: &str, latitude: f64, longitude: f64, network_id: i64) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {id}"),
            network_id,
            location: Location {
                latitude,
                longitude,
                elevation: None,
            },
            times: vec![at(1800), at(3600), at(9000)],
            variables: vec![
                series("air_temp", vec![Some(20.0), None, Some(22.0)]),
                series("wind_direction", vec![Some(260.0), Some(265.0), Some(270.0)]),
                series("pressure", vec![Some(86_000.0); 3]),
            ],
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn matches_an_accepted_station() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let StationMatch::Matched(batch) = matcher.match_station(&station("WBB", 40.0, -112.0, 153))?
        else {
            panic!("station should have been accepted");
        };
        let schema = matcher.schema();
        assert_eq!(batch.len(), 3);

        let air_temp = &batch.observed[schema.observed_index("air_temp").unwrap()];
        assert_eq!(air_temp, &vec![Some(20.0), None, Some(22.0)]);

        // Kelvin to Celsius, then linear in time; nothing past the last model step.
        let t2 = &batch.model[schema.model_index("T2").unwrap()];
        assert!(close(t2[0], 17.5));
        assert!(close(t2[1], 18.0));
        assert_eq!(t2[2], None);

        // Nearest with the second model step as lower bound.
        let wdir = &batch.model[schema.model_index("uvmet10_wdir").unwrap()];
        assert_eq!(wdir[0], None);
        assert!(close(wdir[1], 270.0));
        assert_eq!(wdir[2], None);

        // Not reported by the station.
        let rh2 = &batch.model[schema.model_index("rh2").unwrap()];
        assert_eq!(rh2, &vec![None; 3]);
        Ok(())
    }

    #[test]
    fn first_step_bound_keeps_early_directions() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let config = MatchConfig::builder()
            .nearest_lower_bound(NearestLowerBound::FirstStep)
            .build()?;
        let matcher = StationMatcher::builder().grid(&grid).config(config).build();
        let StationMatch::Matched(batch) = matcher.match_station(&station("WBB", 40.0, -112.0, 153))?
        else {
            panic!("station should have been accepted");
        };
        let wdir = &batch.model[matcher.schema().model_index("uvmet10_wdir").unwrap()];
        assert!(close(wdir[0], 270.0));
        Ok(())
    }

    #[test]
    fn observation_only_variables_have_no_model_column() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let variables = VariableTable::new(vec![
            VariableSpec::new("air_temp", "T2"),
            VariableSpec::observation_only("pressure"),
        ]);
        let config = MatchConfig::builder().variables(variables).build()?;
        let matcher = StationMatcher::builder().grid(&grid).config(config).build();
        assert_eq!(matcher.schema().model(), ["T2"]);

        let StationMatch::Matched(batch) = matcher.match_station(&station("WBB", 40.0, -112.0, 153))?
        else {
            panic!("station should have been accepted");
        };
        assert_eq!(batch.observed[1], vec![Some(86_000.0); 3]);
        // no conversion configured here
        assert!(close(batch.model[0][1], 291.15));
        Ok(())
    }

    #[test]
    fn run_skips_and_counts() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let stations = vec![
            Ok(station("WBB", 40.0, -112.0, 153)),
            Ok(station("FAR", 45.0, -112.0, 1)),
            Ok(station("EDGE", 41.0, -111.0, 1)),
            Ok(station("OTHER", 40.5, -111.5, 3)),
        ];
        let output = matcher.run(stations)?;
        assert_eq!(
            output.summary,
            MatchSummary {
                stations_seen: 4,
                stations_matched: 2,
                skipped_outside_domain: 1,
                skipped_network: 1,
                rows: 6,
            }
        );
        let ids: Vec<&str> = output
            .table
            .batches()
            .iter()
            .map(|b| b.station_id.as_str())
            .collect();
        assert_eq!(ids, ["WBB", "EDGE"]);

        // EDGE sits on the corner cell (1, 1): T2 + 30 K.
        let t2 = &output.table.batches()[1].model[0];
        assert!(close(t2[1], 48.0));
        Ok(())
    }

    #[test]
    fn missing_model_variable_is_fatal() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let mut pm = station("PM", 40.0, -112.0, 153);
        pm.variables.push(series("PM_25_concentration", vec![Some(5.0); 3]));
        let result = matcher.run(vec![Ok(pm)]);
        assert!(matches!(
            result,
            Err(MatchError::Grid(GridError::VariableNotFound(ref name))) if name == "PM2_5_DRY"
        ));
        Ok(())
    }

    #[test]
    fn station_errors_stop_the_run() -> Result<(), Box<dyn Error>> {
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let stations = vec![
            Ok(station("WBB", 40.0, -112.0, 153)),
            Err(StationError::MalformedStation {
                station: "BAD".to_string(),
                field: "LATITUDE".to_string(),
            }),
        ];
        assert!(matches!(
            matcher.run(stations),
            Err(MatchError::Station(StationError::MalformedStation { .. }))
        ));
        Ok(())
    }

    #[test]
    fn rejected_stations_are_not_parsed_further() -> Result<(), Box<dyn Error>> {
        let record = parse_record(
            r#"{"STATION": [
                {
                    "STID": "FAR", "MNET_ID": 1, "LATITUDE": 10.0, "LONGITUDE": 10.0,
                    "SENSOR_VARIABLES": {},
                    "OBSERVATIONS": {"date_time": ["2018-09-20 00:00"]}
                },
                {
                    "STID": "WBB", "MNET_ID": 153, "LATITUDE": 40.0, "LONGITUDE": -112.0,
                    "SENSOR_VARIABLES": {"air_temp": {"air_temp_set_1": {}}},
                    "OBSERVATIONS": {
                        "date_time": ["20180920 003000", "20180920 010000"],
                        "air_temp_set_1": [20.0, 21.0]
                    }
                }
            ]}"#,
        )?;
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let output = matcher.run(load_stations(&record))?;
        assert_eq!(output.summary.skipped_outside_domain, 1);
        assert_eq!(output.summary.stations_matched, 1);
        assert_eq!(output.summary.rows, 2);

        let t2 = &output.table.batches()[0].model[0];
        assert!(close(t2[0], 17.5));
        assert!(close(t2[1], 18.0));
        Ok(())
    }

    #[test]
    fn malformed_timestamp_of_accepted_station_is_fatal() -> Result<(), Box<dyn Error>> {
        let record = parse_record(
            r#"{"STATION": [{
                "STID": "WBB", "MNET_ID": 153, "LATITUDE": 40.0, "LONGITUDE": -112.0,
                "SENSOR_VARIABLES": {},
                "OBSERVATIONS": {"date_time": ["2018-09-20 00:00"]}
            }]}"#,
        )?;
        let grid = grid()?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        assert!(matches!(
            matcher.run(load_stations(&record)),
            Err(MatchError::Station(StationError::MalformedTimestamp { .. }))
        ));
        Ok(())
    }

    #[test]
    fn empty_time_axis_gives_missing_model_values() -> Result<(), Box<dyn Error>> {
        let mesh = Mesh::regular(&[40.0, 41.0], &[-112.0, -111.0])?;
        let grid = MemoryGrid::new(mesh, Vec::new())?
            .with_surface_field("T2", Vec::new())?
            .with_surface_field("U10", Vec::new())?
            .with_surface_field("V10", Vec::new())?;
        let matcher = StationMatcher::builder().grid(&grid).build();
        let StationMatch::Matched(batch) = matcher.match_station(&station("WBB", 40.0, -112.0, 153))?
        else {
            panic!("station should have been accepted");
        };
        assert!(batch.model.iter().flatten().all(Option::is_none));
        assert_eq!(batch.observed[0], vec![Some(20.0), None, Some(22.0)]);
        Ok(())
    }
}
