//! Lazy queries on a matched table.

use crate::table::{NETWORK_COLUMN, STATION_COLUMN, TIME_COLUMN};
use crate::types::variable::{Interpolation, VariableTable};
use chrono::{DateTime, Utc};
use polars::prelude::{col, lit, when, Expr, LazyFrame};

/// A wrapper around a polars `LazyFrame` holding a matched table.
///
/// The `times` column is timezone-naive UTC, so datetimes are compared through
/// `naive_utc()`.
#[derive(Clone)]
pub struct MatchedLazyFrame {
    /// The underlying polars LazyFrame.
    pub frame: LazyFrame,
}

impl MatchedLazyFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Applies an arbitrary polars predicate.
    ///
    /// ```no_run
    /// # use mesomatch::scan_table;
    /// use polars::prelude::{col, lit};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let matched = scan_table("model_matched_obs.parquet")?;
    /// let warm = matched.filter(col("air_temp").gt(lit(25.0))).frame.collect()?;
    /// println!("{warm}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter(&self, predicate: Expr) -> MatchedLazyFrame {
        MatchedLazyFrame::new(self.frame.clone().filter(predicate))
    }

    /// Rows of one station.
    pub fn station(&self, station_id: &str) -> MatchedLazyFrame {
        self.filter(col(STATION_COLUMN).eq(lit(station_id)))
    }

    /// Rows of one MesoWest network.
    pub fn network(&self, network_id: i64) -> MatchedLazyFrame {
        self.filter(col(NETWORK_COLUMN).eq(lit(network_id)))
    }

    /// Rows with `start <= times <= end`.
    pub fn get_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> MatchedLazyFrame {
        self.filter(
            col(TIME_COLUMN)
                .gt_eq(lit(start.naive_utc()))
                .and(col(TIME_COLUMN).lt_eq(lit(end.naive_utc()))),
        )
    }

    /// Adds a `<model>_minus_<observed>` column for every variable with a model counterpart.
    ///
    /// Differences of nearest-neighbour (directional) variables are wrapped into
    /// `(-180, 180]` degrees.
    pub fn with_differences(&self, variables: &VariableTable) -> MatchedLazyFrame {
        let differences: Vec<Expr> = variables
            .iter()
            .filter_map(|spec| {
                let model = spec.model.as_deref()?;
                let diff = col(model) - col(spec.observed.as_str());
                let diff = match spec.interpolation {
                    Interpolation::Linear => diff,
                    Interpolation::Nearest => when(diff.clone().gt(lit(180.0)))
                        .then(diff.clone() - lit(360.0))
                        .when(diff.clone().lt_eq(lit(-180.0)))
                        .then(diff.clone() + lit(360.0))
                        .otherwise(diff),
                };
                Some(diff.alias(format!("{model}_minus_{}", spec.observed)))
            })
            .collect();
        MatchedLazyFrame::new(self.frame.clone().with_columns(differences))
    }
}
