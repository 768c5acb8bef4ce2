//! Brings a model series, sampled at model output times, onto a station's observation times.
//!
//! Both resamplers work on one station and one grid cell at a time: `x` is the model time
//! axis (epoch seconds, strictly increasing), `y` the model values at those times and
//! `query` the observation times. Missing results are `None`; a NaN in `y` also ends up as
//! `None`.

use crate::types::variable::Interpolation;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Earliest model time at which a nearest-neighbour sample is still accepted.
///
/// `SecondStep` reproduces the long-standing behaviour of the matching scripts, which treat
/// anything before the *second* model output as out of range. `FirstStep` accepts the whole
/// model period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearestLowerBound {
    FirstStep,
    #[default]
    SecondStep,
}

/// Linear interpolation between two points.
pub fn linear_interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y0;
    }
    let fac = (x - x0) / (x1 - x0);
    y0 + (y1 - y0) * fac
}

/// Piecewise-linear interpolation of `(x, y)` at every `query` point.
///
/// Queries before `x[0]` or after the last `x` are `None`; nothing is extrapolated. A query
/// that hits a model time exactly returns that sample. If `x` and `y` differ in length,
/// every result is `None`.
pub fn interp_linear(query: &[f64], x: &[f64], y: &[f64]) -> Vec<Option<f64>> {
    if x.len() != y.len() {
        return vec![None; query.len()];
    }
    query.iter().map(|&t| linear_at(t, x, y)).collect()
}

fn linear_at(t: f64, x: &[f64], y: &[f64]) -> Option<f64> {
    let (first, last) = (*x.first()?, *x.last()?);
    if t.is_nan() || t < first || t > last {
        return None;
    }
    // Index of the first model time strictly after t.
    let upper = x.partition_point(|&xv| xv <= t);
    let value = if x[upper - 1] == t || upper == x.len() {
        y[upper - 1]
    } else {
        linear_interpolate(x[upper - 1], y[upper - 1], x[upper], y[upper], t)
    };
    finite(value)
}

/// Nearest-neighbour resampling of `(x, y)` at every `query` point.
///
/// Ties go to the lower index, i.e. the earlier model time. With `bounds` set, queries
/// before the lower bound (see [`NearestLowerBound`]) or after the last model time are
/// `None`; without it every query gets its nearest sample. If `x` and `y` differ in
/// length, every result is `None`.
pub fn interp_nearest(
    query: &[f64],
    x: &[f64],
    y: &[f64],
    bounds: Option<NearestLowerBound>,
) -> Vec<Option<f64>> {
    let Some(&last) = x.last().filter(|_| x.len() == y.len()) else {
        return vec![None; query.len()];
    };
    let lower = match bounds {
        Some(NearestLowerBound::SecondStep) if x.len() > 1 => Some(x[1]),
        Some(_) => Some(x[0]),
        None => None,
    };

    query
        .iter()
        .map(|&t| {
            if t.is_nan() {
                return None;
            }
            if let Some(lower) = lower {
                if t < lower || t > last {
                    return None;
                }
            }
            // min_by_key keeps the first of equal keys.
            let (idx, _) = x
                .iter()
                .enumerate()
                .min_by_key(|&(_, &xv)| OrderedFloat((xv - t).abs()))?;
            finite(y[idx])
        })
        .collect()
}

/// Resamples with the method the variable table asks for. The nearest-neighbour path is
/// always bounded.
pub fn resample(
    method: Interpolation,
    query: &[f64],
    x: &[f64],
    y: &[f64],
    lower_bound: NearestLowerBound,
) -> Vec<Option<f64>> {
    match method {
        Interpolation::Linear => interp_linear(query, x, y),
        Interpolation::Nearest => interp_nearest(query, x, y, Some(lower_bound)),
    }
}

fn finite(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}
