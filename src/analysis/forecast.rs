use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use super::regression::{r2_score, Regressor, MIN_FIT_POINTS};
use crate::core::period::{decode, encode, periods_between, shift};
use crate::error::{EngineError, Result};
use crate::models::{Direction, FitResult, Frequency, Series};

/// How future (or past) values are produced from the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Predictor {
    /// Least-squares trend line over the encoded periods
    #[default]
    Linear,
    /// Compound growth from the first to the last observation
    Growth,
}

impl FromStr for Predictor {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Predictor::Linear),
            "growth" => Ok(Predictor::Growth),
            other => Err(EngineError::UnknownPredictor(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ForecastOptions {
    pub predictor: Predictor,
    pub direction: Direction,
    /// Fit only the most recent `window` observations (0 = all of them)
    pub window: usize,
}

struct EncodedPoint<'a> {
    label: &'a str,
    ordinal: i64,
    value: f64,
}

/// Non-null points of a series, encoded and sorted chronologically.
fn encode_points(series: &Series) -> Result<Vec<EncodedPoint<'_>>> {
    let frequency = series.frequency();
    let mut points = series
        .valid_points()
        .map(|(label, value)| {
            Ok(EncodedPoint {
                label,
                ordinal: encode(label, frequency)?,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    points.sort_by_key(|p| p.ordinal);
    Ok(points)
}

/// Outermost period of the series in `direction`, null entries included.
fn boundary(series: &Series, direction: Direction) -> Result<Option<i64>> {
    let frequency = series.frequency();
    let ordinals = series
        .labels()
        .map(|label| encode(label, frequency))
        .collect::<Result<Vec<_>>>()?;
    Ok(match direction {
        Direction::Forward => ordinals.into_iter().max(),
        Direction::Backward => ordinals.into_iter().min(),
    })
}

/// Extends `series` by `periods_ahead` years past its latest observation.
///
/// The horizon is counted in years and scaled by the number of sub-periods,
/// so a quarterly series forecast 2 years ahead gains 8 points.
pub fn forecast(series: &Series, periods_ahead: u32) -> Result<Series> {
    predict(series, periods_ahead, &ForecastOptions::default())
}

/// Extends `series` by `periods_back` years before its earliest observation.
pub fn forecast_backward(series: &Series, periods_back: u32) -> Result<Series> {
    let options = ForecastOptions {
        direction: Direction::Backward,
        ..ForecastOptions::default()
    };
    predict(series, periods_back, &options)
}

/// Linear forecast fitted on the last `window` observations only.
pub fn forecast_with_window(
    series: &Series,
    horizon: u32,
    window: usize,
    direction: Direction,
) -> Result<Series> {
    let options = ForecastOptions {
        predictor: Predictor::Linear,
        direction,
        window,
    };
    predict(series, horizon, &options)
}

/// Produces the predicted points only; the input series is never re-emitted.
///
/// The fit uses non-null observations, but new periods start past the
/// outermost label so trailing or leading nulls are never filled in.
/// An empty horizon, an all-null series, or too few observations to fit
/// yield an empty series. Malformed period labels are an error.
pub fn predict(series: &Series, horizon: u32, options: &ForecastOptions) -> Result<Series> {
    let frequency = series.frequency();
    let mut predicted = Series::new(frequency);
    if horizon == 0 {
        return Ok(predicted);
    }

    let mut points = encode_points(series)?;
    let Some(anchor) = boundary(series, options.direction)? else {
        return Ok(predicted);
    };
    if points.is_empty() {
        debug!("No valid observations, nothing to forecast");
        return Ok(predicted);
    }
    if options.window > 0 && options.window < points.len() {
        points.drain(..points.len() - options.window);
    }

    let steps = horizon.saturating_mul(frequency.periods_per_year());
    let result = match options.predictor {
        Predictor::Linear => linear_trend(&points, anchor, steps, frequency, options.direction),
        Predictor::Growth => compound_growth(&points, anchor, steps, frequency, options.direction),
    };

    match result {
        Ok(values) => {
            for (ordinal, value) in values {
                predicted.insert(decode(ordinal, frequency), Some(value));
            }
        }
        Err(e) if e.is_insufficient_data() => {
            debug!("Skipping forecast: {}", e);
        }
        Err(e) => return Err(e),
    }

    Ok(predicted)
}

fn linear_trend(
    points: &[EncodedPoint<'_>],
    anchor: i64,
    steps: u32,
    frequency: Frequency,
    direction: Direction,
) -> Result<Vec<(i64, f64)>> {
    let x: Vec<f64> = points.iter().map(|p| p.ordinal as f64).collect();
    let y: Vec<f64> = points.iter().map(|p| p.value).collect();
    let regressor = Regressor::fit(&x, &y)?;

    Ok((1..=steps)
        .map(|i| {
            let ordinal = shift(anchor, i, frequency, direction);
            (ordinal, regressor.predict(ordinal as f64))
        })
        .collect())
}

fn compound_growth(
    points: &[EncodedPoint<'_>],
    anchor: i64,
    steps: u32,
    frequency: Frequency,
    direction: Direction,
) -> Result<Vec<(i64, f64)>> {
    if direction == Direction::Backward {
        debug!("Growth extrapolation only runs forward");
        return Ok(Vec::new());
    }

    let insufficient = EngineError::InsufficientData {
        required: MIN_FIT_POINTS,
        actual: points.len(),
    };
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(insufficient);
    };
    if last.ordinal == first.ordinal {
        return Err(insufficient);
    }

    // Rate per ordinal unit between the two end points
    let rate = (last.value - first.value) / (first.value * (last.ordinal - first.ordinal) as f64);

    Ok((1..=steps)
        .map(|i| {
            let ordinal = shift(anchor, i, frequency, direction);
            let elapsed = periods_between(last.ordinal, ordinal, frequency);
            (ordinal, last.value * (1.0 + rate).powi(elapsed as i32))
        })
        .collect())
}

/// Fits a trend line through every valid observation and scores it.
pub fn fit_series(series: &Series) -> Result<FitResult> {
    let points = encode_points(series)?;
    let x: Vec<f64> = points.iter().map(|p| p.ordinal as f64).collect();
    let y: Vec<f64> = points.iter().map(|p| p.value).collect();

    let regressor = Regressor::fit(&x, &y)?;
    let fitted = regressor.evaluate(&x);
    let r2 = r2_score(&y, &fitted);

    let y_hat: BTreeMap<String, f64> = points
        .iter()
        .zip(&fitted)
        .map(|(p, &v)| (p.label.to_string(), v))
        .collect();

    Ok(FitResult {
        x: points.iter().map(|p| (p.label.to_string(), p.ordinal)).collect(),
        y,
        y_hat,
        regressor,
        r2,
    })
}
