use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::period::{encode, periods_between, shift};
use crate::error::{EngineError, Result};
use crate::models::{Direction, Series};

/// Scalar summaries the map view can color countries by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    PercentChange,
    AvgAnnualPercentChange,
    AvgAnnualChange,
    AvgOverRange,
}

impl Aggregator {
    pub const ALL: [Aggregator; 4] = [
        Aggregator::PercentChange,
        Aggregator::AvgAnnualPercentChange,
        Aggregator::AvgAnnualChange,
        Aggregator::AvgOverRange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregator::PercentChange => "pct_change",
            Aggregator::AvgAnnualPercentChange => "avg_pct_change",
            Aggregator::AvgAnnualChange => "avg_change",
            Aggregator::AvgOverRange => "avg",
        }
    }

    pub fn apply(&self, series: &Series, begin: &str, end: &str) -> Result<f64> {
        match self {
            Aggregator::PercentChange => percent_change(series, begin, end),
            Aggregator::AvgAnnualPercentChange => avg_annual_percent_change(series, begin, end),
            Aggregator::AvgAnnualChange => avg_annual_change(series, begin, end),
            Aggregator::AvgOverRange => avg_over_range(series, begin, end),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pct_change" | "percent_change" => Ok(Aggregator::PercentChange),
            "avg_pct_change" | "avg_annual_percent_change" => Ok(Aggregator::AvgAnnualPercentChange),
            "avg_change" | "avg_annual_change" => Ok(Aggregator::AvgAnnualChange),
            "avg" | "avg_over_range" => Ok(Aggregator::AvgOverRange),
            other => Err(EngineError::UnknownAggregator(other.to_string())),
        }
    }
}

/// Values from `begin` to `end` inclusive, one per period.
///
/// Nulls and periods missing inside the window come back as `NaN` so they
/// poison the aggregate instead of being skipped.
fn window_values(series: &Series, begin: &str, end: &str) -> Result<Vec<f64>> {
    for label in [begin, end] {
        if !series.contains(label) {
            return Err(EngineError::MissingPeriod(label.to_string()));
        }
    }

    let frequency = series.frequency();
    let by_ordinal = series
        .iter()
        .map(|(label, value)| Ok((encode(label, frequency)?, value)))
        .collect::<Result<BTreeMap<i64, Option<f64>>>>()?;

    let begin_ordinal = encode(begin, frequency)?;
    let end_ordinal = encode(end, frequency)?;
    let steps = periods_between(begin_ordinal, end_ordinal, frequency);
    let steps = u32::try_from(steps).map_err(|_| EngineError::InvalidRange {
        begin: begin.to_string(),
        end: end.to_string(),
    })?;

    Ok((0..=steps)
        .map(|k| {
            let ordinal = shift(begin_ordinal, k, frequency, Direction::Forward);
            by_ordinal.get(&ordinal).copied().flatten().unwrap_or(f64::NAN)
        })
        .collect())
}

/// Total change between two periods, in percent.
pub fn percent_change(series: &Series, begin: &str, end: &str) -> Result<f64> {
    let values = window_values(series, begin, end)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let first = values[0];
    let last = values[values.len() - 1];
    Ok((last / first - 1.0) * 100.0)
}

/// Mean period-on-period change in percent.
///
/// Each step is measured against the *later* value: `(v[i] - v[i-1]) / v[i]`.
pub fn avg_annual_percent_change(series: &Series, begin: &str, end: &str) -> Result<f64> {
    let values = window_values(series, begin, end)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let sum: f64 = values
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[1] * 100.0)
        .sum();
    Ok(sum / (values.len() - 1) as f64)
}

/// Mean period-on-period absolute change.
pub fn avg_annual_change(series: &Series, begin: &str, end: &str) -> Result<f64> {
    let values = window_values(series, begin, end)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let sum: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
    Ok(sum / (values.len() - 1) as f64)
}

/// Sum of the values in the window divided by the number of *steps*
/// (`end - begin`), not the number of values.
pub fn avg_over_range(series: &Series, begin: &str, end: &str) -> Result<f64> {
    let values = window_values(series, begin, end)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let sum: f64 = values.iter().sum();
    Ok(sum / (values.len() - 1) as f64)
}

/// Applies one aggregator to every series of a map, keyed the same way.
///
/// Failures stay per key so one country without data does not hide the rest.
pub fn aggregate_all(
    series_by_key: &BTreeMap<String, Series>,
    aggregator: Aggregator,
    begin: &str,
    end: &str,
) -> BTreeMap<String, Result<f64>> {
    series_by_key
        .iter()
        .map(|(key, series)| (key.clone(), aggregator.apply(series, begin, end)))
        .collect()
}
