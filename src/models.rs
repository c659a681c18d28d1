use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::regression::Regressor;

/// Granularity of the periods in a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Frequency {
    #[default]
    Yearly,
    Quarterly,
    Monthly,
}

impl Frequency {
    /// Number of sub-periods that make up one year (1 for yearly data).
    pub const fn periods_per_year(self) -> u32 {
        match self {
            Frequency::Yearly => 1,
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
        }
    }

    /// Separator letter used in period labels ("2020Q1", "2020M05").
    pub const fn letter(self) -> Option<char> {
        match self {
            Frequency::Yearly => None,
            Frequency::Quarterly => Some('Q'),
            Frequency::Monthly => Some('M'),
        }
    }
}

/// Which boundary of the historical range a forecast extends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// One raw indicator observation as delivered by the World Bank API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// ISO3 country code (e.g. "FIN")
    pub entity: String,
    /// World Bank indicator id (e.g. "NY.GDP.MKTP.KD")
    pub indicator: String,
    pub period: String,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(entity: &str, indicator: &str, period: &str, value: Option<f64>) -> Self {
        Self {
            entity: entity.to_string(),
            indicator: indicator.to_string(),
            period: period.to_string(),
            value,
        }
    }
}

/// Period label -> value mapping, tagged with the frequency it was built with.
///
/// Null observations are kept so gaps stay visible to callers; the
/// forecaster skips them, the aggregators turn them into `NaN`.
/// Labels sort chronologically as long as sub-periods are zero-padded the
/// way the World Bank emits them ("2020M05"), which is also what the
/// period codec produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<f64>>",
    into = "BTreeMap<String, Option<f64>>"
)]
pub struct Series {
    frequency: Frequency,
    values: BTreeMap<String, Option<f64>>,
}

impl Series {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            values: BTreeMap::new(),
        }
    }

    /// Builds a series, inferring the frequency from its first label.
    pub fn from_map(values: BTreeMap<String, Option<f64>>) -> Self {
        let frequency = values
            .keys()
            .next()
            .map(|label| crate::core::period::detect_frequency(label))
            .unwrap_or_default();
        Self { frequency, values }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.values.contains_key(label)
    }

    /// Value stored for `label`; `None` both for absent keys and null entries.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied().flatten()
    }

    /// Last write wins.
    pub fn insert(&mut self, label: impl Into<String>, value: Option<f64>) {
        self.values.insert(label.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Entries with a usable numeric value.
    pub fn valid_points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().filter_map(|(k, v)| match v {
            Some(x) if x.is_finite() => Some((k.as_str(), *x)),
            _ => None,
        })
    }

    /// Copies every entry of `other` into `self`, overwriting shared labels.
    pub fn merge(&mut self, other: &Series) {
        for (label, value) in other.iter() {
            self.values.insert(label.to_string(), value);
        }
    }
}

impl From<BTreeMap<String, Option<f64>>> for Series {
    fn from(values: BTreeMap<String, Option<f64>>) -> Self {
        Series::from_map(values)
    }
}

impl From<Series> for BTreeMap<String, Option<f64>> {
    fn from(series: Series) -> Self {
        series.values
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for Series {
    fn from_iter<I: IntoIterator<Item = (S, Option<f64>)>>(iter: I) -> Self {
        let values: BTreeMap<String, Option<f64>> =
            iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Series::from_map(values)
    }
}

/// Output of fitting a trend line to a whole series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Period label -> encoded period used as the regression input
    pub x: BTreeMap<String, i64>,
    pub y: Vec<f64>,
    /// Fitted value per period label
    pub y_hat: BTreeMap<String, f64>,
    pub regressor: Regressor,
    /// `NaN` (serialized as null) when the score is undefined
    pub r2: f64,
}

/// Everything the dashboard needs for one country.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryReport {
    pub entity: String,
    /// indicator slug -> historical series
    pub indicators: BTreeMap<String, Series>,
    /// indicator slug -> predicted points only
    pub forecasts: BTreeMap<String, Series>,
    /// indicator slug -> reason its forecast could not be produced
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}
