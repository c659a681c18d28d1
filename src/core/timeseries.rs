use crate::core::period::detect_frequency;
use crate::models::{Frequency, Observation, Series};
use std::collections::BTreeMap;

/// Splits records by a key, keeping each group's records in input order.
fn group_by<F>(records: Vec<Observation>, key: F) -> BTreeMap<String, Vec<Observation>>
where
    F: Fn(&Observation) -> &str,
{
    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for record in records {
        groups.entry(key(&record).to_string()).or_default().push(record);
    }
    groups
}

/// Groups raw observations by country (entity) code.
pub fn group_by_entity(records: Vec<Observation>) -> BTreeMap<String, Vec<Observation>> {
    group_by(records, |r| r.entity.as_str())
}

/// Groups one country's observations by indicator id.
pub fn group_by_indicator(records: Vec<Observation>) -> BTreeMap<String, Vec<Observation>> {
    group_by(records, |r| r.indicator.as_str())
}

/// Builds the period -> value series for one entity.
///
/// The frequency is decided here, once, from the first record. Duplicate
/// periods are not expected from the World Bank; if they occur the last
/// record wins. Null values are kept.
pub fn to_period_map(records: &[Observation]) -> Series {
    let frequency = records
        .first()
        .map(|r| detect_frequency(&r.period))
        .unwrap_or_default();

    let mut series = Series::new(frequency);
    for record in records {
        series.insert(record.period.as_str(), record.value);
    }
    series
}

/// Collapses a quarterly or monthly series into yearly means.
///
/// Periods are bucketed by their 4-character year prefix. Null and
/// non-finite values are left out of the mean, and a year with nothing
/// left to average is dropped rather than reported as null or zero.
/// Yearly series are returned unchanged.
pub fn compress_to_yearly(series: &Series) -> Series {
    if series.frequency() == Frequency::Yearly {
        return series.clone();
    }

    let mut buckets: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (label, value) in series.valid_points() {
        let year = label.get(..4).unwrap_or(label);
        let entry = buckets.entry(year).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut yearly = Series::new(Frequency::Yearly);
    for (year, (sum, count)) in buckets {
        yearly.insert(year, Some(sum / count as f64));
    }
    yearly
}
