use std::collections::BTreeMap;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analysis::forecast::{predict, ForecastOptions};
use crate::config::EngineSettings;
use crate::core::timeseries::{compress_to_yearly, group_by_entity, group_by_indicator, to_period_map};
use crate::error::{EngineError, Result};
use crate::indicators::registry::Registry;
use crate::models::{CountryReport, Observation, Series};

/// entity -> indicator key -> series
pub type CountryIndicators = BTreeMap<String, BTreeMap<String, Series>>;

/// Reshapes flat observations into one series per country and indicator.
///
/// Indicators are keyed by registry slug when known ("gdp"), otherwise by
/// their World Bank code.
pub fn reshape(records: Vec<Observation>, compress: bool) -> CountryIndicators {
    group_by_entity(records)
        .into_iter()
        .map(|(entity, entity_records)| {
            let indicators = group_by_indicator(entity_records)
                .into_iter()
                .map(|(code, indicator_records)| {
                    let series = to_period_map(&indicator_records);
                    let series = if compress { compress_to_yearly(&series) } else { series };
                    (Registry::display_key(&code), series)
                })
                .collect();
            (entity, indicators)
        })
        .collect()
}

/// Forecasts each indicator independently on the blocking pool.
///
/// Every input key appears in the output; a failure for one indicator never
/// affects the others.
pub async fn forecast_indicators(
    indicators: &BTreeMap<String, Series>,
    horizon: u32,
    options: ForecastOptions,
) -> BTreeMap<String, Result<Series>> {
    let mut results: BTreeMap<String, Result<Series>> = indicators
        .keys()
        .map(|key| (key.clone(), Err(EngineError::Task("forecast did not complete".to_string()))))
        .collect();

    let mut tasks = JoinSet::new();
    for (key, series) in indicators {
        let key = key.clone();
        let series = series.clone();
        tasks.spawn_blocking(move || {
            let result = predict(&series, horizon, &options);
            (key, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((key, result)) => {
                results.insert(key, result);
            }
            Err(e) => warn!("Forecast task failed: {}", e),
        }
    }

    results
}

/// Builds the per-country payload: history plus forecasts.
///
/// `horizon` is clamped by the settings; `None` uses the configured default.
pub async fn build_country_reports(
    records: Vec<Observation>,
    settings: &EngineSettings,
    horizon: Option<u32>,
) -> Vec<CountryReport> {
    let horizon = settings.clamp_horizon(horizon);
    let options = settings.forecast_options();
    let countries = reshape(records, settings.compress_to_yearly);

    info!(
        "Building reports for {} countries (horizon: {}, direction: {:?})",
        countries.len(),
        horizon,
        options.direction
    );

    let mut reports = Vec::with_capacity(countries.len());
    for (entity, indicators) in countries {
        let mut report = CountryReport {
            entity: entity.clone(),
            ..CountryReport::default()
        };

        for (key, result) in forecast_indicators(&indicators, horizon, options).await {
            match result {
                Ok(forecast) => {
                    report.forecasts.insert(key, forecast);
                }
                Err(e) => {
                    warn!("{}: forecast for '{}' failed: {}", entity, key, e);
                    report.errors.insert(key, e.to_string());
                }
            }
        }

        debug!("{}: {} indicators, {} forecasts", entity, indicators.len(), report.forecasts.len());
        report.indicators = indicators;
        reports.push(report);
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    fn obs(entity: &str, indicator: &str, period: &str, value: Option<f64>) -> Observation {
        Observation::new(entity, indicator, period, value)
    }

    #[test]
    fn test_reshape_keys_by_slug() {
        let records = vec![
            obs("FIN", "NY.GDP.MKTP.KD", "2021", Some(2.0)),
            obs("FIN", "NY.GDP.MKTP.KD", "2020", Some(1.0)),
            obs("FIN", "EN.ATM.CO2E.KT", "2020", Some(9.0)),
            obs("SWE", "NY.GDP.MKTP.KD", "2020", None),
        ];
        let countries = reshape(records, false);

        assert_eq!(countries.len(), 2);
        assert_eq!(countries["FIN"]["gdp"].len(), 2);
        assert!(countries["FIN"].contains_key("EN.ATM.CO2E.KT"));
        assert!(countries["SWE"]["gdp"].contains("2020"));
    }

    #[test]
    fn test_reshape_compresses() {
        let records = vec![
            obs("FIN", "X", "2020Q1", Some(1.0)),
            obs("FIN", "X", "2020Q2", Some(3.0)),
        ];
        let countries = reshape(records, true);
        let series = &countries["FIN"]["X"];
        assert_eq!(series.frequency(), Frequency::Yearly);
        assert_eq!(series.get("2020"), Some(2.0));
    }

    #[tokio::test]
    async fn test_forecast_indicators_isolates_failures() {
        let mut indicators = BTreeMap::new();
        indicators.insert(
            "good".to_string(),
            [("2020", Some(1.0)), ("2021", Some(2.0))].into_iter().collect::<Series>(),
        );
        indicators.insert(
            "bad".to_string(),
            [("2020", Some(1.0)), ("20x1", Some(2.0))].into_iter().collect::<Series>(),
        );

        let results = forecast_indicators(&indicators, 1, ForecastOptions::default()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results["good"].as_ref().unwrap().get("2022"), Some(3.0));
        assert!(matches!(results["bad"], Err(EngineError::Format { .. })));
    }
}
