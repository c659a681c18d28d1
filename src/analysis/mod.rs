pub mod regression;
pub mod forecast;
pub mod statistics;

pub use forecast::{fit_series, forecast, forecast_backward, forecast_with_window, predict, ForecastOptions, Predictor};
pub use regression::{r2_score, Regressor};
pub use statistics::{aggregate_all, Aggregator};
