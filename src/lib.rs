//! Period normalization, trend forecasting and summary statistics for
//! World Bank indicator series.
//!
//! Raw observations come in through [`ingest::worldbank`], are reshaped
//! per country by [`core::timeseries`], and are then either summarized by an
//! [`analysis::Aggregator`] or extended by [`analysis::forecast`].

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod ingest;
pub mod models;

pub use error::{EngineError, Result};
pub use models::{CountryReport, Direction, FitResult, Frequency, Observation, Series};
