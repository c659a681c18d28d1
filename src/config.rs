use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analysis::forecast::{ForecastOptions, Predictor};
use crate::models::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Years to forecast when the caller does not say
    pub default_horizon: u32,
    /// Upper bound on any requested horizon
    pub max_horizon: u32,
    /// Most recent observations to fit on (0 = all)
    pub training_window: usize,
    pub compress_to_yearly: bool,
    pub backward: bool,
    pub predictor: Predictor,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_horizon: 5,
            max_horizon: 50,
            training_window: 0,
            compress_to_yearly: false,
            backward: false,
            predictor: Predictor::Linear,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl EngineSettings {
    /// Loads `.env` (if present) and overlays `FORECAST_*` variables on the defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = EngineSettings::default();

        let settings = EngineSettings {
            default_horizon: env_or("FORECAST_HORIZON", defaults.default_horizon)?,
            max_horizon: env_or("FORECAST_MAX_HORIZON", defaults.max_horizon)?,
            training_window: env_or("FORECAST_WINDOW", defaults.training_window)?,
            compress_to_yearly: env_or("FORECAST_COMPRESS", defaults.compress_to_yearly)?,
            backward: env_or("FORECAST_BACKWARD", defaults.backward)?,
            predictor: env_or("FORECAST_PREDICTOR", defaults.predictor)?,
        };
        tracing::debug!("Engine settings: {:?}", settings);
        Ok(settings)
    }

    /// Caps a requested horizon; `None` means "use the default".
    pub fn clamp_horizon(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_horizon)
            .min(self.max_horizon)
    }

    pub fn forecast_options(&self) -> ForecastOptions {
        ForecastOptions {
            predictor: self.predictor,
            direction: if self.backward {
                Direction::Backward
            } else {
                Direction::Forward
            },
            window: self.training_window,
        }
    }
}
