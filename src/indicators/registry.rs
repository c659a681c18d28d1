use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::analysis::statistics::Aggregator;
use crate::error::{EngineError, Result};
use crate::models::Frequency;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Category {
    Output,       // GDP & production
    Labor,        // Employment
    Prices,       // Inflation
    Demographics, // Population
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Output,
        Category::Labor,
        Category::Prices,
        Category::Demographics,
    ];
}

/// Defines how the indicator value should be formatted/displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnitType {
    /// Constant-price US dollars (e.g., 2.9e11 -> "$290B")
    ConstantUsd,
    /// Percentage (e.g., 4.26 -> "4.26%")
    Percent,
    /// Head count
    Persons,
}

impl UnitType {
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return "-".to_string();
        }
        match self {
            UnitType::ConstantUsd => {
                let abs = value.abs();
                if abs >= 1e12 {
                    format!("${:.2}T", value / 1e12)
                } else if abs >= 1e9 {
                    format!("${:.0}B", value / 1e9)
                } else if abs >= 1e6 {
                    format!("${:.1}M", value / 1e6)
                } else {
                    format!("${:.2}", value)
                }
            }
            UnitType::Percent => format!("{:.2}%", value),
            UnitType::Persons => {
                if value.abs() >= 1e6 {
                    format!("{:.2}M", value / 1e6)
                } else {
                    format!("{:.0}", value)
                }
            }
        }
    }
}

// ============================================================================
// METADATA STRUCT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorMetadata {
    pub slug: String,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    /// World Bank indicator id
    pub source_code: String,
    pub unit: UnitType,
    pub frequency: Frequency,
    /// Summary used when the map view does not ask for one
    pub default_aggregator: Aggregator,
}

macro_rules! ind {
    ($slug:expr, $name:expr, $cat:expr, $desc:expr, $code:expr, $unit:expr, $freq:expr, $agg:expr) => {
        IndicatorMetadata {
            slug: $slug.to_string(),
            name: $name.to_string(),
            category: $cat,
            description: Some($desc.to_string()),
            source_code: $code.to_string(),
            unit: $unit,
            frequency: $freq,
            default_aggregator: $agg,
        }
    };
}

// ============================================================================
// STATIC INDICATOR REGISTRY (Lazy initialization, O(1) lookup)
// ============================================================================

static INDICATORS: Lazy<Vec<IndicatorMetadata>> = Lazy::new(|| {
    vec![
        ind!("gdp", "GDP", Category::Output,
             "GDP at purchaser's prices, constant 2015 US$", "NY.GDP.MKTP.KD",
             UnitType::ConstantUsd, Frequency::Yearly, Aggregator::PercentChange),
        ind!("gdp_per_capita", "GDP per capita", Category::Output,
             "GDP divided by midyear population, constant 2015 US$", "NY.GDP.PCAP.KD",
             UnitType::ConstantUsd, Frequency::Yearly, Aggregator::AvgAnnualPercentChange),
        ind!("ur", "Unemployment Rate", Category::Labor,
             "Unemployment, total (% of total labor force), modeled ILO estimate", "SL.UEM.TOTL.ZS",
             UnitType::Percent, Frequency::Yearly, Aggregator::AvgOverRange),
        ind!("cpi", "Inflation Rate (CPI)", Category::Prices,
             "Inflation, consumer prices (annual %)", "FP.CPI.TOTL.ZG",
             UnitType::Percent, Frequency::Yearly, Aggregator::AvgOverRange),
        ind!("population", "Population", Category::Demographics,
             "Total population, de facto definition", "SP.POP.TOTL",
             UnitType::Persons, Frequency::Yearly, Aggregator::AvgAnnualChange),
    ]
});

/// slug -> index
static INDICATOR_MAP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    INDICATORS
        .iter()
        .enumerate()
        .map(|(idx, ind)| (ind.slug.clone(), idx))
        .collect()
});

/// World Bank code -> index
static CODE_MAP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    INDICATORS
        .iter()
        .enumerate()
        .map(|(idx, ind)| (ind.source_code.clone(), idx))
        .collect()
});

// ============================================================================
// REGISTRY STRUCT & IMPL
// ============================================================================

pub struct Registry;

impl Registry {
    pub fn get_available_indicators() -> &'static [IndicatorMetadata] {
        &INDICATORS
    }

    pub fn get_by_category(category: Category) -> Vec<IndicatorMetadata> {
        INDICATORS
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect()
    }

    pub fn get_metadata(slug: &str) -> Option<&'static IndicatorMetadata> {
        INDICATOR_MAP.get(slug).map(|&idx| &INDICATORS[idx])
    }

    pub fn get_by_code(code: &str) -> Option<&'static IndicatorMetadata> {
        CODE_MAP.get(code).map(|&idx| &INDICATORS[idx])
    }

    /// Accepts either a slug ("gdp") or a World Bank code ("NY.GDP.MKTP.KD").
    pub fn resolve(slug_or_code: &str) -> Result<&'static IndicatorMetadata> {
        Self::get_metadata(slug_or_code)
            .or_else(|| Self::get_by_code(slug_or_code))
            .ok_or_else(|| EngineError::UnknownIndicator(slug_or_code.to_string()))
    }

    /// Key used for an indicator in reports: its slug when registered,
    /// otherwise the raw World Bank code.
    pub fn display_key(code: &str) -> String {
        Self::get_by_code(code)
            .map(|m| m.slug.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_slug_and_code() {
        let gdp = Registry::get_metadata("gdp").unwrap();
        assert_eq!(gdp.source_code, "NY.GDP.MKTP.KD");
        assert_eq!(Registry::get_by_code("SL.UEM.TOTL.ZS").unwrap().slug, "ur");
        assert_eq!(Registry::resolve("FP.CPI.TOTL.ZG").unwrap().slug, "cpi");
        assert!(matches!(
            Registry::resolve("bogus"),
            Err(EngineError::UnknownIndicator(_))
        ));
    }

    #[test]
    fn test_slugs_and_codes_are_unique() {
        let all = Registry::get_available_indicators();
        assert_eq!(INDICATOR_MAP.len(), all.len());
        assert_eq!(CODE_MAP.len(), all.len());
    }

    #[test]
    fn test_display_key_falls_back_to_code() {
        assert_eq!(Registry::display_key("NY.GDP.MKTP.KD"), "gdp");
        assert_eq!(Registry::display_key("EN.ATM.CO2E.KT"), "EN.ATM.CO2E.KT");
    }

    #[test]
    fn test_get_by_category() {
        let output = Registry::get_by_category(Category::Output);
        assert_eq!(output.len(), 2);

        let covered: usize = Category::ALL
            .into_iter()
            .map(|c| Registry::get_by_category(c).len())
            .sum();
        assert_eq!(covered, Registry::get_available_indicators().len());
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(UnitType::ConstantUsd.format(2.9e11), "$290B");
        assert_eq!(UnitType::ConstantUsd.format(1.25e12), "$1.25T");
        assert_eq!(UnitType::Percent.format(4.256), "4.26%");
        assert_eq!(UnitType::Persons.format(5_500_000.0), "5.50M");
        assert_eq!(UnitType::Persons.format(f64::NAN), "-");
    }
}
