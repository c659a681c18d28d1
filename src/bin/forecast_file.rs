use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use indicator_forecaster_lib::analysis::{Aggregator, Predictor};
use indicator_forecaster_lib::config::EngineSettings;
use indicator_forecaster_lib::core::orchestrator;
use indicator_forecaster_lib::indicators::registry::{Category, IndicatorMetadata, Registry};
use indicator_forecaster_lib::ingest::worldbank;

/// Forecast every country/indicator found in a saved World Bank response.
#[derive(Debug, Parser)]
#[command(name = "forecast_file")]
struct Args {
    /// Path to a JSON body from api.worldbank.org/v2/country/.../indicator/...
    #[arg(required_unless_present = "list")]
    payload: Option<PathBuf>,

    /// Print the known indicators and exit
    #[arg(long)]
    list: bool,

    /// Only show one indicator (slug like "gdp" or a World Bank code)
    #[arg(long)]
    indicator: Option<String>,

    /// Years to forecast (capped by FORECAST_MAX_HORIZON)
    #[arg(long)]
    horizon: Option<u32>,

    /// Fit only the most recent N observations
    #[arg(long)]
    window: Option<usize>,

    /// Extend into the past instead of the future
    #[arg(long)]
    backward: bool,

    /// Average quarterly/monthly data into years first
    #[arg(long)]
    compress: bool,

    /// linear | growth
    #[arg(long)]
    predictor: Option<Predictor>,

    /// Aggregate for --begin..--end (pct_change, avg_pct_change, avg_change, avg);
    /// defaults to each indicator's own
    #[arg(long, requires_all = ["begin", "end"])]
    aggregate: Option<Aggregator>,

    #[arg(long, requires = "end")]
    begin: Option<String>,

    #[arg(long)]
    end: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list {
        print_registry();
        return Ok(());
    }
    let Some(payload) = args.payload.as_ref() else {
        anyhow::bail!("A payload file is required");
    };
    let only = args
        .indicator
        .as_deref()
        .map(Registry::resolve)
        .transpose()?
        .map(|m| m.slug.as_str());

    let mut settings = EngineSettings::from_env()?;
    if let Some(window) = args.window {
        settings.training_window = window;
    }
    if let Some(predictor) = args.predictor {
        settings.predictor = predictor;
    }
    settings.backward |= args.backward;
    settings.compress_to_yearly |= args.compress;

    let body = std::fs::read_to_string(payload)
        .with_context(|| format!("Failed to read {}", payload.display()))?;
    let mut records = worldbank::parse_payload(&body).context("Failed to decode World Bank payload")?;
    if let Some(slug) = only {
        records.retain(|r| Registry::display_key(&r.indicator) == slug);
    }
    tracing::info!("Loaded {} observations from {}", records.len(), payload.display());

    let reports = orchestrator::build_country_reports(records, &settings, args.horizon).await;

    println!("\n{:<8} | {:<16} | {:<10} | {:>18}", "Country", "Indicator", "Period", "Value");
    println!("{}", "-".repeat(62));

    for report in &reports {
        for (key, forecast) in &report.forecasts {
            let meta = Registry::get_metadata(key);
            let name = meta.map(|m| m.name.as_str()).unwrap_or(key.as_str());
            for (period, value) in forecast.iter() {
                let shown = match (value, meta) {
                    (Some(v), Some(m)) => m.unit.format(v),
                    (Some(v), None) => format!("{:.4}", v),
                    (None, _) => "-".to_string(),
                };
                println!("{:<8} | {:<16} | {:<10} | {:>18}", report.entity, name, period, shown);
            }
        }
        for (key, reason) in &report.errors {
            println!("{:<8} | {:<16} | failed: {}", report.entity, key, reason);
        }

        if let (Some(begin), Some(end)) = (&args.begin, &args.end) {
            for (key, series) in &report.indicators {
                let Some(aggregator) = args
                    .aggregate
                    .or_else(|| Registry::get_metadata(key).map(|m| m.default_aggregator))
                else {
                    println!("{:<8} | {:<16} | no aggregate (pass --aggregate)", report.entity, key);
                    continue;
                };
                match aggregator.apply(series, begin, end) {
                    Ok(v) => println!("{:<8} | {:<16} | {} {}..{} = {:.4}", report.entity, key, aggregator, begin, end, v),
                    Err(e) => println!("{:<8} | {:<16} | {} unavailable: {}", report.entity, key, aggregator, e),
                }
            }
        }
    }

    println!("\nDone.");
    Ok(())
}

fn print_registry() {
    println!("{} indicators\n", Registry::get_available_indicators().len());
    for category in Category::ALL {
        println!("[{:?}]", category);
        for m in Registry::get_by_category(category) {
            print_indicator(&m);
        }
    }
}

fn print_indicator(m: &IndicatorMetadata) {
    println!(
        "  {:<16} {:<16} {:?}/{:?}, default {}",
        m.slug, m.source_code, m.unit, m.frequency, m.default_aggregator
    );
    if let Some(desc) = &m.description {
        println!("  {:<16} {}", "", desc);
    }
}
