//! Command-line entry point.
//!
//! Runs one aggregation over the three simulated reference sources and
//! prints the average temperature and the fastest source.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use weather_aggregator::config::{AppConfig, LoggingSettings};
use weather_aggregator::{Location, WeatherAggregationEngine, WeatherReport, reference_sources};

#[derive(Debug, Parser)]
#[command(name = "weather-aggregator")]
#[command(about = "Aggregates temperature readings from several unreliable sources")]
struct Cli {
    /// Location to query
    #[arg(short, long, default_value = "London")]
    location: String,

    /// Global timeout in milliseconds (overrides configuration)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries per source call (overrides configuration)
    #[arg(long)]
    retries: Option<u32>,

    /// Seed for the simulated sources (overrides configuration)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to config/weather.toml when present)
    #[arg(short, long, env = "WEATHER_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(settings: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn print_report(report: &WeatherReport, json: bool) -> Result<()> {
    if json {
        let body = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        println!("{body}");
    } else {
        println!("Average temperature: {}", report.average_temperature());
        println!("Fastest source: {}", report.fastest_source());
    }
    Ok(())
}

async fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    if let Some(timeout_ms) = cli.timeout_ms {
        config.aggregation.timeout_ms = timeout_ms;
    }
    if let Some(retries) = cli.retries {
        config.aggregation.source_retries = retries;
    }
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }
    config.validate()?;

    let sources = reference_sources(config.simulation_profile(), config.simulation.seed);
    let engine = WeatherAggregationEngine::new(sources, config.aggregation_config())?;

    let report = engine
        .get_aggregated_weather(&Location::new(cli.location))
        .await?;
    print_report(&report, cli.json)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "weather aggregation failed");
            eprintln!("Failed to fetch weather data.");
            ExitCode::FAILURE
        }
    }
}
