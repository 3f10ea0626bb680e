use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use costforecast::config::{AppConfig, LoggingConfig};
use costforecast::forecast::{CostForecaster, ForecastError, Observation};
use costforecast::storage::{self, CostRecord};

#[derive(Parser)]
#[command(
    name = "costforecast",
    about = "Daily cost forecasting and anomaly detection for FinOps dashboards",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Forecast daily costs
    Forecast {
        /// JSON file of [{"date": "YYYY-MM-DD", "actual": 1.0}, ...];
        /// the stored history is used when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Days to forecast (overrides forecast.horizon_days)
        #[arg(long)]
        days: Option<usize>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Week-over-week and month-over-month cost trends
    Trends {
        /// JSON file of daily observations; the stored history is used when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Record a raw cost line item
    Record {
        /// Day the cost was incurred (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Cost amount
        #[arg(long)]
        amount: f64,

        /// Service the cost belongs to
        #[arg(long, default_value = "unallocated")]
        service: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let forecaster = CostForecaster::new(config.forecast.clone());
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting costforecast API");
            costforecast::serve(&config).await?;
        }
        Commands::Forecast { input, days, json } => {
            let history = load_history(&config, input.as_deref(), today)?;
            let days = days.unwrap_or(config.forecast.horizon_days);
            let anchor = config.forecast.anchor.resolve(today);
            tracing::info!(history = history.len(), days, "Running forecast");

            let result = match forecaster.forecast_days(&history, days, anchor) {
                Ok(r) => r,
                Err(e @ ForecastError::InsufficientData { .. }) => {
                    println!("Forecast unavailable: {}", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("\n=== Cost Forecast ===");
                println!("Trend:        {:?}", result.trend);
                println!("Confidence:   {:.1}%", result.confidence);
                println!("Next {} days: ${:.2}", days, result.total_predicted);
                println!("Anomalies:    {}", result.anomalies.len());
                for a in &result.anomalies {
                    println!(
                        " - {}  ${:.2} (trend ${:.2})",
                        a.date,
                        a.actual.unwrap_or_default(),
                        a.predicted
                    );
                }
                if days > 0 {
                    println!();
                    println!("{:<12} | {:>12} | {:>12} | {:>12}", "Date", "Predicted", "Lower", "Upper");
                    println!("{:-<12}-|-{:->12}-|-{:->12}-|-{:->12}", "", "", "", "");
                    for p in result.future() {
                        println!(
                            "{:<12} | {:>12.2} | {:>12.2} | {:>12.2}",
                            p.date, p.predicted, p.lower_bound, p.upper_bound
                        );
                    }
                }
                println!();
            }
        }
        Commands::Trends { input, json } => {
            let history = load_history(&config, input.as_deref(), today)?;
            tracing::info!(history = history.len(), "Analyzing cost trends");

            let analysis = match forecaster.analyze_trends(&history) {
                Ok(a) => a,
                Err(e @ ForecastError::InsufficientData { .. }) => {
                    println!("Trend analysis unavailable: {}", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                let pct = |v: Option<f64>| match v {
                    Some(v) => format!("{:+.1}%", v),
                    None => "n/a".to_string(),
                };
                println!("\n=== Cost Trends ===");
                println!("Average daily cost: ${:.2}", analysis.average_daily_cost);
                println!("Week over week:     {}", pct(analysis.week_over_week_change));
                println!("Month over month:   {}", pct(analysis.month_over_month_change));
                println!("\nInsights:");
                for insight in &analysis.insights {
                    println!(" - {}", insight);
                }
                println!();
            }
        }
        Commands::Record {
            date,
            amount,
            service,
        } => {
            let pool = storage::open_pool(&config.storage.db_path)?;
            storage::save_cost_record(
                &pool,
                &CostRecord {
                    service: service.clone(),
                    amount,
                    incurred_on: date,
                },
            )?;
            println!("Recorded ${:.2} for '{}' on {}.", amount, service, date);
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Observations from `input`, or the stored daily totals for the configured lookback.
fn load_history(config: &AppConfig, input: Option<&Path>, today: NaiveDate) -> Result<Vec<Observation>> {
    if let Some(path) = input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("failed to parse observations in {}", path.display()));
    }

    let pool = storage::open_pool(&config.storage.db_path)?;
    storage::daily_costs(&pool, config.forecast.history_start(today))
}
