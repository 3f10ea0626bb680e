//! costforecast -- daily cost forecasting and anomaly detection for FinOps dashboards.
//!
//! The [`forecast`] module is the pure computation core. [`storage`],
//! [`api`] and [`config`] wrap it into a small service that aggregates raw
//! cost records per day and serves forecasts over HTTP.

pub mod api;
pub mod config;
pub mod forecast;
pub mod storage;

use anyhow::Result;

use crate::config::AppConfig;
use crate::forecast::CostForecaster;

/// Start the HTTP API backed by the configured cost database.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let db_path = config.storage.db_path.display().to_string();
    tracing::info!(%db_path, "Initializing database");
    let pool = storage::open_pool(&config.storage.db_path)?;

    let forecaster = CostForecaster::new(config.forecast.clone());
    let app = api::router(api::state::AppState::new(pool, forecaster));

    let addr: std::net::SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "costforecast listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
