//! API route definitions.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::state::AppState;
use crate::forecast::{ForecastError, Observation, MAX_DAILY_COST};
use crate::storage::{self, CostRecord};

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/finops/forecast", get(stored_forecast).post(supplied_forecast))
        .route("/finops/trends", get(stored_trends))
        .route("/finops/costs", post(record_cost))
}

#[derive(Debug, Default, Deserialize)]
struct ForecastQuery {
    days: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ForecastRequest {
    history: Vec<Observation>,
    days: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn stored_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult {
    let history = load_history(&state).await?;
    let today = Utc::now().date_naive();
    forecast_response(&state, &history, query.days, today)
}

async fn supplied_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> ApiResult {
    let today = Utc::now().date_naive();
    forecast_response(&state, &request.history, request.days, today)
}

async fn stored_trends(State(state): State<AppState>) -> ApiResult {
    let history = load_history(&state).await?;
    match state.forecaster.analyze_trends(&history) {
        Ok(analysis) => Ok(envelope(&analysis, history.len())),
        Err(e) => degraded_or_rejected(e),
    }
}

async fn record_cost(
    State(state): State<AppState>,
    Json(record): Json<CostRecord>,
) -> ApiResult {
    if !record.amount.is_finite() || !(0.0..=MAX_DAILY_COST).contains(&record.amount) {
        return Err(rejection(
            StatusCode::BAD_REQUEST,
            format!("invalid cost amount {}", record.amount),
        ));
    }

    let pool = state.pool.clone();
    let saved = record.clone();
    tokio::task::spawn_blocking(move || storage::save_cost_record(&pool, &saved))
        .await
        .map_err(internal)?
        .map_err(internal)?;

    info!(service = %record.service, amount = record.amount, day = %record.incurred_on, "recorded cost");
    Ok(Json(json!({ "data": record, "meta": { "message": "recorded" } })))
}

fn forecast_response(
    state: &AppState,
    history: &[Observation],
    days: Option<usize>,
    today: NaiveDate,
) -> ApiResult {
    let settings = state.forecaster.settings();
    let days = days.unwrap_or(settings.horizon_days);
    let anchor = settings.anchor.resolve(today);

    match state.forecaster.forecast_days(history, days, anchor) {
        Ok(result) => Ok(envelope(&result, history.len())),
        Err(e) => degraded_or_rejected(e),
    }
}

/// Daily totals for the configured lookback, ending today.
async fn load_history(state: &AppState) -> Result<Vec<Observation>, (StatusCode, Json<Value>)> {
    let since = state.forecaster.settings().history_start(Utc::now().date_naive());
    let pool = state.pool.clone();

    tokio::task::spawn_blocking(move || storage::daily_costs(&pool, since))
        .await
        .map_err(internal)?
        .map_err(internal)
}

fn envelope<T: Serialize>(data: &T, history_days: usize) -> Json<Value> {
    Json(json!({
        "data": data,
        "meta": {
            "historyDays": history_days,
            "generatedAt": Utc::now().to_rfc3339()
        }
    }))
}

/// Short history still renders: it yields an empty payload with an
/// explanation. Malformed history is a client error.
fn degraded_or_rejected(e: ForecastError) -> ApiResult {
    let message = e.to_string();
    match e {
        ForecastError::InsufficientData { needed, have } => {
            warn!(needed, have, "not enough cost history to analyze");
            Ok(Json(json!({
                "data": null,
                "meta": {
                    "message": message,
                    "needed": needed,
                    "have": have
                }
            })))
        }
        _ => Err(rejection(StatusCode::BAD_REQUEST, message)),
    }
}

fn rejection(status: StatusCode, message: String) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "data": null, "error": { "message": message } })))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, Json<Value>) {
    error!(error = %e, "request failed");
    rejection(StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
}
