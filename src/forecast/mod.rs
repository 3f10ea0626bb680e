//! Cost forecasting and anomaly detection over daily cost history.
//!
//! The entry points are [`generate_forecast`] and [`analyze_cost_trends`].
//! Both take a chronologically sorted slice of [`Observation`]s (one per
//! calendar day) and return plain data for the dashboard to render.
//! Everything in here is pure and synchronous; the only calendar input is
//! the [`ForecastAnchor`] used to date future points.

pub mod anomaly;
pub mod generator;
pub mod regression;
pub mod stats;
pub mod trends;

pub use self::anomaly::{detect_anomaly, DEFAULT_ANOMALY_THRESHOLD};
pub use self::generator::{
    generate_forecast, AnchorMode, CostForecaster, ForecastAnchor, ForecastSettings,
    MAX_HORIZON_DAYS,
};
pub use self::regression::{fit_trend, LinearTrend};
pub use self::trends::analyze_cost_trends;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient data: need {needed} observations, have {have}")]
    InsufficientData { needed: usize, have: usize },

    #[error("invalid cost {value} on {date}: costs must be finite, non-negative and at most 1e15")]
    InvalidCost { date: NaiveDate, value: f64 },

    #[error("observations out of order: {next} follows {previous}")]
    UnorderedDates { previous: NaiveDate, next: NaiveDate },

    #[error("anomaly baseline window is empty")]
    EmptyWindow,

    #[error("forecast horizon of {days} days is out of range (at most {max} days past {start})")]
    HorizonOutOfRange {
        days: usize,
        max: usize,
        start: NaiveDate,
    },

    #[error("invalid forecast settings: {0}")]
    InvalidSettings(String),
}

/// Largest daily cost accepted. Squared sums over a long history stay
/// finite below this.
pub const MAX_DAILY_COST: f64 = 1e15;

/// One day's total cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub actual: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, actual: f64) -> Self {
        Self { date, actual }
    }
}

/// A point on the forecast chart.
///
/// Historical points carry the observed cost in `actual`; points in the
/// forecast horizon have `actual: None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub is_anomaly: bool,
}

impl ForecastPoint {
    pub fn is_future(&self) -> bool {
        self.actual.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Historical reconstruction followed by the forecast horizon.
    pub forecast: Vec<ForecastPoint>,
    pub trend: Trend,
    /// Goodness of fit (R² as a percentage), always within `[0, 100]`.
    pub confidence: f64,
    /// Sum of predictions over the forecast horizon only.
    pub total_predicted: f64,
    pub anomalies: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Points beyond the end of the supplied history.
    pub fn future(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.forecast.iter().filter(|p| p.is_future())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// Z-score magnitude. Infinite when the baseline is constant and the
    /// value differs from it.
    pub score: f64,
    pub severity: Severity,
    pub reason: String,
    pub expected_value: f64,
    pub actual_value: f64,
    /// Signed percentage difference from the baseline mean.
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub average_daily_cost: f64,
    /// `None` with fewer than 14 days of history.
    pub week_over_week_change: Option<f64>,
    /// `None` with fewer than 60 days of history.
    pub month_over_month_change: Option<f64>,
    pub insights: Vec<String>,
}

/// Reject costs that are negative, non-finite or above [`MAX_DAILY_COST`],
/// and dates that are not strictly ascending.
pub fn validate_history(history: &[Observation]) -> Result<(), ForecastError> {
    for obs in history {
        if !obs.actual.is_finite() || obs.actual < 0.0 || obs.actual > MAX_DAILY_COST {
            return Err(ForecastError::InvalidCost {
                date: obs.date,
                value: obs.actual,
            });
        }
    }
    for pair in history.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(ForecastError::UnorderedDates {
                previous: pair[0].date,
                next: pair[1].date,
            });
        }
    }
    Ok(())
}
