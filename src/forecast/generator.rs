//! Forecast generation: trend fit, confidence bounds, historical anomaly
//! pass and horizon extrapolation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::anomaly::{detect_anomaly, DEFAULT_ANOMALY_THRESHOLD};
use super::regression::{classify_trend, fit_trend};
use super::stats::CostSeries;
use super::trends;
use super::{
    validate_history, ForecastError, ForecastPoint, ForecastResult, Observation, TrendAnalysis,
};

/// z value for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Longest horizon a single forecast may request.
pub const MAX_HORIZON_DAYS: usize = 3650;

/// How future dates in the horizon are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastAnchor {
    /// Day `i` of the horizon is `last observed date + i + 1`.
    #[default]
    LastObservation,
    /// Day `i` of the horizon is `date + i + 1`.
    Date(NaiveDate),
}

/// Which anchor the adapters use when dating the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    #[default]
    LastObservation,
    Today,
}

impl AnchorMode {
    pub fn resolve(self, today: NaiveDate) -> ForecastAnchor {
        match self {
            AnchorMode::LastObservation => ForecastAnchor::LastObservation,
            AnchorMode::Today => ForecastAnchor::Date(today),
        }
    }
}

/// Tunables for forecasting and anomaly detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Days to project beyond the history.
    pub horizon_days: usize,
    /// Days of history the adapters load from storage.
    pub history_days: usize,
    /// Z-score above which a day is flagged.
    pub anomaly_threshold: f64,
    /// Maximum number of prior days in an anomaly baseline.
    pub anomaly_window: usize,
    /// Leading days that are never judged for anomalies.
    pub anomaly_lead_in: usize,
    pub anchor: AnchorMode,
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ForecastError::InvalidSettings(format!(
                "horizon_days must be at most {}",
                MAX_HORIZON_DAYS
            )));
        }
        if self.anomaly_window == 0 {
            return Err(ForecastError::InvalidSettings(
                "anomaly_window must be at least 1".to_string(),
            ));
        }
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold < 0.0 {
            return Err(ForecastError::InvalidSettings(format!(
                "anomaly_threshold must be finite and non-negative, got {}",
                self.anomaly_threshold
            )));
        }
        Ok(())
    }

    /// First day of the stored history to load, `history_days` back from
    /// `today` inclusive. Saturates at the earliest representable date.
    pub fn history_start(&self, today: NaiveDate) -> NaiveDate {
        let lookback = self.history_days.saturating_sub(1) as u64;
        today
            .checked_sub_days(Days::new(lookback))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            history_days: 60,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            anomaly_window: 30,
            anomaly_lead_in: 7,
            anchor: AnchorMode::LastObservation,
        }
    }
}

/// Forecast `days_to_forecast` days past `history` with default settings.
pub fn generate_forecast(
    history: &[Observation],
    days_to_forecast: usize,
) -> Result<ForecastResult, ForecastError> {
    CostForecaster::default().forecast_days(history, days_to_forecast, ForecastAnchor::LastObservation)
}

#[derive(Debug, Clone, Default)]
pub struct CostForecaster {
    settings: ForecastSettings,
}

impl CostForecaster {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Forecast the configured horizon, anchored to the last observation.
    pub fn forecast(&self, history: &[Observation]) -> Result<ForecastResult, ForecastError> {
        self.forecast_days(history, self.settings.horizon_days, ForecastAnchor::LastObservation)
    }

    pub fn analyze_trends(&self, history: &[Observation]) -> Result<TrendAnalysis, ForecastError> {
        trends::analyze_with_threshold(history, self.settings.anomaly_threshold)
    }

    pub fn forecast_days(
        &self,
        history: &[Observation],
        days: usize,
        anchor: ForecastAnchor,
    ) -> Result<ForecastResult, ForecastError> {
        validate_history(history)?;
        let values: Vec<f64> = history.iter().map(|o| o.actual).collect();

        let fit = fit_trend(&values)?;

        // validate_history and fit_trend guarantee at least two observations
        let start = match anchor {
            ForecastAnchor::LastObservation => history[history.len() - 1].date,
            ForecastAnchor::Date(date) => date,
        };
        let future_dates = horizon_dates(start, days)?;

        let series = CostSeries::new(&values);
        let mean = series.mean();
        let confidence = fit.confidence(&values);
        let trend = classify_trend(fit.slope, mean);
        let interval = Z_95 * series.std_dev();

        debug!(
            points = values.len(),
            slope = fit.slope,
            intercept = fit.intercept,
            confidence,
            ?trend,
            "fitted cost trend"
        );

        let flagged = self.flag_anomalies(&values)?;

        let mut forecast = Vec::with_capacity(history.len() + days);
        let mut anomalies = Vec::new();
        for (i, obs) in history.iter().enumerate() {
            let predicted = fit.predict(i);
            let point = ForecastPoint {
                date: obs.date,
                actual: Some(obs.actual),
                predicted,
                lower_bound: (predicted - interval).max(0.0),
                upper_bound: (predicted + interval).max(0.0),
                is_anomaly: flagged[i],
            };
            if point.is_anomaly {
                anomalies.push(point.clone());
            }
            forecast.push(point);
        }

        let mut total_predicted = 0.0;
        for (i, date) in future_dates.into_iter().enumerate() {
            let predicted = fit.predict(values.len() + i).max(0.0);
            total_predicted += predicted;
            forecast.push(ForecastPoint {
                date,
                actual: None,
                predicted,
                lower_bound: (predicted - interval).max(0.0),
                upper_bound: (predicted + interval).max(0.0),
                is_anomaly: false,
            });
        }

        debug!(
            horizon = days,
            total_predicted,
            anomalies = anomalies.len(),
            "generated forecast"
        );

        Ok(ForecastResult {
            forecast,
            trend,
            confidence,
            total_predicted,
            anomalies,
        })
    }

    /// Judge each day after the lead-in against up to `anomaly_window`
    /// strictly earlier days.
    fn flag_anomalies(&self, values: &[f64]) -> Result<Vec<bool>, ForecastError> {
        let lead_in = self.settings.anomaly_lead_in.max(1);
        let mut flagged = vec![false; values.len()];
        for i in lead_in..values.len() {
            let window = &values[i.saturating_sub(self.settings.anomaly_window)..i];
            flagged[i] = detect_anomaly(values[i], window, self.settings.anomaly_threshold)?.is_anomaly;
        }
        Ok(flagged)
    }
}

/// Dates `start + 1 ..= start + days`, bounded by [`MAX_HORIZON_DAYS`] and
/// the calendar range.
fn horizon_dates(start: NaiveDate, days: usize) -> Result<Vec<NaiveDate>, ForecastError> {
    let out_of_range = || ForecastError::HorizonOutOfRange {
        days,
        max: MAX_HORIZON_DAYS,
        start,
    };
    if days > MAX_HORIZON_DAYS {
        return Err(out_of_range());
    }
    (1..=days as u64)
        .map(|offset| start.checked_add_days(Days::new(offset)).ok_or_else(out_of_range))
        .collect()
}
