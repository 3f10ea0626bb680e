//! Week-over-week and month-over-month cost deltas with dashboard insights.

use tracing::debug;

use super::anomaly::{detect_anomaly, DEFAULT_ANOMALY_THRESHOLD};
use super::stats::{percent_change, CostSeries};
use super::{validate_history, ForecastError, Observation, TrendAnalysis};

const WEEK: usize = 7;
const MONTH: usize = 30;

const WEEKLY_ALERT_PCT: f64 = 10.0;
const MONTHLY_ALERT_PCT: f64 = 15.0;

/// Summarise recent cost movement in `history`.
pub fn analyze_cost_trends(history: &[Observation]) -> Result<TrendAnalysis, ForecastError> {
    analyze_with_threshold(history, DEFAULT_ANOMALY_THRESHOLD)
}

pub(crate) fn analyze_with_threshold(
    history: &[Observation],
    threshold: f64,
) -> Result<TrendAnalysis, ForecastError> {
    validate_history(history)?;
    if history.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, have: 0 });
    }

    let values: Vec<f64> = history.iter().map(|o| o.actual).collect();
    let series = CostSeries::new(&values);

    let week_over_week_change = period_change(&series, WEEK);
    let month_over_month_change = period_change(&series, MONTH);

    let mut insights = Vec::new();

    if let Some(wow) = week_over_week_change {
        if wow > WEEKLY_ALERT_PCT {
            insights.push(format!(
                "Weekly costs up {:.1}% compared to the previous week",
                wow
            ));
        } else if wow < -WEEKLY_ALERT_PCT {
            insights.push(format!(
                "Weekly costs down {:.1}% compared to the previous week",
                wow.abs()
            ));
        }
    }

    if let Some(mom) = month_over_month_change {
        if mom > MONTHLY_ALERT_PCT {
            insights.push(format!(
                "Significant monthly increase: costs up {:.1}% over the previous 30 days",
                mom
            ));
        }
    }

    // Latest day against the 23 days before the most recent week.
    let n = values.len();
    let baseline = &values[n.saturating_sub(MONTH)..n.saturating_sub(WEEK)];
    if let (Some(&latest), false) = (values.last(), baseline.is_empty()) {
        let result = detect_anomaly(latest, baseline, threshold)?;
        if result.is_anomaly {
            insights.push(result.reason);
        }
    }

    if insights.is_empty() {
        insights.push("Costs are trending normally".to_string());
    }

    debug!(
        days = n,
        ?week_over_week_change,
        ?month_over_month_change,
        insights = insights.len(),
        "analyzed cost trends"
    );

    Ok(TrendAnalysis {
        average_daily_cost: series.mean(),
        week_over_week_change,
        month_over_month_change,
        insights,
    })
}

fn period_change(series: &CostSeries<'_>, days: usize) -> Option<f64> {
    let previous = series.preceding_mean(days)?;
    let current = series.tail_mean(days)?;
    percent_change(previous, current)
}
