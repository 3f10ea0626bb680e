//! Z-score anomaly detection against a baseline of prior days.

use super::stats::CostSeries;
use super::{AnomalyResult, ForecastError, Severity};

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.5;

/// Judge `value` against `window`, which must not contain `value` itself.
///
/// A constant window (zero deviation) flags any differing value as a
/// critical anomaly and never flags a matching one.
pub fn detect_anomaly(
    value: f64,
    window: &[f64],
    threshold: f64,
) -> Result<AnomalyResult, ForecastError> {
    if window.is_empty() {
        return Err(ForecastError::EmptyWindow);
    }

    let baseline = CostSeries::new(window);
    let mean = baseline.mean();
    let std_dev = baseline.std_dev();
    let diff = value - mean;

    let score = if std_dev > 0.0 {
        diff.abs() / std_dev
    } else if diff == 0.0 {
        0.0
    } else {
        f64::INFINITY
    };

    // Zero-mean baselines have no meaningful relative deviation.
    let deviation = if mean != 0.0 { diff / mean * 100.0 } else { 0.0 };

    let severity = severity_for(score);
    let is_anomaly = score.is_infinite() || score > threshold;

    let reason = if value > mean {
        format!(
            "Cost spike: {:.1}% above expected daily cost of ${:.2}",
            deviation.abs(),
            mean
        )
    } else {
        format!(
            "Cost drop: {:.1}% below expected daily cost of ${:.2}",
            deviation.abs(),
            mean
        )
    };

    Ok(AnomalyResult {
        is_anomaly,
        score,
        severity,
        reason,
        expected_value: mean,
        actual_value: value,
        deviation,
    })
}

fn severity_for(score: f64) -> Severity {
    if score > 4.0 {
        Severity::Critical
    } else if score > 3.0 {
        Severity::High
    } else if score > 2.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // mean 10, population std dev 2
    const WINDOW: [f64; 8] = [8.0, 12.0, 8.0, 12.0, 8.0, 12.0, 8.0, 12.0];

    #[test]
    fn test_spike_and_drop_are_symmetric() {
        let spike = detect_anomaly(10.0 + 3.5 * 2.0, &WINDOW, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        let drop = detect_anomaly(10.0 - 3.5 * 2.0, &WINDOW, DEFAULT_ANOMALY_THRESHOLD).unwrap();

        for r in [&spike, &drop] {
            assert!(r.is_anomaly);
            assert_eq!(r.severity, Severity::High);
            assert!((r.score - 3.5).abs() < 1e-12);
            assert_eq!(r.expected_value, 10.0);
        }
        assert!(spike.reason.contains("spike"));
        assert!(spike.reason.contains("70.0%"));
        assert!(drop.reason.contains("drop"));
        assert!(drop.reason.contains("70.0%"));
        assert!((spike.deviation - 70.0).abs() < 1e-9);
        assert!((drop.deviation + 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_ladder() {
        assert_eq!(severity_for(4.01), Severity::Critical);
        assert_eq!(severity_for(4.0), Severity::High);
        assert_eq!(severity_for(3.0), Severity::Medium);
        assert_eq!(severity_for(2.5), Severity::Low);
        assert_eq!(severity_for(0.0), Severity::Low);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // z == 2.5 exactly is not over the threshold
        let r = detect_anomaly(15.0, &WINDOW, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        assert_eq!(r.score, 2.5);
        assert!(!r.is_anomaly);
        assert_eq!(r.severity, Severity::Low);

        let strict = detect_anomaly(15.0, &WINDOW, 2.0).unwrap();
        assert!(strict.is_anomaly);
    }

    #[test]
    fn test_tested_value_does_not_shift_baseline() {
        let calm = detect_anomaly(11.0, &WINDOW, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        let wild = detect_anomaly(1_000_000.0, &WINDOW, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        assert_eq!(calm.expected_value, 10.0);
        assert_eq!(wild.expected_value, 10.0);
        assert_eq!(wild.actual_value, 1_000_000.0);
    }

    #[test]
    fn test_constant_window() {
        let window = [100.0; 30];

        let spike = detect_anomaly(500.0, &window, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        assert!(spike.is_anomaly);
        assert!(spike.score.is_infinite());
        assert_eq!(spike.severity, Severity::Critical);
        assert!(spike.reason.contains("400.0%"));

        let same = detect_anomaly(100.0, &window, DEFAULT_ANOMALY_THRESHOLD).unwrap();
        assert!(!same.is_anomaly);
        assert_eq!(same.score, 0.0);
        assert_eq!(same.severity, Severity::Low);
        assert_eq!(same.deviation, 0.0);
    }

    #[test]
    fn test_zero_mean_window() {
        let r = detect_anomaly(5.0, &[0.0, 0.0, 0.0], DEFAULT_ANOMALY_THRESHOLD).unwrap();
        assert!(r.is_anomaly);
        assert_eq!(r.deviation, 0.0);
        assert!(r.deviation.is_finite());
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(
            detect_anomaly(1.0, &[], DEFAULT_ANOMALY_THRESHOLD),
            Err(ForecastError::EmptyWindow)
        );
    }
}
