//! Ordinary least squares trend fitting.
//!
//! The x-coordinate is the zero-based day index, so calendar gaps are not
//! modelled as time gaps.

use super::stats::CostSeries;
use super::{ForecastError, Trend};

/// Slope above `mean * TREND_RATIO` counts as increasing, below its
/// negation as decreasing.
pub const TREND_RATIO: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    pub fn predict(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    /// Goodness of fit as a percentage in `[0, 100]`.
    ///
    /// A constant series has no variance to explain: it scores 100 when the
    /// fit reproduces it exactly and 0 otherwise.
    pub fn confidence(&self, values: &[f64]) -> f64 {
        let mean = CostSeries::new(values).mean();
        let ss_tot: f64 = values.iter().map(|&y| (y - mean).powi(2)).sum();
        let ss_res: f64 = values
            .iter()
            .enumerate()
            .map(|(i, &y)| (y - self.predict(i)).powi(2))
            .sum();

        if ss_tot == 0.0 {
            let tolerance = f64::EPSILON * values.len() as f64 * mean.abs().max(1.0).powi(2);
            return if ss_res <= tolerance { 100.0 } else { 0.0 };
        }

        let r_squared = 1.0 - ss_res / ss_tot;
        if r_squared.is_nan() {
            return 0.0;
        }
        (r_squared * 100.0).clamp(0.0, 100.0)
    }
}

/// Fit `y = slope * i + intercept` to `values` by least squares.
pub fn fit_trend(values: &[f64]) -> Result<LinearTrend, ForecastError> {
    if values.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            have: values.len(),
        });
    }

    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    Ok(LinearTrend { slope, intercept })
}

/// Classify a fitted slope relative to the series mean.
pub fn classify_trend(slope: f64, mean: f64) -> Trend {
    let threshold = mean * TREND_RATIO;
    if slope > threshold {
        Trend::Increasing
    } else if slope < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_line() {
        let values: Vec<f64> = (0..20).map(|i| 3.5 * i as f64 + 12.0).collect();
        let fit = fit_trend(&values).unwrap();
        assert!((fit.slope - 3.5).abs() < 1e-9);
        assert!((fit.intercept - 12.0).abs() < 1e-9);
        assert!((fit.confidence(&values) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_points() {
        let fit = fit_trend(&[10.0, 4.0]).unwrap();
        assert_eq!(fit.slope, -6.0);
        assert_eq!(fit.intercept, 10.0);
        assert_eq!(fit.predict(2), -2.0);
    }

    #[test]
    fn test_rejects_short_input() {
        assert_eq!(
            fit_trend(&[]),
            Err(ForecastError::InsufficientData { needed: 2, have: 0 })
        );
        assert_eq!(
            fit_trend(&[42.0]),
            Err(ForecastError::InsufficientData { needed: 2, have: 1 })
        );
    }

    #[test]
    fn test_constant_series_confidence() {
        let values = [100.0; 14];
        let fit = fit_trend(&values).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.confidence(&values), 100.0);

        let off = LinearTrend {
            slope: 1.0,
            intercept: 100.0,
        };
        assert_eq!(off.confidence(&values), 0.0);
    }

    #[test]
    fn test_poor_fit_is_clamped_to_zero() {
        let values = [1.0, 9.0, 1.0, 9.0];
        let bad = LinearTrend {
            slope: -50.0,
            intercept: 0.0,
        };
        assert_eq!(bad.confidence(&values), 0.0);
    }

    #[test]
    fn test_noisy_confidence_in_range() {
        let values = [10.0, 14.0, 9.0, 15.0, 11.0, 18.0, 12.0];
        let fit = fit_trend(&values).unwrap();
        let c = fit.confidence(&values);
        assert!(c > 0.0 && c < 100.0, "confidence {c}");
    }

    #[test]
    fn test_trend_boundary() {
        // Threshold for mean 100 is exactly 1.0
        assert_eq!(classify_trend(1.0, 100.0), Trend::Stable);
        assert_eq!(classify_trend(-1.0, 100.0), Trend::Stable);
        assert_eq!(classify_trend(1.0001, 100.0), Trend::Increasing);
        assert_eq!(classify_trend(-1.0001, 100.0), Trend::Decreasing);
        assert_eq!(classify_trend(0.0, 0.0), Trend::Stable);
    }

    #[test]
    fn test_fitted_boundary_series_is_stable() {
        // 95..=105: mean 100, slope exactly 1
        let values: Vec<f64> = (95..=105).map(f64::from).collect();
        let fit = fit_trend(&values).unwrap();
        assert_eq!(fit.slope, 1.0);
        assert_eq!(classify_trend(fit.slope, CostSeries::new(&values).mean()), Trend::Stable);
    }
}
