/// A borrowed run of daily costs for statistical analysis.
#[derive(Debug, Clone, Copy)]
pub struct CostSeries<'a> {
    values: &'a [f64],
}

impl<'a> CostSeries<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by `n`).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self.values.iter().map(|&x| (x - mean).powi(2)).sum();
        sum_sq_diff / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Mean of the last `n` values, or `None` if the series is shorter.
    pub fn tail_mean(&self, n: usize) -> Option<f64> {
        let len = self.values.len();
        if n == 0 || len < n {
            return None;
        }
        Some(CostSeries::new(&self.values[len - n..]).mean())
    }

    /// Mean of the `n` values immediately before the last `n`.
    pub fn preceding_mean(&self, n: usize) -> Option<f64> {
        let len = self.values.len();
        if n == 0 || len < 2 * n {
            return None;
        }
        Some(CostSeries::new(&self.values[len - 2 * n..len - n]).mean())
    }
}

/// Percent change from `previous` to `current`, undefined when `previous` is zero.
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let s = CostSeries::new(&values);
        assert_eq!(s.mean(), 3.0);
        // Population variance of 1..5 is 2.0
        assert_eq!(s.variance(), 2.0);
        assert!((s.std_dev() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_series_is_zero() {
        let s = CostSeries::new(&[]);
        assert!(s.is_empty());
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.std_dev(), 0.0);
    }

    #[test]
    fn test_tail_and_preceding_means() {
        let values = [1.0, 1.0, 2.0, 2.0, 4.0, 4.0];
        let s = CostSeries::new(&values);
        assert_eq!(s.tail_mean(2), Some(4.0));
        assert_eq!(s.preceding_mean(2), Some(2.0));
        assert_eq!(s.preceding_mean(3), Some(4.0 / 3.0));
        assert_eq!(s.preceding_mean(4), None);
        assert_eq!(s.tail_mean(7), None);
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(100.0, 150.0), Some(50.0));
        assert_eq!(percent_change(200.0, 100.0), Some(-50.0));
        assert_eq!(percent_change(0.0, 10.0), None);
    }
}
