//! Statistics Calculator Module
//! Descriptive statistics, deltas and correlation for precipitation series.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Descriptive statistics for a precipitation sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for DescriptiveStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p05: f64::NAN,
            p25: f64::NAN,
            p75: f64::NAN,
            p95: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    ///
    /// Non-finite values are ignored. An empty sample yields NaN fields.
    pub fn compute_descriptive_stats(values: &[f64]) -> DescriptiveStats {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = sorted.len();
        if n == 0 {
            return DescriptiveStats::default();
        }
        sorted.sort_by(f64::total_cmp);

        let variance = if n > 1 { sorted.iter().variance() } else { 0.0 };

        DescriptiveStats {
            count: n,
            mean: sorted.iter().mean(),
            median: Self::percentile(&sorted, 50.0),
            std: variance.sqrt(),
            variance,
            p05: Self::percentile(&sorted, 5.0),
            p25: Self::percentile(&sorted, 25.0),
            p75: Self::percentile(&sorted, 75.0),
            p95: Self::percentile(&sorted, 95.0),
            min: sorted[0],
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Difference to the previous value; the first position has none.
    pub fn deltas(values: &[f64]) -> Vec<Option<f64>> {
        std::iter::once(None)
            .chain(values.windows(2).map(|pair| Some(pair[1] - pair[0])))
            .take(values.len())
            .collect()
    }

    /// Pearson correlation of two equally long samples.
    ///
    /// `None` for fewer than two pairs or when either side has no variance.
    pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let std_x = x.iter().std_dev();
        let std_y = y.iter().std_dev();
        if !(std_x > 0.0 && std_y > 0.0) {
            return None;
        }
        let r = x.iter().covariance(y.iter()) / (std_x * std_y);
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptive_stats() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0, 5.0]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert!((stats.variance - 2.5).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.p95 - 4.8).abs() < 1e-12);
        assert!((stats.p05 - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_and_single_sample() {
        let empty = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());

        let single = StatsCalculator::compute_descriptive_stats(&[7.0, f64::NAN]);
        assert_eq!(single.count, 1);
        assert_eq!(single.median, 7.0);
        assert_eq!(single.variance, 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(StatsCalculator::percentile(&sorted, 50.0), 2.5);
        assert_eq!(StatsCalculator::percentile(&sorted, 100.0), 4.0);
    }

    #[test]
    fn test_deltas() {
        assert_eq!(
            StatsCalculator::deltas(&[10.0, 12.0, 9.0]),
            vec![None, Some(2.0), Some(-3.0)]
        );
        assert!(StatsCalculator::deltas(&[]).is_empty());
    }

    #[test]
    fn test_pearson_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let r = StatsCalculator::pearson_correlation(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let inverse = [8.0, 6.0, 4.0, 2.0];
        let r = StatsCalculator::pearson_correlation(&x, &inverse).unwrap();
        assert!((r + 1.0).abs() < 1e-12);

        assert_eq!(StatsCalculator::pearson_correlation(&x, &[1.0; 4]), None);
        assert_eq!(StatsCalculator::pearson_correlation(&x, &y[..3]), None);
    }
}
