//! # Summary statistics for the differencing pipeline
//!
//! Percentile, mean and standard deviation helpers shared by the
//! proper-motion outlier trim and the plotter.
//!
//! Percentiles use **linear interpolation between closest ranks**: for a
//! sample of size `n`, percentile `p` sits at rank `p/100 · (n-1)` and is
//! interpolated between the two bracketing order statistics. With the values
//! `1..=100`, the 95th percentile is `95.05`, so a strict `< cutoff` keeps
//! exactly the 95 smallest values.

/// Percentile of a sample with linear interpolation between closest ranks.
///
/// Arguments
/// ---------
/// * `values`: the sample, in any order; must be non-empty and finite
/// * `p`: the percentile, in `[0, 100]`
///
/// Return
/// ------
/// * The interpolated percentile value
///
/// Panics
/// ------
/// * If `values` is empty. Callers filter out non-finite entries first.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    assert!(!values.is_empty(), "percentile of an empty sample");
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Several percentiles of the same sample, sorted once.
pub fn percentiles(values: &[f64], ps: &[f64]) -> Vec<f64> {
    ps.iter().map(|&p| percentile(values, p)).collect()
}

/// Arithmetic mean of a sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of a sample.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod stats_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_relative_eq!(percentile(&values, 95.0), 95.05, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 100.0), 100.0, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 50.0), 50.5, epsilon = 1e-12);
    }

    #[test]
    fn percentile_handles_unsorted_input() {
        let values = vec![3.0, 1.0, 2.0];
        assert_relative_eq!(percentile(&values, 50.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn mean_and_std_of_constant_sample() {
        let values = vec![4.2; 10];
        assert_relative_eq!(mean(&values), 4.2, epsilon = 1e-12);
        assert_relative_eq!(std_dev(&values), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn std_is_population_std() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        // variance over n, not n-1
        assert_relative_eq!(std_dev(&values), 1.25f64.sqrt(), epsilon = 1e-12);
    }
}
