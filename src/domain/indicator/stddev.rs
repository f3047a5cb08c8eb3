//! Rolling mean and population standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Divides by n, not n-1.

/// Mean and population standard deviation of `window`. `None` when empty.
pub fn mean_stddev(window: &[f64]) -> Option<(f64, f64)> {
    if window.is_empty() {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    Some((mean, variance.sqrt()))
}

/// Trailing (mean, stddev) over `period` values; the first `period - 1`
/// entries are `None`.
pub fn rolling_mean_stddev(values: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                mean_stddev(&values[i + 1 - period..=i])
            }
        })
        .collect()
}
