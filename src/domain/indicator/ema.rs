//! Exponential Moving Average kernel used by the oscillator.
//!
//! α = 2/(n+1), EMA[0] = X[0], then EMA[i] = X[i]·α + EMA[i-1]·(1-α).
//! Seeded from the first observation, so every point is defined.

pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// EMA over raw values. Empty input or a zero span yields an empty vector.
pub fn ema_values(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = smoothing_factor(span);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &value in &values[1..] {
        ema = value * alpha + ema * (1.0 - alpha);
        out.push(ema);
    }
    out
}
