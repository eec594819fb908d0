//! Technical indicator primitives over close-price series.
//!
//! Rolling indicators return `Option<f64>` per element so warm-up gaps are
//! explicit instead of silently zeroed.

/// Exponential moving average with smoothing `k = 2 / (span + 1)`, seeded
/// with the first value. Empty for an empty input or a zero span.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }
    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current = value * k + current * (1.0 - k);
        out.push(current);
    }
    out
}

/// Simple moving average; None until a full window is available.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Rolling sample standard deviation (divisor `n - 1`). None until a full
/// window is available; windows of size 1 yield 0.0.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| {
        if w.len() < 2 {
            return 0.0;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let variance =
            w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        variance.sqrt()
    })
}

/// Rolling maximum; None until a full window is available.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().copied().fold(f64::MIN, f64::max))
}

fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                None
            } else {
                Some(f(&values[i + 1 - window..=i]))
            }
        })
        .collect()
}

/// Relative strength index over simple averages of gains and losses.
/// Valid from index `period` onward; an all-gain window reads 100.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    for i in period..values.len() {
        let window = &deltas[i - period..i];
        let avg_gain =
            window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let avg_loss =
            window.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;
        out[i] = Some(if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        });
    }
    out
}
