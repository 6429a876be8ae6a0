//! Moving averages and rolling dispersion.

/// Simple moving average: arithmetic mean of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential moving average in its pure recursive form.
///
/// `EMA[0] = values[0]`, `EMA[t] = α·values[t] + (1−α)·EMA[t−1]` with
/// `α = 2/(period+1)`. No warm-up averaging, so every position is defined.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            Some(p) => alpha * value + (1.0 - alpha) * p,
            None => value,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Volume-weighted moving average: Σ(close·volume)/Σ(volume) over the
/// last `period` bars. Yields `None` when the window's volume sums to
/// zero.
pub fn vwma(closes: &[f64], volumes: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = closes.len().min(volumes.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i + 1 < period || period == 0 {
            out.push(None);
            continue;
        }
        let start = i + 1 - period;
        let weighted: f64 = (start..=i).map(|j| closes[j] * volumes[j]).sum();
        let total: f64 = volumes[start..=i].iter().sum();
        if total > 0.0 {
            out.push(Some(weighted / total));
        } else {
            out.push(None);
        }
    }
    out
}

/// Rolling sample standard deviation (n−1 denominator) over `period`.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if period < 2 || i + 1 < period {
            out.push(None);
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period as f64 - 1.0);
        out.push(Some(variance.sqrt()));
    }
    out
}
