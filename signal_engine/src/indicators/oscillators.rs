//! Momentum oscillators: RSI, MACD, Stochastic.

use super::moving_average::ema;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const STOCHASTIC_K: usize = 14;
pub const STOCHASTIC_D: usize = 3;

/// Relative Strength Index over a rolling window of day-over-day deltas.
///
/// Gains and losses are the positive/negative parts of each delta;
/// `RSI = 100 − 100/(1 + avg_gain/avg_loss)`. When the window holds no
/// losses the value saturates at 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < 2 {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    for i in 0..deltas.len() {
        if i + 1 < period {
            continue;
        }
        let window = &deltas[i + 1 - period..=i];
        let avg_gain: f64 =
            window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss: f64 =
            window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        // deltas[i] pairs closes[i] with closes[i+1]
        out[i + 1] = Some(value);
    }
    out
}

#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD(12,26,9): fast EMA minus slow EMA, its EMA as the signal line,
/// and their difference as the histogram.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Stochastic oscillator: `%K = 100·(close − LL)/(HH − LL)` over the
/// `k_period` range, `%D` its 3-bar SMA. `%K` is undefined when the
/// range is degenerate (HH == LL).
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticSeries {
    let len = closes.len();
    let mut k: Vec<Option<f64>> = Vec::with_capacity(len);
    for i in 0..len {
        if k_period == 0 || i + 1 < k_period {
            k.push(None);
            continue;
        }
        let start = i + 1 - k_period;
        let highest = highs[start..=i].iter().cloned().fold(f64::MIN, f64::max);
        let lowest = lows[start..=i].iter().cloned().fold(f64::MAX, f64::min);
        if highest > lowest {
            k.push(Some(100.0 * (closes[i] - lowest) / (highest - lowest)));
        } else {
            k.push(None);
        }
    }

    // %D = SMA(d_period) of %K, defined only where the full window of %K
    // values is defined.
    let mut d: Vec<Option<f64>> = Vec::with_capacity(len);
    for i in 0..len {
        if d_period == 0 || i + 1 < d_period {
            d.push(None);
            continue;
        }
        let window = &k[i + 1 - d_period..=i];
        if window.iter().all(Option::is_some) {
            let mean = window.iter().flatten().sum::<f64>() / d_period as f64;
            d.push(Some(mean));
        } else {
            d.push(None);
        }
    }

    StochasticSeries { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_saturates_at_100_for_monotone_gains() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&closes, 14);
        assert_eq!(result[13], None);
        assert_eq!(result[14], Some(100.0));
    }

    #[test]
    fn rsi_is_50_for_alternating_equal_swings() {
        let mut closes = vec![100.0];
        for i in 0..20 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let result = rsi(&closes, 14);
        let value = result[15].unwrap();
        assert!((value - 50.0).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn macd_histogram_is_macd_minus_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let result = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        for i in 0..closes.len() {
            let expected = result.macd[i] - result.signal[i];
            assert!((result.histogram[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn stochastic_k_hits_extremes() {
        // Close at the highest high of the window gives %K = 100.
        let highs: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let closes = highs.clone();
        let result = stochastic(&highs, &lows, &closes, STOCHASTIC_K, STOCHASTIC_D);
        assert_eq!(result.k[19], Some(100.0));
        assert!(result.d[19].is_some());
        assert_eq!(result.k[12], None);
    }
}
