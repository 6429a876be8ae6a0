//! Volatility bands: Bollinger and Keltner channels.

use super::moving_average::{ema, rolling_std, sma};

pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;
pub const KELTNER_EMA_PERIOD: usize = 20;
pub const KELTNER_ATR_PERIOD: usize = 10;
pub const KELTNER_MULT: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Bollinger bands: SMA middle, ±k standard deviations.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollingerSeries {
    let middle = sma(closes, period);
    let std = rolling_std(closes, period);

    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m + k * s),
            _ => None,
        })
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - k * s),
            _ => None,
        })
        .collect();

    BollingerSeries {
        middle,
        upper,
        lower,
    }
}

#[derive(Debug, Clone)]
pub struct KeltnerSeries {
    pub middle: Vec<f64>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// True range per bar: `max(high−low, |high−prev_close|, |low−prev_close|)`.
/// The first bar has no prior close and uses `high−low`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let len = closes.len();
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let base = highs[i] - lows[i];
        let tr = if i == 0 {
            base
        } else {
            let prev_close = closes[i - 1];
            base.max((highs[i] - prev_close).abs())
                .max((lows[i] - prev_close).abs())
        };
        out.push(tr);
    }
    out
}

/// Keltner channel: EMA middle, ±mult·ATR where ATR is the SMA of the
/// true range.
pub fn keltner(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    ema_period: usize,
    atr_period: usize,
    mult: f64,
) -> KeltnerSeries {
    let middle = ema(closes, ema_period);
    let atr = sma(&true_range(highs, lows, closes), atr_period);

    let upper = middle
        .iter()
        .zip(&atr)
        .map(|(m, a)| a.map(|a| m + mult * a))
        .collect();
    let lower = middle
        .iter()
        .zip(&atr)
        .map(|(m, a)| a.map(|a| m - mult * a))
        .collect();

    KeltnerSeries {
        middle,
        upper,
        lower,
    }
}
