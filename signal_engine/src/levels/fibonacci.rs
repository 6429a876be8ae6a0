//! Fibonacci retracement and extension levels.

use indexmap::IndexMap;
use market_data_client::models::bar::Bar;
use serde::Serialize;

pub const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
pub const EXTENSION_RATIOS: [f64; 4] = [1.272, 1.618, 2.0, 2.618];
pub const DEFAULT_LOOKBACK: usize = 120;

/// Which side of the swing range extension targets project from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct FibonacciLevels {
    pub swing_low: f64,
    pub swing_high: f64,
    /// Retracement ratio (as its display string) to price, swing high
    /// downward.
    pub levels: IndexMap<String, f64>,
    /// Extension ratio to price: above the swing high in an uptrend,
    /// below the swing low in a downtrend.
    pub extensions: IndexMap<String, f64>,
}

impl FibonacciLevels {
    /// All retracement prices, for confluence pooling.
    pub fn level_prices(&self) -> Vec<f64> {
        self.levels.values().copied().collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FibonacciAnalyzer {
    pub lookback: usize,
}

impl Default for FibonacciAnalyzer {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl FibonacciAnalyzer {
    /// Detects the swing high/low over the last `lookback` bars and
    /// derives levels. `None` when fewer bars are available.
    pub fn auto_detect(&self, bars: &[Bar], trend: TrendDirection) -> Option<FibonacciLevels> {
        if bars.len() < self.lookback {
            return None;
        }
        let window = &bars[bars.len() - self.lookback..];
        let swing_high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let swing_low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        Some(Self::levels(swing_low, swing_high, trend))
    }

    pub fn levels(swing_low: f64, swing_high: f64, trend: TrendDirection) -> FibonacciLevels {
        let range = swing_high - swing_low;

        let levels = RETRACEMENT_RATIOS
            .iter()
            .map(|&ratio| (format_ratio(ratio), swing_high - range * ratio))
            .collect();

        let extensions = EXTENSION_RATIOS
            .iter()
            .map(|&ratio| {
                let price = match trend {
                    TrendDirection::Up => swing_high + range * ratio,
                    TrendDirection::Down => swing_low - range * ratio,
                };
                (format_ratio(ratio), price)
            })
            .collect();

        FibonacciLevels {
            swing_low,
            swing_high,
            levels,
            extensions,
        }
    }
}

fn format_ratio(ratio: f64) -> String {
    format!("{ratio}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn retracement_levels_span_the_swing_range() {
        let fib = FibonacciAnalyzer::levels(100.0, 200.0, TrendDirection::Up);
        assert_eq!(fib.levels["0"], 200.0);
        assert_eq!(fib.levels["1"], 100.0);
        assert_eq!(fib.levels["0.5"], 150.0);
        assert!((fib.levels["0.618"] - 138.2).abs() < 1e-9);
    }

    #[test]
    fn uptrend_extensions_sit_above_the_swing_high() {
        let fib = FibonacciAnalyzer::levels(100.0, 200.0, TrendDirection::Up);
        assert!((fib.extensions["1.618"] - 361.8).abs() < 1e-9);
        assert!(fib.extensions.values().all(|&p| p > 200.0));
    }

    #[test]
    fn downtrend_extensions_sit_below_the_swing_low() {
        let fib = FibonacciAnalyzer::levels(100.0, 200.0, TrendDirection::Down);
        assert!((fib.extensions["1.272"] - (100.0 - 127.2)).abs() < 1e-9);
        assert!(fib.extensions.values().all(|&p| p < 100.0));
    }

    #[test]
    fn auto_detect_needs_a_full_lookback() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..130)
            .map(|i| Bar {
                date: start + Duration::days(i as i64),
                open: 100.0,
                high: 100.0 + (i % 50) as f64,
                low: 90.0,
                close: 100.0,
                volume: 1.0,
            })
            .collect();

        let analyzer = FibonacciAnalyzer::default();
        assert!(analyzer.auto_detect(&bars[..100], TrendDirection::Up).is_none());

        let fib = analyzer.auto_detect(&bars, TrendDirection::Up).unwrap();
        assert_eq!(fib.swing_low, 90.0);
        assert_eq!(fib.swing_high, 149.0);
    }
}
