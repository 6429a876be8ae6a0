//! 4-stage trend-cycle classification over weekly bars (Weinstein).
//!
//! Driven by a 30-period moving average of the close: the MA's level
//! relative to price plus its trailing slope place each bar in one of
//! four stages — basing, advancing, topping, declining.

use indexmap::IndexMap;
use market_data_client::models::bar::BarSeries;
use serde::Serialize;

use crate::indicator::Indicator;
use crate::indicators::moving_average::sma;
use crate::indicators::volume::latest_volume_ratio;

pub const STAGE_MA_PERIOD: usize = 30;
pub const SLOPE_WINDOW: usize = 4;
/// Absolute per-period slope threshold separating RISING/FALLING from
/// FLAT, in price units.
pub const SLOPE_EPSILON: f64 = 0.001;
const BREAKOUT_VOLUME_PERIOD: usize = 10;
const MANSFIELD_PERIOD: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlopeClass {
    Rising,
    Falling,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Basing,
    Advancing,
    Topping,
    Declining,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Basing => 1,
            Stage::Advancing => 2,
            Stage::Topping => 3,
            Stage::Declining => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Basing => "BASING",
            Stage::Advancing => "ADVANCING",
            Stage::Topping => "TOPPING",
            Stage::Declining => "DECLINING",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageResult {
    pub moving_average: f64,
    pub slope: SlopeClass,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageBreakout {
    pub is_breakout: bool,
    pub confidence: f64,
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct StageAnalyzer {
    pub ma_period: usize,
    pub slope_window: usize,
    pub epsilon: f64,
}

impl Default for StageAnalyzer {
    fn default() -> Self {
        Self {
            ma_period: STAGE_MA_PERIOD,
            slope_window: SLOPE_WINDOW,
            epsilon: SLOPE_EPSILON,
        }
    }
}

impl StageAnalyzer {
    /// Classifies every bar; `None` until both the MA window and the
    /// trailing slope window are full.
    pub fn analyze(&self, series: &BarSeries) -> Vec<Option<StageResult>> {
        let closes = series.closes();
        let ma = sma(&closes, self.ma_period);
        let mut out = Vec::with_capacity(closes.len());

        for i in 0..closes.len() {
            let Some(ma_now) = ma[i] else {
                out.push(None);
                continue;
            };
            let Some(slope) = self.slope_at(&ma, i) else {
                out.push(None);
                continue;
            };

            let price_above = closes[i] > ma_now;
            let rising = slope == SlopeClass::Rising;
            let stage = match (rising, price_above) {
                (true, true) => Stage::Advancing,
                (true, false) => Stage::Topping,
                (false, false) => Stage::Declining,
                (false, true) => Stage::Basing,
            };

            out.push(Some(StageResult {
                moving_average: ma_now,
                slope,
                stage,
            }));
        }

        out
    }

    fn slope_at(&self, ma: &[Option<f64>], i: usize) -> Option<SlopeClass> {
        if i < self.slope_window {
            return None;
        }
        let now = ma[i]?;
        let then = ma[i - self.slope_window]?;
        let slope = (now - then) / self.slope_window as f64;

        Some(if slope > self.epsilon {
            SlopeClass::Rising
        } else if slope < -self.epsilon {
            SlopeClass::Falling
        } else {
            SlopeClass::Flat
        })
    }

    /// Detects a stage-2 breakout on the latest bar: either already in
    /// stage 2, or a rising MA with price above it. Confidence scales
    /// with the latest volume against its 10-period average, capped at 1.
    pub fn detect_breakout(&self, series: &BarSeries) -> StageBreakout {
        let results = self.analyze(series);
        let Some(Some(latest)) = results.last() else {
            return StageBreakout {
                is_breakout: false,
                confidence: 0.0,
                volume_ratio: None,
            };
        };

        let close = series.bars[series.bars.len() - 1].close;
        let is_breakout = latest.stage == Stage::Advancing
            || (latest.slope == SlopeClass::Rising && close > latest.moving_average);
        if !is_breakout {
            return StageBreakout {
                is_breakout: false,
                confidence: 0.0,
                volume_ratio: None,
            };
        }

        let ratio = latest_volume_ratio(&series.volumes(), BREAKOUT_VOLUME_PERIOD).unwrap_or(1.0);
        StageBreakout {
            is_breakout: true,
            confidence: (0.5 + ratio / 2.0).min(1.0),
            volume_ratio: Some(ratio),
        }
    }
}

impl Indicator for StageAnalyzer {
    type Output = Vec<Option<StageResult>>;

    fn calculate(&self, series: &BarSeries) -> Self::Output {
        self.analyze(series)
    }

    fn name(&self) -> &'static str {
        "stage"
    }

    fn parameters(&self) -> IndexMap<&'static str, f64> {
        IndexMap::from([
            ("ma_period", self.ma_period as f64),
            ("slope_window", self.slope_window as f64),
            ("epsilon", self.epsilon),
        ])
    }
}

/// Mansfield relative strength: the instrument's 52-period relative
/// change minus the benchmark's. Positive means outperformance.
pub fn mansfield_rs(stock_closes: &[f64], benchmark_closes: &[f64]) -> Vec<Option<f64>> {
    let len = stock_closes.len().min(benchmark_closes.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i < MANSFIELD_PERIOD {
            out.push(None);
            continue;
        }
        let stock_base = stock_closes[i - MANSFIELD_PERIOD];
        let bench_base = benchmark_closes[i - MANSFIELD_PERIOD];
        if stock_base <= 0.0 || bench_base <= 0.0 {
            out.push(None);
            continue;
        }
        let stock_change = stock_closes[i] / stock_base - 1.0;
        let bench_change = benchmark_closes[i] / bench_base - 1.0;
        out.push(Some(stock_change - bench_change));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use market_data_client::models::bar::Bar;
    use market_data_client::models::timeframe::Timeframe;

    fn series(closes: &[f64], volumes: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| Bar {
                date: start + Duration::weeks(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect();
        BarSeries::new("TEST", Timeframe::Weekly, bars)
    }

    #[test]
    fn rising_ma_with_price_above_is_stage_2() {
        // Monotone rise keeps the MA rising and price above it.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1000.0; 60];
        let results = StageAnalyzer::default().analyze(&series(&closes, &volumes));

        assert!(results[28].is_none());
        for result in results.iter().skip(40) {
            let result = result.unwrap();
            assert_eq!(result.stage, Stage::Advancing);
            assert_eq!(result.slope, SlopeClass::Rising);
        }
    }

    #[test]
    fn falling_ma_with_price_below_is_stage_4() {
        let mut closes: Vec<f64> = (0..40).map(|i| 200.0 + i as f64).collect();
        closes.extend((0..40).map(|i| 240.0 - 3.0 * i as f64));
        let volumes = vec![1000.0; closes.len()];
        let results = StageAnalyzer::default().analyze(&series(&closes, &volumes));

        let last = results.last().unwrap().unwrap();
        assert_eq!(last.stage, Stage::Declining);
        assert_eq!(last.slope, SlopeClass::Falling);
    }

    #[test]
    fn flat_series_is_basing() {
        // A nudge small enough to keep the MA slope inside epsilon while
        // putting price just above the MA: flat slope + price above = stage 1.
        let closes: Vec<f64> = (0..50)
            .map(|i| if i == 49 { 100.01 } else { 100.0 })
            .collect();
        let volumes = vec![1000.0; 50];
        let results = StageAnalyzer::default().analyze(&series(&closes, &volumes));
        let last = results.last().unwrap().unwrap();
        assert_eq!(last.stage, Stage::Basing);
    }

    #[test]
    fn breakout_confidence_caps_at_one() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut volumes = vec![1000.0; 60];
        *volumes.last_mut().unwrap() = 50_000.0;
        let breakout = StageAnalyzer::default().detect_breakout(&series(&closes, &volumes));

        assert!(breakout.is_breakout);
        assert_eq!(breakout.confidence, 1.0);
        assert!(breakout.volume_ratio.unwrap() > 2.0);
    }

    #[test]
    fn no_breakout_without_enough_bars() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1000.0; 10];
        let breakout = StageAnalyzer::default().detect_breakout(&series(&closes, &volumes));
        assert!(!breakout.is_breakout);
        assert_eq!(breakout.confidence, 0.0);
    }

    #[test]
    fn mansfield_rs_sign_tracks_outperformance() {
        let stock: Vec<f64> = (0..60).map(|i| 100.0 * (1.0 + 0.01 * i as f64)).collect();
        let bench: Vec<f64> = (0..60).map(|i| 100.0 * (1.0 + 0.005 * i as f64)).collect();
        let rs = mansfield_rs(&stock, &bench);
        assert_eq!(rs[51], None);
        assert!(rs[52].unwrap() > 0.0);
        assert!(rs[59].unwrap() > 0.0);
    }
}
