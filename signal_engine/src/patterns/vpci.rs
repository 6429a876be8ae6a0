//! Volume Price Confirmation Indicator (Dormeier).
//!
//! `VPCI = VPC · VPR · VM / Alpha` where
//! - VPC = VWMA(long) − SMA(long), the confirmation/contradiction term,
//! - VPR = VWMA(short) / SMA(short), short-term price-volume cohesion,
//! - VM = VolSMA(short) / VolSMA(long), recent volume expansion,
//! - Alpha = σ(close, long) / σ(volume, long), a volatility normalizer.

use chrono::NaiveDate;
use indexmap::IndexMap;
use market_data_client::models::bar::BarSeries;
use serde::Serialize;

use crate::indicator::Indicator;
use crate::indicators::moving_average::{rolling_std, sma, vwma};

/// Guard for the Alpha denominator: a volume stddev this close to zero
/// would explode the ratio, so Alpha falls back to 1.0.
const ALPHA_EPSILON: f64 = 1e-9;

pub const VPCI_SHORT: usize = 5;
pub const VPCI_LONG: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VpciSignal {
    /// Window not yet full.
    Neutral,
    /// Rising price confirmed by volume.
    ConfirmBull,
    /// Rising price contradicted by volume.
    DivergeBull,
    /// Falling price confirmed by volume.
    ConfirmBear,
    /// Falling price contradicted by volume.
    DivergeBear,
}

impl VpciSignal {
    fn classify(vpc: Option<f64>, vpci: Option<f64>) -> Self {
        match (vpc, vpci) {
            (Some(vpc), Some(vpci)) if vpc > 0.0 && vpci > 0.0 => Self::ConfirmBull,
            (Some(vpc), Some(_)) if vpc > 0.0 => Self::DivergeBull,
            (Some(_), Some(vpci)) if vpci < 0.0 => Self::ConfirmBear,
            (Some(_), Some(_)) => Self::DivergeBear,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VpciSeries {
    pub vpc: Vec<Option<f64>>,
    pub vpr: Vec<Option<f64>>,
    pub vm: Vec<Option<f64>>,
    pub alpha: Vec<Option<f64>>,
    pub vpci: Vec<Option<f64>>,
    pub signal: Vec<VpciSignal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FalseBreakoutCheck {
    pub is_false: bool,
    pub confidence: f64,
    pub reason: &'static str,
}

/// Raw price-vs-VPCI divergence hit; stage context is layered on by the
/// signal detector.
#[derive(Debug, Clone, Serialize)]
pub struct RawDivergence {
    pub date: NaiveDate,
    pub bearish: bool,
    pub price: f64,
    pub vpci: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Vpci {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for Vpci {
    fn default() -> Self {
        Self {
            short_period: VPCI_SHORT,
            long_period: VPCI_LONG,
        }
    }
}

impl Vpci {
    pub fn compute(&self, closes: &[f64], volumes: &[f64]) -> VpciSeries {
        let len = closes.len().min(volumes.len());

        let vwma_long = vwma(closes, volumes, self.long_period);
        let sma_long = sma(closes, self.long_period);
        let vwma_short = vwma(closes, volumes, self.short_period);
        let sma_short = sma(closes, self.short_period);
        let vol_sma_short = sma(volumes, self.short_period);
        let vol_sma_long = sma(volumes, self.long_period);
        let close_std = rolling_std(closes, self.long_period);
        let volume_std = rolling_std(volumes, self.long_period);

        let mut series = VpciSeries {
            vpc: Vec::with_capacity(len),
            vpr: Vec::with_capacity(len),
            vm: Vec::with_capacity(len),
            alpha: Vec::with_capacity(len),
            vpci: Vec::with_capacity(len),
            signal: Vec::with_capacity(len),
        };

        for i in 0..len {
            let vpc = match (vwma_long[i], sma_long[i]) {
                (Some(v), Some(s)) => Some(v - s),
                _ => None,
            };
            let vpr = match (vwma_short[i], sma_short[i]) {
                (Some(v), Some(s)) if s != 0.0 => Some(v / s),
                _ => None,
            };
            let vm = match (vol_sma_short[i], vol_sma_long[i]) {
                (Some(s), Some(l)) if l > 0.0 => Some(s / l),
                _ => None,
            };
            let alpha = match (close_std[i], volume_std[i]) {
                (Some(c), Some(v)) if v > ALPHA_EPSILON => Some(c / v),
                (Some(_), Some(_)) => Some(1.0),
                _ => None,
            };
            let vpci = match (vpc, vpr, vm, alpha) {
                (Some(vpc), Some(vpr), Some(vm), Some(alpha)) if alpha != 0.0 => {
                    Some(vpc * vpr * vm / alpha)
                }
                _ => None,
            };

            series.signal.push(VpciSignal::classify(vpc, vpci));
            series.vpc.push(vpc);
            series.vpr.push(vpr);
            series.vm.push(vm);
            series.alpha.push(alpha);
            series.vpci.push(vpci);
        }

        series
    }

    /// Judges a claimed breakout at `breakout_date`: a rising close with
    /// the VPCI falling or negative marks the breakout false.
    pub fn false_breakout_check(
        &self,
        series: &BarSeries,
        breakout_date: NaiveDate,
    ) -> FalseBreakoutCheck {
        let Some(idx) = series.index_of(breakout_date) else {
            return FalseBreakoutCheck {
                is_false: false,
                confidence: 0.0,
                reason: "date not in series",
            };
        };
        if idx < self.long_period {
            return FalseBreakoutCheck {
                is_false: false,
                confidence: 0.0,
                reason: "insufficient data",
            };
        }

        let vpci = self.compute(&series.closes(), &series.volumes()).vpci;
        let (Some(before), Some(after)) = (vpci[idx - 1], vpci[idx]) else {
            return FalseBreakoutCheck {
                is_false: false,
                confidence: 0.0,
                reason: "vpci undefined at breakout",
            };
        };

        let price_rising = series.bars[idx].close > series.bars[idx - 1].close;
        let is_false = price_rising && (after < before || after < 0.0);

        FalseBreakoutCheck {
            is_false,
            confidence: if is_false { 0.3 } else { 0.8 },
            reason: if is_false {
                "vpci divergence"
            } else {
                "vpci confirmation"
            },
        }
    }

    /// Scans for price-vs-VPCI divergence over a sliding `window`:
    /// price up with VPCI down is bearish, price down with VPCI up is
    /// bullish. Strength is the absolute VPCI change over the window.
    pub fn detect_divergences(&self, series: &BarSeries, window: usize) -> Vec<RawDivergence> {
        let closes = series.closes();
        let vpci = self.compute(&closes, &series.volumes()).vpci;
        let mut out = Vec::new();

        for i in window..series.bars.len() {
            let (Some(now), Some(then)) = (vpci[i], vpci[i - window]) else {
                continue;
            };
            let price_up = closes[i] > closes[i - window];
            let price_down = closes[i] < closes[i - window];
            let vpci_up = now > then;
            let vpci_down = now < then;

            if (price_up && vpci_down) || (price_down && vpci_up) {
                out.push(RawDivergence {
                    date: series.bars[i].date,
                    bearish: price_up,
                    price: closes[i],
                    vpci: now,
                    strength: (now - then).abs(),
                });
            }
        }

        out
    }
}

impl Indicator for Vpci {
    type Output = VpciSeries;

    fn calculate(&self, series: &BarSeries) -> VpciSeries {
        self.compute(&series.closes(), &series.volumes())
    }

    fn name(&self) -> &'static str {
        "vpci"
    }

    fn parameters(&self) -> IndexMap<&'static str, f64> {
        IndexMap::from([
            ("short_period", self.short_period as f64),
            ("long_period", self.long_period as f64),
        ])
    }
}
