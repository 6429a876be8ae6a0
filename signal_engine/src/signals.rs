//! Breakout-confidence scoring and divergence scanning.
//!
//! Fuses the stage classifier (weekly), the VPCI (daily), raw volume,
//! relative strength, and the box tracker into a weighted five-factor
//! checklist, and layers trend-stage context onto raw VPCI divergences.

use chrono::NaiveDate;
use market_data_client::models::bar::BarSeries;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::indicators::volume::latest_volume_ratio;
use crate::patterns::boxes::{BoxStatus, BoxTracker};
use crate::patterns::stage::{Stage, StageAnalyzer, mansfield_rs};
use crate::patterns::vpci::Vpci;

pub const WEIGHT_STAGE_BREAKOUT: f64 = 0.3;
pub const WEIGHT_VPCI_CONFIRMED: f64 = 0.3;
pub const WEIGHT_VOLUME: f64 = 0.2;
pub const WEIGHT_RELATIVE_STRENGTH: f64 = 0.1;
pub const WEIGHT_BOX_BREAKOUT: f64 = 0.1;

pub const VOLUME_SUFFICIENT_RATIO: f64 = 2.0;
pub const VOLUME_AVERAGE_PERIOD: usize = 30;
pub const DIVERGENCE_WINDOW: usize = 20;

const TRUE_BREAKOUT_THRESHOLD: f64 = 0.7;
const POTENTIAL_BREAKOUT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    TrueBreakout,
    PotentialBreakout,
    WeakSignal,
    FalseBreakout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalWarning {
    VolumeWeak,
    VpciDivergence,
    LowConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakoutChecklist {
    pub stage_breakout: bool,
    pub vpci_confirmed: bool,
    pub volume_sufficient: bool,
    pub relative_strength: bool,
    pub box_breakout: bool,
    pub volume_ratio: Option<f64>,
}

impl BreakoutChecklist {
    /// Weighted share of passed factors over all factor weights.
    pub fn confidence(&self) -> f64 {
        let total = WEIGHT_STAGE_BREAKOUT
            + WEIGHT_VPCI_CONFIRMED
            + WEIGHT_VOLUME
            + WEIGHT_RELATIVE_STRENGTH
            + WEIGHT_BOX_BREAKOUT;
        let mut passed = 0.0;
        if self.stage_breakout {
            passed += WEIGHT_STAGE_BREAKOUT;
        }
        if self.vpci_confirmed {
            passed += WEIGHT_VPCI_CONFIRMED;
        }
        if self.volume_sufficient {
            passed += WEIGHT_VOLUME;
        }
        if self.relative_strength {
            passed += WEIGHT_RELATIVE_STRENGTH;
        }
        if self.box_breakout {
            passed += WEIGHT_BOX_BREAKOUT;
        }
        passed / total
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakoutSignal {
    pub is_valid: bool,
    pub confidence: f64,
    pub signal_type: SignalType,
    pub checklist: BreakoutChecklist,
    pub warnings: Vec<SignalWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Significance {
    Normal,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Divergence {
    pub date: NaiveDate,
    pub direction: SignalDirection,
    pub price: f64,
    pub vpci: f64,
    pub strength: f64,
    /// Weekly trend stage in effect on the divergence date.
    pub stage: Option<Stage>,
    pub significance: Significance,
}

#[derive(Debug, Clone, Serialize)]
pub struct DivergenceSummary {
    pub divergences: Vec<Divergence>,
    pub bearish_count: usize,
    pub bullish_count: usize,
    pub warning_count: usize,
    pub has_bearish_divergence: bool,
    pub has_bullish_divergence: bool,
}

/// A persistable signal record, newest-first in report output.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub signal_date: NaiveDate,
    pub direction: SignalDirection,
    pub strength: f64,
    pub is_false_signal: Option<bool>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDetector {
    vpci: Vpci,
    stage: StageAnalyzer,
    boxes: BoxTracker,
}

impl SignalDetector {
    /// Scores a claimed breakout on `breakout_date`. The weekly series
    /// drives the stage and relative-strength factors; the daily series
    /// drives VPCI, volume, and box state. Without a benchmark the
    /// relative-strength factor passes.
    pub fn analyze_breakout(
        &self,
        daily: &BarSeries,
        weekly: &BarSeries,
        breakout_date: NaiveDate,
        benchmark_weekly_closes: Option<&[f64]>,
    ) -> BreakoutSignal {
        let stage_breakout = self.stage.detect_breakout(weekly);

        let vpci_check = self.vpci.false_breakout_check(daily, breakout_date);
        let is_false_breakout = vpci_check.is_false;

        let volume_ratio = latest_volume_ratio(&daily.volumes(), VOLUME_AVERAGE_PERIOD);
        let volume_sufficient = volume_ratio.is_some_and(|r| r >= VOLUME_SUFFICIENT_RATIO);

        let relative_strength = match benchmark_weekly_closes {
            Some(benchmark) => mansfield_rs(&weekly.closes(), benchmark)
                .last()
                .copied()
                .flatten()
                .is_some_and(|rs| rs > 0.0),
            None => true,
        };

        let box_breakout = self
            .boxes
            .track(&daily.bars)
            .latest()
            .is_some_and(|b| b.status == BoxStatus::BrokenUp);

        let checklist = BreakoutChecklist {
            stage_breakout: stage_breakout.is_breakout,
            vpci_confirmed: !is_false_breakout,
            volume_sufficient,
            relative_strength,
            box_breakout,
            volume_ratio,
        };
        let confidence = checklist.confidence();

        let mut warnings = Vec::new();
        if !volume_sufficient {
            warnings.push(SignalWarning::VolumeWeak);
        }
        if is_false_breakout {
            warnings.push(SignalWarning::VpciDivergence);
        }
        if confidence < POTENTIAL_BREAKOUT_THRESHOLD {
            warnings.push(SignalWarning::LowConfidence);
        }

        let signal_type = if is_false_breakout {
            SignalType::FalseBreakout
        } else if confidence >= TRUE_BREAKOUT_THRESHOLD {
            SignalType::TrueBreakout
        } else if confidence >= POTENTIAL_BREAKOUT_THRESHOLD {
            SignalType::PotentialBreakout
        } else {
            SignalType::WeakSignal
        };

        debug!(
            ticker = %daily.ticker,
            %breakout_date,
            confidence,
            ?signal_type,
            "scored breakout"
        );

        BreakoutSignal {
            is_valid: !is_false_breakout,
            confidence,
            signal_type,
            checklist,
            warnings,
        }
    }

    /// Scans the daily series for price-vs-VPCI divergences and attaches
    /// the weekly trend stage in effect on each hit. A bearish
    /// divergence during stage 2 escalates to WARNING significance.
    pub fn detect_divergences(&self, daily: &BarSeries, weekly: &BarSeries) -> Vec<Divergence> {
        let raw = self.vpci.detect_divergences(daily, DIVERGENCE_WINDOW);
        let stage_results = self.stage.analyze(weekly);

        raw.into_iter()
            .map(|hit| {
                let stage = stage_at(weekly, &stage_results, hit.date);
                let direction = if hit.bearish {
                    SignalDirection::Down
                } else {
                    SignalDirection::Up
                };
                let significance =
                    if hit.bearish && stage == Some(Stage::Advancing) {
                        Significance::Warning
                    } else {
                        Significance::Normal
                    };
                Divergence {
                    date: hit.date,
                    direction,
                    price: hit.price,
                    vpci: hit.vpci,
                    strength: hit.strength,
                    stage,
                    significance,
                }
            })
            .collect()
    }

    pub fn divergence_summary(&self, daily: &BarSeries, weekly: &BarSeries) -> DivergenceSummary {
        let divergences = self.detect_divergences(daily, weekly);
        let bearish_count = divergences
            .iter()
            .filter(|d| d.direction == SignalDirection::Down)
            .count();
        let bullish_count = divergences.len() - bearish_count;
        let warning_count = divergences
            .iter()
            .filter(|d| d.significance == Significance::Warning)
            .count();

        DivergenceSummary {
            bearish_count,
            bullish_count,
            warning_count,
            has_bearish_divergence: bearish_count > 0,
            has_bullish_divergence: bullish_count > 0,
            divergences,
        }
    }
}

/// The weekly stage in effect on `date`: the classification of the last
/// weekly bar dated at or before it.
fn stage_at(
    weekly: &BarSeries,
    results: &[Option<crate::patterns::stage::StageResult>],
    date: NaiveDate,
) -> Option<Stage> {
    let idx = weekly.bars.partition_point(|b| b.date <= date);
    if idx == 0 {
        return None;
    }
    results[idx - 1].map(|r| r.stage)
}

impl Signal {
    pub fn from_breakout(date: NaiveDate, breakout: &BreakoutSignal) -> Self {
        Self {
            signal_type: breakout.signal_type,
            signal_date: date,
            direction: SignalDirection::Up,
            strength: breakout.confidence,
            is_false_signal: Some(!breakout.is_valid),
            details: json!({
                "checklist": breakout.checklist,
                "warnings": breakout.warnings,
            }),
        }
    }

    pub fn from_divergence(divergence: &Divergence) -> Self {
        Self {
            signal_type: SignalType::WeakSignal,
            signal_date: divergence.date,
            direction: divergence.direction,
            strength: divergence.strength,
            is_false_signal: None,
            details: json!({
                "kind": "vpci_divergence",
                "significance": divergence.significance,
                "stage": divergence.stage.map(Stage::label),
                "vpci": divergence.vpci,
                "price": divergence.price,
            }),
        }
    }
}
