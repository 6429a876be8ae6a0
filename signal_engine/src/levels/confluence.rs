//! Clustering of heterogeneous price levels into confluence zones.

use serde::Serialize;

use super::fibonacci::FibonacciLevels;
use crate::patterns::boxes::{BoxStatus, ConsolidationBox};

pub const DEFAULT_TOLERANCE: f64 = 0.02;
/// Minimum clustered levels for a zone to qualify.
pub const MIN_ZONE_LEVELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Fibonacci,
    MovingAverage,
    BoxTop,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriceLevel {
    pub kind: LevelKind,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfluenceZone {
    pub low: f64,
    pub high: f64,
    pub center: f64,
    /// Number of contributing levels.
    pub strength: usize,
    /// Distinct kinds of contributing levels.
    pub components: Vec<LevelKind>,
}

/// Pools levels from the three sources: Fibonacci retracements, moving
/// averages, and the tops of active or upward-broken boxes.
pub fn pool_levels(
    fibonacci: Option<&FibonacciLevels>,
    moving_averages: &[f64],
    boxes: &[ConsolidationBox],
) -> Vec<PriceLevel> {
    let mut levels = Vec::new();

    if let Some(fib) = fibonacci {
        for price in fib.level_prices() {
            levels.push(PriceLevel {
                kind: LevelKind::Fibonacci,
                price,
            });
        }
    }
    for &price in moving_averages {
        levels.push(PriceLevel {
            kind: LevelKind::MovingAverage,
            price,
        });
    }
    for cbox in boxes {
        if matches!(cbox.status, BoxStatus::Active | BoxStatus::BrokenUp) {
            levels.push(PriceLevel {
                kind: LevelKind::BoxTop,
                price: cbox.top,
            });
        }
    }

    levels
}

/// Groups pooled levels into zones. Levels are scanned in price order;
/// a zone is the run of levels each within `tolerance` (relative to the
/// pair's average price) of the seed, qualifying at
/// [`MIN_ZONE_LEVELS`]. Output is sorted by strength descending.
pub fn find_confluence_zones(levels: &[PriceLevel], tolerance: f64) -> Vec<ConfluenceZone> {
    let mut sorted: Vec<PriceLevel> = levels
        .iter()
        .filter(|l| l.price.is_finite() && l.price > 0.0)
        .copied()
        .collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut zones = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let seed = sorted[i];
        let mut end = i + 1;
        while end < sorted.len() && within_tolerance(seed.price, sorted[end].price, tolerance) {
            end += 1;
        }

        let group = &sorted[i..end];
        if group.len() >= MIN_ZONE_LEVELS {
            let low = group[0].price;
            let high = group[group.len() - 1].price;
            let mut components: Vec<LevelKind> = group.iter().map(|l| l.kind).collect();
            components.sort();
            components.dedup();

            zones.push(ConfluenceZone {
                low,
                high,
                center: (low + high) / 2.0,
                strength: group.len(),
                components,
            });
            i = end;
        } else {
            i += 1;
        }
    }

    zones.sort_by(|a, b| b.strength.cmp(&a.strength));
    zones
}

fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    let avg = (a + b) / 2.0;
    avg > 0.0 && (a - b).abs() / avg <= tolerance
}
