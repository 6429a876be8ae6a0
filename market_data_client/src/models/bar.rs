//! Canonical in-memory representation of a daily/weekly price bar (OHLCV).
//!
//! This struct is the standard output of all [`DataProvider`](crate::providers::DataProvider)
//! implementations and the standard input of the analytics layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::timeframe::Timeframe;

/// A single OHLCV bar for one trading period.
///
/// Bars are vendor-agnostic and immutable once normalized from a provider
/// response. Series are kept sorted by `date` ascending for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date of the bar. For weekly bars this is the Monday of the
    /// calendar week the bar covers.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price during the period.
    pub high: f64,

    /// Lowest price during the period.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Traded volume during the period. Zero on trading halts.
    pub volume: f64,
}

/// A complete set of bars for a single instrument and granularity.
///
/// Groups a vector of [`Bar`]s with their ticker and [`Timeframe`], making
/// the data set self-describing for the analytics layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    /// The instrument's ticker (e.g., "005930").
    pub ticker: String,
    /// Granularity of each bar in the series.
    pub timeframe: Timeframe,
    /// The bars, sorted by date ascending.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(ticker: impl Into<String>, timeframe: Timeframe, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            ticker: ticker.into(),
            timeframe,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Position of the bar with the given date, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }
}
