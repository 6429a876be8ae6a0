//! The record-store seam and its in-memory implementation.
//!
//! Bars are keyed by (instrument, timeframe, date); inserts are
//! idempotent on that natural key, so overlapping upserts from the quick
//! fetch and the background backfill never double-count.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use market_data_client::models::{bar::Bar, timeframe::Timeframe};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown instrument id {0}")]
    UnknownInstrument(i64),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(err: PoisonError<T>) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Instrument {
    pub id: i64,
    pub ticker: String,
    pub name: String,
    pub market: String,
}

/// Keyed lookup/insert of bars and instruments.
#[async_trait]
pub trait BarStore: Send + Sync {
    async fn find_instrument(&self, ticker: &str) -> Result<Option<Instrument>, StoreError>;

    async fn get_or_create_instrument(
        &self,
        ticker: &str,
        name: &str,
        market: &str,
    ) -> Result<Instrument, StoreError>;

    /// Bars ordered ascending by date, optionally bounded inclusively.
    async fn get_bars(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<Bar>, StoreError>;

    /// Inserts bars by natural key. With `overwrite` false, existing
    /// dates are preserved and only gaps fill; with it true, incoming
    /// bars replace. Returns the number of bars written.
    async fn upsert_bars(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        bars: &[Bar],
        overwrite: bool,
    ) -> Result<usize, StoreError>;
}

/// Hands out store handles. The background backfill takes its own handle
/// here instead of borrowing the originating request's.
#[async_trait]
pub trait StorePool: Send + Sync {
    async fn store(&self) -> Result<Arc<dyn BarStore>, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    instruments: HashMap<String, Instrument>,
    next_id: i64,
    bars: HashMap<(i64, Timeframe), BTreeMap<NaiveDate, Bar>>,
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BarStore for MemoryStore {
    async fn find_instrument(&self, ticker: &str) -> Result<Option<Instrument>, StoreError> {
        let inner = self.inner.lock()?;
        Ok(inner.instruments.get(ticker).cloned())
    }

    async fn get_or_create_instrument(
        &self,
        ticker: &str,
        name: &str,
        market: &str,
    ) -> Result<Instrument, StoreError> {
        let mut inner = self.inner.lock()?;
        if let Some(existing) = inner.instruments.get(ticker) {
            return Ok(existing.clone());
        }
        inner.next_id += 1;
        let instrument = Instrument {
            id: inner.next_id,
            ticker: ticker.to_string(),
            name: name.to_string(),
            market: market.to_string(),
        };
        inner
            .instruments
            .insert(ticker.to_string(), instrument.clone());
        Ok(instrument)
    }

    async fn get_bars(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<Bar>, StoreError> {
        let inner = self.inner.lock()?;
        let Some(by_date) = inner.bars.get(&(instrument_id, timeframe)) else {
            return Ok(Vec::new());
        };
        let bars = match range {
            Some((start, end)) => by_date.range(start..=end).map(|(_, b)| *b).collect(),
            None => by_date.values().copied().collect(),
        };
        Ok(bars)
    }

    async fn upsert_bars(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        bars: &[Bar],
        overwrite: bool,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock()?;
        let by_date = inner.bars.entry((instrument_id, timeframe)).or_default();
        let mut written = 0;
        for bar in bars {
            if overwrite || !by_date.contains_key(&bar.date) {
                by_date.insert(bar.date, *bar);
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Pool over a single shared [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryStorePool {
    store: Arc<MemoryStore>,
}

impl MemoryStorePool {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }
}

impl Default for MemoryStorePool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorePool for MemoryStorePool {
    async fn store(&self) -> Result<Arc<dyn BarStore>, StoreError> {
        Ok(Arc::clone(&self.store) as Arc<dyn BarStore>)
    }
}
