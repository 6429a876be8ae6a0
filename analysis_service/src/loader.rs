//! Progressive bar loading: serve what the store has, quick-fetch a
//! bounded window when it is thin, and backfill the full history in a
//! detached background task.

use std::sync::Arc;

use chrono::{Duration, Utc};
use market_data_client::cache::ResponseCache;
use market_data_client::models::{
    bar::{Bar, BarSeries},
    request::DailyBarsRequest,
    timeframe::Timeframe,
};
use market_data_client::providers::DataProvider;
use signal_engine::aggregate::to_weekly;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::report::{self, AnalysisReport};
use crate::storage::{BarStore, Instrument, StorePool};

#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Below this many stored daily bars, a quick fetch runs first.
    pub min_bars: usize,
    /// Days covered by the synchronous quick fetch.
    pub quick_window_days: i64,
    /// Days covered by the background backfill.
    pub full_history_days: i64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            min_bars: 100,
            quick_window_days: 150,
            full_history_days: 3000,
        }
    }
}

pub struct ProgressiveLoader {
    provider: Arc<dyn DataProvider>,
    cache: Arc<dyn ResponseCache>,
    pool: Arc<dyn StorePool>,
    config: LoaderConfig,
}

impl ProgressiveLoader {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        cache: Arc<dyn ResponseCache>,
        pool: Arc<dyn StorePool>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            pool,
            config,
        }
    }

    /// Returns the instrument and its stored daily bars, fetching first
    /// when the store is thin or `force_refresh` is set. A successful
    /// quick fetch also schedules a detached full-history backfill.
    pub async fn ensure_daily_bars(
        &self,
        ticker: &str,
        force_refresh: bool,
    ) -> Result<(Instrument, Vec<Bar>), ServiceError> {
        let store = self.pool.store().await?;
        let instrument = self.resolve_instrument(store.as_ref(), ticker).await?;

        let stored = store.get_bars(instrument.id, Timeframe::Daily, None).await?;
        if stored.len() >= self.config.min_bars && !force_refresh {
            return Ok((instrument, stored));
        }

        let end = Utc::now().date_naive();
        let start = end - Duration::days(self.config.quick_window_days);
        let request = DailyBarsRequest::new(ticker)
            .with_range(start, end)
            .bypassing_cache(force_refresh);

        let fetched = self.provider.fetch_daily_bars(request).await?;
        if fetched.is_empty() && stored.is_empty() {
            return Err(ServiceError::NotFound {
                ticker: ticker.to_string(),
            });
        }

        save_bars(store.as_ref(), instrument.id, &fetched, force_refresh).await?;
        self.cache
            .delete_by_pattern(&format!("kis:*{ticker}*"))
            .await;

        info!(
            ticker,
            fetched = fetched.len(),
            force_refresh,
            "quick fetch saved, scheduling backfill"
        );
        self.spawn_backfill(ticker, instrument.id);

        let bars = store.get_bars(instrument.id, Timeframe::Daily, None).await?;
        Ok((instrument, bars))
    }

    /// Full analysis for a ticker: ensure bars, then assemble the report
    /// over the stored daily and weekly series.
    pub async fn analyze(&self, ticker: &str) -> Result<AnalysisReport, ServiceError> {
        let (instrument, daily_bars) = self.ensure_daily_bars(ticker, false).await?;
        let store = self.pool.store().await?;
        let weekly_bars = store
            .get_bars(instrument.id, Timeframe::Weekly, None)
            .await?;

        let daily = BarSeries::new(&instrument.ticker, Timeframe::Daily, daily_bars);
        let weekly = BarSeries::new(&instrument.ticker, Timeframe::Weekly, weekly_bars);
        Ok(report::build_report(&daily, &weekly))
    }

    async fn resolve_instrument(
        &self,
        store: &dyn BarStore,
        ticker: &str,
    ) -> Result<Instrument, ServiceError> {
        if let Some(existing) = store.find_instrument(ticker).await? {
            return Ok(existing);
        }

        // First sighting: the quote endpoint doubles as a ticker-exists
        // check and supplies the display name and market.
        let quote = self.provider.fetch_quote(ticker).await.map_err(|err| {
            if err.is_not_found() {
                ServiceError::NotFound {
                    ticker: ticker.to_string(),
                }
            } else {
                ServiceError::Upstream(err)
            }
        })?;

        Ok(store
            .get_or_create_instrument(ticker, &quote.name, &quote.market)
            .await?)
    }

    /// Detached full-history fetch. Owns its resources: a fresh store
    /// handle from the pool, clones of the provider and config. Failures
    /// are logged and swallowed, never surfaced to the original caller.
    fn spawn_backfill(&self, ticker: &str, instrument_id: i64) {
        let provider = Arc::clone(&self.provider);
        let pool = Arc::clone(&self.pool);
        let ticker = ticker.to_string();
        let days = self.config.full_history_days;

        tokio::spawn(async move {
            if let Err(err) = backfill(provider, pool, &ticker, instrument_id, days).await {
                warn!(ticker, %err, "background backfill failed");
            }
        });
    }
}

async fn backfill(
    provider: Arc<dyn DataProvider>,
    pool: Arc<dyn StorePool>,
    ticker: &str,
    instrument_id: i64,
    days: i64,
) -> Result<(), ServiceError> {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(days);
    let request = DailyBarsRequest::new(ticker)
        .with_range(start, end)
        .bypassing_cache(true);

    let bars = provider.fetch_daily_bars(request).await?;
    let store = pool.store().await?;
    let written = save_bars(store.as_ref(), instrument_id, &bars, false).await?;
    info!(ticker, fetched = bars.len(), written, "backfill complete");
    Ok(())
}

/// Upserts daily bars and the weekly bars re-derived from the full
/// stored daily history.
async fn save_bars(
    store: &dyn BarStore,
    instrument_id: i64,
    bars: &[Bar],
    overwrite: bool,
) -> Result<usize, ServiceError> {
    let written = store
        .upsert_bars(instrument_id, Timeframe::Daily, bars, overwrite)
        .await?;

    let all_daily = store.get_bars(instrument_id, Timeframe::Daily, None).await?;
    let weekly = to_weekly(&all_daily);
    store
        .upsert_bars(instrument_id, Timeframe::Weekly, &weekly, true)
        .await?;

    Ok(written)
}
