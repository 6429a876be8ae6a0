#![cfg(test)]
//! Response-cache behavior of the KIS provider, exercised without any
//! network access. The provider points at a closed local port, so any
//! test that completes successfully did so from the cache alone.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use market_data_client::{
    cache::{self, MemoryCache},
    models::{bar::Bar, quote::Quote, request::DailyBarsRequest},
    providers::{
        DataProvider,
        kis_rest::{
            KisConfig, KisProvider,
            params::{daily_price_cache_key, quote_cache_key},
        },
    },
};
use secrecy::SecretString;

fn offline_provider(cache: Arc<MemoryCache>) -> KisProvider {
    let mut config = KisConfig::with_credentials(
        "http://127.0.0.1:9",
        SecretString::new("test-key".into()),
        SecretString::new("test-secret".into()),
    );
    config.retry_count = 1;
    config.retry_delay = Duration::from_millis(1);
    KisProvider::new(config, cache).expect("provider construction")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn bar(d: u32, close: f64) -> Bar {
    Bar {
        date: day(d),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

#[tokio::test]
async fn cached_daily_bars_are_served_without_an_upstream_call() {
    let cache = Arc::new(MemoryCache::new());
    let (start, end) = (day(1), day(31));
    let bars = vec![bar(2, 100.0), bar(3, 101.0), bar(4, 99.5)];
    let key = daily_price_cache_key("005930", start, end);
    cache::set_json(cache.as_ref(), &key, &bars, None).await;

    let provider = offline_provider(Arc::clone(&cache));
    let request = DailyBarsRequest::new("005930").with_range(start, end);

    let first = provider
        .fetch_daily_bars(request.clone())
        .await
        .expect("first fetch should be answered from the cache");
    assert_eq!(first, bars);

    // Same (ticker, range) again: identical bars, still no upstream call.
    let second = provider
        .fetch_daily_bars(request)
        .await
        .expect("repeat fetch should be answered from the cache");
    assert_eq!(second, first);
}

#[tokio::test]
async fn bypassing_the_cache_goes_upstream_even_when_seeded() {
    let cache = Arc::new(MemoryCache::new());
    let (start, end) = (day(1), day(31));
    let key = daily_price_cache_key("005930", start, end);
    cache::set_json(cache.as_ref(), &key, &vec![bar(2, 100.0)], None).await;

    let provider = offline_provider(cache);
    let request = DailyBarsRequest::new("005930")
        .with_range(start, end)
        .bypassing_cache(true);

    // With the cache bypassed the provider must go upstream, and the
    // upstream here is unreachable.
    let result = provider.fetch_daily_bars(request).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn a_different_range_misses_the_cache() {
    let cache = Arc::new(MemoryCache::new());
    let key = daily_price_cache_key("005930", day(1), day(31));
    cache::set_json(cache.as_ref(), &key, &vec![bar(2, 100.0)], None).await;

    let provider = offline_provider(cache);
    let request = DailyBarsRequest::new("005930").with_range(day(1), day(30));

    let result = provider.fetch_daily_bars(request).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn cached_quote_is_served_without_an_upstream_call() {
    let cache = Arc::new(MemoryCache::new());
    let quote = Quote {
        ticker: "005930".to_string(),
        name: "Samsung Electronics".to_string(),
        current_price: 71_500.0,
        open: 71_000.0,
        high: 72_000.0,
        low: 70_800.0,
        volume: 12_345_678.0,
        change: 500.0,
        change_sign: "2".to_string(),
        change_rate: 0.7,
        market: "KOSPI".to_string(),
    };
    cache::set_json(cache.as_ref(), &quote_cache_key("005930"), &quote, None).await;

    let provider = offline_provider(cache);
    let fetched = provider
        .fetch_quote("005930")
        .await
        .expect("quote should be answered from the cache");
    assert_eq!(fetched, quote);
}
