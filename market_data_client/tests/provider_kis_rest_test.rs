#![cfg(test)]
use std::sync::Arc;

use chrono::{Duration, Utc};
use market_data_client::{
    cache::MemoryCache,
    models::request::DailyBarsRequest,
    providers::{DataProvider, kis_rest::provider::KisProvider},
};
use serial_test::serial;

#[tokio::test]
#[serial]
#[ignore]
async fn test_kis_provider_fetch_daily_bars() {
    // This test requires KIS_APP_KEY and KIS_APP_SECRET to be set in the environment.
    dotenvy::dotenv().ok();
    if std::env::var("KIS_APP_KEY").is_err() || std::env::var("KIS_APP_SECRET").is_err() {
        println!("Skipping test_kis_provider_fetch_daily_bars: API keys not set.");
        return;
    }

    let cache = Arc::new(MemoryCache::new());
    let provider = KisProvider::from_env(cache).expect("Failed to create KisProvider");

    let end = Utc::now().date_naive();
    let start = end - Duration::days(30);
    // Samsung Electronics
    let request = DailyBarsRequest::new("005930").with_range(start, end);

    let result = provider.fetch_daily_bars(request).await;
    assert!(
        result.is_ok(),
        "fetch_daily_bars returned an error: {:?}",
        result.err()
    );

    let bars = result.unwrap();
    assert!(!bars.is_empty(), "Expected at least one bar for 005930");

    // Bars come back sorted ascending by date
    if bars.len() > 1 {
        assert!(bars[0].date < bars[bars.len() - 1].date);
    }
    for bar in &bars {
        assert!(bar.high >= bar.low, "high below low on {}", bar.date);
        assert!(bar.volume >= 0.0);
    }
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_kis_provider_fetch_quote() {
    dotenvy::dotenv().ok();
    if std::env::var("KIS_APP_KEY").is_err() || std::env::var("KIS_APP_SECRET").is_err() {
        println!("Skipping test_kis_provider_fetch_quote: API keys not set.");
        return;
    }

    let cache = Arc::new(MemoryCache::new());
    let provider = KisProvider::from_env(cache).expect("Failed to create KisProvider");

    let quote = provider
        .fetch_quote("005930")
        .await
        .expect("fetch_quote failed");
    assert_eq!(quote.ticker, "005930");
    assert!(quote.current_price > 0.0);
}
