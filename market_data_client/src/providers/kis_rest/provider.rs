//! The KIS REST [`DataProvider`] implementation.
//!
//! One provider instance is built at process start and shared by every
//! request. Upstream concurrency is capped by a process-wide semaphore;
//! transient failures are retried with exponential backoff; a 401 response
//! invalidates the cached token so the next attempt re-authenticates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use snafu::{IntoError, ResultExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{self, ResponseCache};
use crate::models::{bar::Bar, quote::Quote, request::DailyBarsRequest};
use crate::providers::{
    ApiSnafu, ClientBuildSnafu, DataProvider, InternalSnafu, MalformedSnafu, ProviderError,
    ProviderInitError, RequestSnafu,
};

use super::auth::TokenManager;
use super::config::KisConfig;
use super::params::{
    self, CURRENT_PRICE_PATH, CURRENT_PRICE_TR_ID, DAILY_PRICE_PATH, DAILY_PRICE_TR_ID,
    daily_price_cache_key, daily_price_query, quote_cache_key, quote_query,
};
use super::response::{KisEnvelope, parse_daily_rows, parse_quote};

struct Page {
    envelope: KisEnvelope,
    /// Continuation marker for the next page, when one exists.
    tr_cont: Option<String>,
}

pub struct KisProvider {
    http: Client,
    base_url: String,
    retry_count: u32,
    retry_delay: Duration,
    cache_ttl_historical: Duration,
    cache_ttl_quote: Duration,
    auth: TokenManager,
    gate: Arc<Semaphore>,
    cache: Arc<dyn ResponseCache>,
}

impl KisProvider {
    pub fn new(
        config: KisConfig,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self, ProviderInitError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;

        let KisConfig {
            base_url,
            app_key,
            app_secret,
            rate_limit,
            retry_count,
            retry_delay,
            cache_ttl_historical,
            cache_ttl_quote,
        } = config;

        let auth = TokenManager::new(
            http.clone(),
            base_url.clone(),
            app_key,
            app_secret,
            Arc::clone(&cache),
        );

        Ok(Self {
            http,
            base_url,
            retry_count,
            retry_delay,
            cache_ttl_historical,
            cache_ttl_quote,
            auth,
            gate: Arc::new(Semaphore::new(rate_limit)),
            cache,
        })
    }

    /// Creates a provider from `KIS_APP_KEY` / `KIS_APP_SECRET` /
    /// `KIS_BASE_URL`.
    pub fn from_env(cache: Arc<dyn ResponseCache>) -> Result<Self, ProviderInitError> {
        Self::new(KisConfig::from_env()?, cache)
    }

    /// Issues one upstream GET with rate limiting, retry, and 401 recovery.
    ///
    /// The semaphore slot is held for the whole attempt sequence so the
    /// backoff sleeps count against the in-flight budget.
    async fn request_page(
        &self,
        path: &str,
        tr_id: &str,
        query: &[(String, String)],
        tr_cont: Option<&str>,
    ) -> Result<Page, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let _permit = self.gate.acquire().await.map_err(|_| {
            InternalSnafu {
                message: "concurrency gate closed".to_string(),
            }
            .build()
        })?;

        let mut last_error: Option<ProviderError> = None;
        for attempt in 0..self.retry_count {
            if attempt > 0 {
                let delay = self.retry_delay * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            let mut headers = self.auth.authed_headers().await?;
            headers.insert("tr_id", header_value(tr_id)?);
            if let Some(marker) = tr_cont {
                headers.insert("tr_cont", header_value(marker)?);
            }

            let sent = self
                .http
                .get(&url)
                .headers(headers)
                .query(query)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(source) => {
                    warn!(attempt, %url, "transport error, will retry");
                    last_error = Some(RequestSnafu.into_error(source));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                // Token expired: invalidate so the next attempt
                // re-authenticates.
                self.auth.invalidate().await;
                let message = response.text().await.unwrap_or_default();
                last_error = Some(
                    ApiSnafu {
                        status: status.as_u16(),
                        message,
                    }
                    .build(),
                );
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown API error".to_string());
                warn!(attempt, status = status.as_u16(), "API error, will retry");
                last_error = Some(
                    ApiSnafu {
                        status: status.as_u16(),
                        message,
                    }
                    .build(),
                );
                continue;
            }

            let continuation = params::continuation_token(
                response
                    .headers()
                    .get("tr_cont")
                    .and_then(|v| v.to_str().ok()),
            );
            let envelope: KisEnvelope = response.json().await.context(RequestSnafu)?;
            if !envelope.is_success() {
                return ApiSnafu {
                    status: status.as_u16(),
                    message: envelope.message(),
                }
                .fail();
            }

            return Ok(Page {
                envelope,
                tr_cont: continuation,
            });
        }

        Err(last_error.unwrap_or_else(|| {
            InternalSnafu {
                message: "retry budget was zero".to_string(),
            }
            .build()
        }))
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(raw).map_err(|_| {
        InternalSnafu {
            message: format!("value {raw:?} is invalid in a header"),
        }
        .build()
    })
}

#[async_trait]
impl DataProvider for KisProvider {
    async fn fetch_daily_bars(&self, request: DailyBarsRequest) -> Result<Vec<Bar>, ProviderError> {
        let end = request.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = request.start.unwrap_or(end - chrono::Duration::days(365));
        let cache_key = daily_price_cache_key(&request.ticker, start, end);

        if !request.bypass_cache {
            if let Some(bars) =
                cache::get_json::<Vec<Bar>>(self.cache.as_ref(), &cache_key).await
            {
                debug!(ticker = %request.ticker, "daily-price cache hit");
                return Ok(bars);
            }
        }

        let query = daily_price_query(&request.ticker, start, end);
        let mut all_bars: Vec<Bar> = Vec::new();
        let mut tr_cont: Option<String> = None;

        loop {
            let page = self
                .request_page(DAILY_PRICE_PATH, DAILY_PRICE_TR_ID, &query, tr_cont.as_deref())
                .await?;

            let output = page.envelope.output.as_ref().ok_or_else(|| {
                MalformedSnafu {
                    message: "daily-price response carried no output".to_string(),
                }
                .build()
            })?;

            let bars = parse_daily_rows(output);
            info!(
                ticker = %request.ticker,
                page = bars.len(),
                total = all_bars.len() + bars.len(),
                "collected daily-price page"
            );
            all_bars.extend(bars);

            match page.tr_cont {
                Some(marker) => tr_cont = Some(marker),
                None => break,
            }
        }

        all_bars.sort_by_key(|b| b.date);

        if !request.bypass_cache && !all_bars.is_empty() {
            cache::set_json(
                self.cache.as_ref(),
                &cache_key,
                &all_bars,
                Some(self.cache_ttl_historical),
            )
            .await;
        }

        Ok(all_bars)
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        let cache_key = quote_cache_key(ticker);
        if let Some(quote) = cache::get_json::<Quote>(self.cache.as_ref(), &cache_key).await {
            debug!(ticker, "quote cache hit");
            return Ok(quote);
        }

        let query = quote_query(ticker);
        let page = self
            .request_page(CURRENT_PRICE_PATH, CURRENT_PRICE_TR_ID, &query, None)
            .await?;

        let quote = page
            .envelope
            .output
            .as_ref()
            .and_then(parse_quote)
            .ok_or_else(|| {
                MalformedSnafu {
                    message: format!("no quote in response for {ticker}"),
                }
                .build()
            })?;

        cache::set_json(
            self.cache.as_ref(),
            &cache_key,
            &quote,
            Some(self.cache_ttl_quote),
        )
        .await;

        Ok(quote)
    }
}
