//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, which serves as a unified
//! interface for fetching daily bars and price snapshots from any market data
//! vendor. Each concrete provider implementation (such as the KIS REST
//! provider) handles vendor-specific API logic: authentication lifecycle,
//! rate limiting, retries, pagination, and response normalization.
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`dyn DataProvider`) so orchestration code can be tested against stubs.

pub mod kis_rest;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{bar::Bar, quote::Quote, request::DailyBarsRequest};

/// Trait for fetching price data from a market data provider.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches daily OHLCV bars for one instrument, sorted by date ascending.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Bar>)` - Normalized bars; may be empty when the provider has
    ///   no data for the requested range.
    /// * `Err(ProviderError)` - After local retries are exhausted.
    async fn fetch_daily_bars(&self, request: DailyBarsRequest) -> Result<Vec<Bar>, ProviderError>;

    /// Fetches the latest price snapshot for one instrument.
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// A required credential environment variable is unset.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// Failed to build the HTTP client.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a [`DataProvider`] implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// A transport-level error (network failure, timeout) that survived all
    /// retry attempts.
    #[snafu(display("API request failed: {source}"))]
    Request {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned a non-success status after all retry
    /// attempts.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The token endpoint rejected the credentials or returned no token.
    #[snafu(display("Token acquisition failed: {message}"))]
    Token {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body did not have the expected shape.
    #[snafu(display("Unexpected response shape: {message}"))]
    Malformed {
        message: String,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// True when the provider answered but reported the instrument unknown
    /// or returned an empty result; callers surface this as not-found rather
    /// than unavailable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Api { status, .. } if *status == 404)
            || matches!(self, ProviderError::Malformed { .. })
    }
}
