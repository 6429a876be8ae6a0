use market_data_client::providers::ProviderError;
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The instrument is unknown, or the provider returned nothing after
    /// all fallback attempts.
    #[error("No data found for ticker '{ticker}'")]
    NotFound { ticker: String },

    /// The upstream provider failed after exhausting its retries.
    #[error("Upstream provider unavailable: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}
