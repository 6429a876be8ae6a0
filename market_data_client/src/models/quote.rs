use serde::{Deserialize, Serialize};

/// Latest price snapshot for one instrument.
///
/// Produced by [`DataProvider::fetch_quote`](crate::providers::DataProvider::fetch_quote)
/// from the provider's current-price endpoint; cached with a short TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    /// Absolute change versus the prior close.
    pub change: f64,
    /// Provider-native change-direction marker.
    pub change_sign: String,
    /// Percentage change versus the prior close.
    pub change_rate: f64,
    /// Market classification as reported by the provider (e.g., KOSPI).
    pub market: String,
}
