//! KIS-style REST provider.
//!
//! Talks to a Korea Investment & Securities open-API compatible endpoint:
//! OAuth client-credentials token endpoint, transaction-id (`tr_id`) routed
//! quotation endpoints, and `tr_cont` header-based response continuation.

pub mod auth;
pub mod config;
pub mod params;
pub mod provider;
pub mod response;

pub use config::KisConfig;
pub use provider::KisProvider;
