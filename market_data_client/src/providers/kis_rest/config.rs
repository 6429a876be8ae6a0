use std::time::Duration;

use secrecy::SecretString;
use shared_utils::env::{get_env_var, get_env_var_or};

use crate::providers::{MissingEnvVarSnafu, ProviderInitError};
use snafu::ResultExt;

/// Runtime configuration for the KIS REST provider.
///
/// Credentials come from `KIS_APP_KEY` / `KIS_APP_SECRET`; everything else
/// has a production default and is overridable per deployment.
pub struct KisConfig {
    pub base_url: String,
    pub app_key: SecretString,
    pub app_secret: SecretString,

    /// Maximum simultaneously in-flight upstream calls.
    pub rate_limit: usize,
    /// Attempts per request before the failure propagates.
    pub retry_count: u32,
    /// Base backoff delay; doubled per attempt.
    pub retry_delay: Duration,

    /// TTL for cached daily-bar responses.
    pub cache_ttl_historical: Duration,
    /// TTL for cached quote snapshots.
    pub cache_ttl_quote: Duration,
}

pub const DEFAULT_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";

impl KisConfig {
    /// Builds a config from the environment.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let app_key = SecretString::new(get_env_var("KIS_APP_KEY").context(MissingEnvVarSnafu)?.into());
        let app_secret =
            SecretString::new(get_env_var("KIS_APP_SECRET").context(MissingEnvVarSnafu)?.into());
        let base_url = get_env_var_or("KIS_BASE_URL", DEFAULT_BASE_URL);

        Ok(Self::with_credentials(base_url, app_key, app_secret))
    }

    /// Builds a config with explicit credentials and default tuning.
    pub fn with_credentials(
        base_url: impl Into<String>,
        app_key: SecretString,
        app_secret: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            app_key,
            app_secret,
            rate_limit: 20,
            retry_count: 3,
            retry_delay: Duration::from_millis(500),
            cache_ttl_historical: Duration::from_secs(86_400),
            cache_ttl_quote: Duration::from_secs(300),
        }
    }
}
