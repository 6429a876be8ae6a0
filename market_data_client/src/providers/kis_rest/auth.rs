//! OAuth token lifecycle for the KIS REST provider.
//!
//! The bearer token is valid for ~24 h and shared by every concurrent
//! request through the response cache. It is invalidated (deleted) whenever
//! the provider answers 401, which lets exactly one re-authentication happen
//! on the retrying request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::providers::{InternalSnafu, ProviderError, RequestSnafu, TokenSnafu};

use super::params::{TOKEN_CACHE_KEY, TOKEN_CACHE_TTL_SECS, TOKEN_PATH};

fn header_value(raw: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(raw).map_err(|_| {
        InternalSnafu {
            message: "credential contains characters invalid in a header".to_string(),
        }
        .build()
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

pub struct TokenManager {
    http: Client,
    base_url: String,
    app_key: SecretString,
    app_secret: SecretString,
    cache: Arc<dyn ResponseCache>,
}

impl TokenManager {
    pub fn new(
        http: Client,
        base_url: String,
        app_key: SecretString,
        app_secret: SecretString,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            http,
            base_url,
            app_key,
            app_secret,
            cache,
        }
    }

    /// Returns a bearer token, reusing the cached one when present.
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.cache.get(TOKEN_CACHE_KEY).await {
            debug!("reusing cached access token");
            return Ok(token);
        }

        let token = self.request_token().await?;
        self.cache
            .set(
                TOKEN_CACHE_KEY,
                token.clone(),
                Some(Duration::from_secs(TOKEN_CACHE_TTL_SECS)),
            )
            .await;
        Ok(token)
    }

    /// Builds the authenticated header set for a quotation request:
    /// bearer token plus the provider's app-credential headers. `custtype P`
    /// marks an individual (non-partner) account.
    pub async fn authed_headers(&self) -> Result<HeaderMap, ProviderError> {
        let token = self.access_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::AUTHORIZATION,
            header_value(&format!("Bearer {token}"))?,
        );
        headers.insert("appkey", header_value(self.app_key.expose_secret())?);
        headers.insert("appsecret", header_value(self.app_secret.expose_secret())?);
        headers.insert("custtype", HeaderValue::from_static("P"));
        Ok(headers)
    }

    /// Drops the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        self.cache.delete(TOKEN_CACHE_KEY).await;
        info!("invalidated cached access token");
    }

    async fn request_token(&self) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let body = json!({
            "grant_type": "client_credentials",
            "appkey": self.app_key.expose_secret(),
            "appsecret": self.app_secret.expose_secret(),
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context(RequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return TokenSnafu {
                message: format!("token endpoint returned {status}: {message}"),
            }
            .fail();
        }

        let parsed: TokenResponse = response.json().await.context(RequestSnafu)?;
        match parsed.access_token {
            Some(token) => {
                info!("acquired new access token");
                Ok(token)
            }
            None => TokenSnafu {
                message: "token endpoint response carried no access_token".to_string(),
            }
            .fail(),
        }
    }
}
