//! Bot API transport over HTTPS, backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::trace;

use crate::config::BotConfig;
use crate::error::{RuntimeError, RuntimeResult};
use ferrogram_core::{ApiError, ApiResult, BotApi, parse_response};

/// Calls Bot API methods by POSTing JSON to `{api_url}/bot{token}/{method}`.
#[derive(Clone)]
pub struct HttpBotApi {
    client: Client,
    base: String,
}

impl HttpBotApi {
    /// Creates a client for `token` against the public API server.
    pub fn new(token: impl AsRef<str>) -> RuntimeResult<Self> {
        Self::from_config(&BotConfig {
            token: token.as_ref().to_string(),
            ..Default::default()
        })
    }

    pub fn from_config(config: &BotConfig) -> RuntimeResult<Self> {
        if config.token.is_empty() {
            return Err(RuntimeError::MissingToken);
        }
        let client = ClientBuilder::new()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RuntimeError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_url, &config.token))
    }

    /// Uses a preconfigured client, e.g. one with a proxy.
    pub fn with_client(client: Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
        trace!(method, "Calling Bot API");
        let resp = self
            .client
            .post(self.method_url(method))
            .json(&params)
            .send()
            .await
            .map_err(|e| ApiError::transport(e.without_url()))?;

        // Error responses carry the same JSON envelope, so the status is
        // only consulted when the body cannot be parsed.
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::transport(e.without_url()))?;

        match parse_response(&body) {
            Err(ApiError::Decode(reason)) if !status.is_success() => Err(ApiError::transport(
                format!("HTTP {}: {reason}", status.as_u16()),
            )),
            other => other,
        }
    }
}

impl std::fmt::Debug for HttpBotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the base URL embeds the token
        f.debug_struct("HttpBotApi").finish_non_exhaustive()
    }
}
