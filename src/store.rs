use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8200";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub region: Option<String>,
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    /// The store's own location is ambient environment, not stored
    /// configuration: TELEBOT_STORE_ENDPOINT, TELEBOT_STORE_REGION,
    /// TELEBOT_STORE_TIMEOUT_SECS.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("TELEBOT_STORE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let region = std::env::var("TELEBOT_STORE_REGION").ok();
        let request_timeout_secs = std::env::var("TELEBOT_STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            endpoint,
            region,
            request_timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    value: String,
}

/// Client for the parameter/secret store sidecar.
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    config: StoreConfig,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn region(&self) -> Option<&str> {
        self.config.region.as_deref()
    }

    /// Fetch a non-secret parameter. `Ok(None)` means the store answered
    /// but the name is not defined there.
    pub async fn get_parameter(&self, name: &str) -> Result<Option<String>> {
        self.fetch("/v1/parameters/get", name).await
    }

    /// Fetch a secret. Same absence/failure split as `get_parameter`;
    /// callers decide whether an absent secret is fatal.
    pub async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        self.fetch("/v1/secrets/get", name).await
    }

    async fn fetch(&self, path: &str, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(Duration::from_secs(self.config.request_timeout_secs.max(1)))
            .json(&FetchRequest { name })
            .send()
            .await
            .with_context(|| format!("store request for {name} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .with_context(|| format!("store returned error for {name}"))?;

        let body: FetchResponse = response
            .json()
            .await
            .with_context(|| format!("failed to decode store response for {name}"))?;

        Ok(Some(body.value))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}
