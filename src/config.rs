use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use crate::store::StoreClient;

pub const MODEL_ID_PARAMETER: &str = "/telebot/MODEL_ID";
pub const API_BASE_PARAMETER: &str = "/telebot/OPENAI_API_BASE";
pub const BOT_TOKEN_SECRET: &str = "/telebot/TELEGRAM_API_KEY";
pub const API_KEY_SECRET: &str = "/telebot/OPENAI_API_KEY";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Resolved once at startup; read-only for the rest of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_id: Option<String>,
    pub bot_token: String,
    pub api_key: String,
    pub api_base: String,
}

impl Config {
    /// Resolve all configuration from the store. Parameters degrade to
    /// defaults; the two secrets are required and fail resolution when
    /// absent or unreachable.
    pub async fn resolve(store: &StoreClient) -> Result<Self> {
        let model_id = optional_parameter(store, MODEL_ID_PARAMETER).await;
        let api_base = parameter_or(store, API_BASE_PARAMETER, DEFAULT_API_BASE).await;
        let bot_token = required_secret(store, BOT_TOKEN_SECRET).await?;
        let api_key = required_secret(store, API_KEY_SECRET).await?;

        info!("OPENAI_API_BASE = {}", api_base);

        Ok(Self {
            model_id,
            bot_token,
            api_key,
            api_base,
        })
    }

    pub fn completion_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

async fn optional_parameter(store: &StoreClient, name: &str) -> Option<String> {
    match store.get_parameter(name).await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            warn!("Parameter {} is not defined", name);
            None
        }
        Err(e) => {
            error!("Failed to fetch parameter {}: {:#}", name, e);
            None
        }
    }
}

async fn parameter_or(store: &StoreClient, name: &str, default: &str) -> String {
    optional_parameter(store, name)
        .await
        .unwrap_or_else(|| default.to_string())
}

async fn required_secret(store: &StoreClient, name: &str) -> Result<String> {
    match store.get_secret(name).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => bail!("required secret {} is not defined in the store", name),
        Err(e) => Err(e).with_context(|| format!("failed to fetch required secret {name}")),
    }
}
