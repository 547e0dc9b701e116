mod bot;
mod config;
mod llm;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;
use crate::store::{StoreClient, StoreConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Store location comes from the process environment or .env
    let _ = dotenvy::dotenv();

    let store = StoreClient::new(StoreConfig::from_env());
    info!("Store region: {}", store.region().unwrap_or("unset"));
    info!("Store endpoint: {}", store.endpoint());

    // All configuration must be resolved before any message is accepted.
    let config = Config::resolve(&store)
        .await
        .context("Failed to resolve configuration from the store")?;

    info!("Configuration resolved successfully");
    info!("  Model: {}", config.model_id.as_deref().unwrap_or("unset"));

    let state = Arc::new(AppState::new(config));

    info!("Bot is starting...");
    bot::run(state).await?;

    Ok(())
}
