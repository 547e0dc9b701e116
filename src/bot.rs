use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::llm::LlmClient;

/// Shared application state
pub struct AppState {
    llm: LlmClient,
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let llm = LlmClient::new(config.clone());
        Self { llm, config }
    }
}

/// Start the Telegram bot
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = Bot::new(&state.config.bot_token);

    info!("Starting Telegram bot...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if text == "/start" {
        let first_name = msg
            .from
            .as_ref()
            .map(|user| user.first_name.clone())
            .unwrap_or_default();
        bot.send_message(msg.chat.id, welcome_text(&first_name))
            .await?;
        return Ok(());
    }

    // The free-text rule excludes every command, recognized or not.
    if text.starts_with('/') {
        return Ok(());
    }

    info!("Prompt: {}", text);

    // Typing indicator while the completion call is in flight
    bot.send_chat_action(msg.chat.id, teloxide::types::ChatAction::Typing)
        .await
        .ok();

    let reply = match state.llm.invoke(&text).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Completion failed: {:#}", e);
            format!("Error: {}", e)
        }
    };

    // Exactly one reply per inbound message, even when the answer is empty.
    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

fn welcome_text(first_name: &str) -> String {
    format!("Bot started. Welcome, {}!", first_name)
}
