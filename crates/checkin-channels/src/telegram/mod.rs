//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for questions.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;

#[cfg(test)]
mod tests;

use checkin_core::config::{AuthConfig, TelegramConfig};
use send::BotApi;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    deny_message: String,
    api: BotApi,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig, auth: &AuthConfig) -> Self {
        let api = BotApi::new(&config.bot_token);
        Self {
            config,
            deny_message: auth.deny_message.clone(),
            api,
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}
