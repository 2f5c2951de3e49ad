//! Bot API calls: text with keyboards, photos by URL, callback answers, command menu.

use crate::utils::split_message;
use checkin_core::{error::CheckinError, message::ReplyMarkup};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Thin Bot API client shared by the channel and its polling task.
#[derive(Clone)]
pub(crate) struct BotApi {
    client: reqwest::Client,
    base_url: String,
}

impl BotApi {
    pub(crate) fn new(bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Send a text message. The keyboard rides on the last chunk.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: &ReplyMarkup,
        reply_to: Option<i64>,
    ) -> Result<(), CheckinError> {
        let chunks = split_message(text, 4096);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });
            if i == 0 {
                if let Some(id) = reply_to {
                    body["reply_to_message_id"] = json!(id);
                }
            }
            if i == last {
                if let Some(kb) = reply_markup_json(markup) {
                    body["reply_markup"] = kb;
                }
            }

            let resp = self
                .client
                .post(self.url("sendMessage"))
                .json(&body)
                .send()
                .await
                .map_err(|e| CheckinError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let error_text = resp.text().await.unwrap_or_default();
                if error_text.contains("can't parse entities") {
                    warn!("Markdown parse failed, retrying as plain text: {error_text}");
                    if let Some(obj) = body.as_object_mut() {
                        obj.remove("parse_mode");
                    }
                    let plain_resp = self
                        .client
                        .post(self.url("sendMessage"))
                        .json(&body)
                        .send()
                        .await
                        .map_err(|e| {
                            CheckinError::Channel(format!("telegram send (plain) failed: {e}"))
                        })?;
                    if !plain_resp.status().is_success() {
                        let plain_err = plain_resp.text().await.unwrap_or_default();
                        return Err(CheckinError::Channel(format!(
                            "telegram send (plain fallback) failed: {plain_err}"
                        )));
                    }
                } else {
                    return Err(CheckinError::Channel(format!(
                        "telegram send failed ({status}): {error_text}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Send a photo that Telegram fetches from `url`.
    pub(crate) async fn send_photo_url(&self, chat_id: i64, url: &str) -> Result<(), CheckinError> {
        let body = json!({ "chat_id": chat_id, "photo": url });
        let resp = self
            .client
            .post(self.url("sendPhoto"))
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckinError::Channel(format!("telegram sendPhoto failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(CheckinError::Channel(format!(
                "failed to send image ({status}): {error_text}"
            )));
        }
        Ok(())
    }

    /// Stop the client's loading spinner on a pressed button. Best-effort.
    pub(crate) async fn answer_callback(&self, callback_id: &str) {
        let body = json!({ "callback_query_id": callback_id });
        match self
            .client
            .post(self.url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                let text = resp.text().await.unwrap_or_default();
                warn!("telegram answerCallbackQuery failed: {text}");
            }
            Ok(_) => {}
            Err(e) => warn!("telegram answerCallbackQuery failed: {e}"),
        }
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "track", "description": "Run a category or a single question now" },
                { "command": "skip", "description": "Skip the current question" },
                { "command": "skip_all", "description": "Skip the rest of this check-in" },
                { "command": "graph", "description": "Chart the recent answers for a key" },
                { "command": "status", "description": "Current check-in and schedule" },
                { "command": "help", "description": "Show available commands" },
            ]
        });

        match self
            .client
            .post(self.url("setMyCommands"))
            .json(&commands)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}

/// Bot API `reply_markup` for a keyboard, or `None` to leave it untouched.
pub(crate) fn reply_markup_json(markup: &ReplyMarkup) -> Option<Value> {
    match markup {
        ReplyMarkup::None => None,
        ReplyMarkup::Inline(buttons) => {
            let rows: Vec<Value> = buttons
                .iter()
                .map(|b| json!([{ "text": b.label, "callback_data": b.value }]))
                .collect();
            Some(json!({ "inline_keyboard": rows }))
        }
        ReplyMarkup::RequestLocation { label } => Some(json!({
            "keyboard": [[{ "text": label, "request_location": true }]],
            "one_time_keyboard": true,
            "resize_keyboard": true,
        })),
        ReplyMarkup::Remove => Some(json!({ "remove_keyboard": true })),
    }
}
