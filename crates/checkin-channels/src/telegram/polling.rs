//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate};
use super::TelegramChannel;
use async_trait::async_trait;
use checkin_core::{
    error::CheckinError,
    message::{GeoPoint, InboundEvent, OutgoingMessage, ReplyMarkup},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What the poller should do with one update.
#[derive(Debug)]
pub(crate) enum UpdateAction {
    /// Forward to the router.
    Forward(InboundEvent),
    /// Refuse a chat that is not the owner.
    Deny { chat_id: i64 },
    /// Nothing usable in the update.
    Ignore,
}

/// Normalize a raw update into an inbound event for the owner chat.
///
/// Returns the callback query ID alongside, when the update was a button
/// press, so the poller can acknowledge it.
pub(crate) fn classify_update(update: TgUpdate, owner_chat_id: i64) -> (Option<String>, UpdateAction) {
    let (callback_id, msg, text, sender, is_callback) = if let Some(cq) = update.callback_query {
        let Some(msg) = cq.message else {
            return (Some(cq.id), UpdateAction::Ignore);
        };
        let text = cq.data.unwrap_or_default();
        (Some(cq.id), msg, text, Some(cq.from.id), true)
    } else if let Some(msg) = update.message {
        let text = msg.text.clone().unwrap_or_default();
        let sender = msg.from.as_ref().map(|u| u.id);
        (None, msg, text, sender, false)
    } else {
        return (None, UpdateAction::Ignore);
    };

    let chat_id = msg.chat.id;
    if chat_id != owner_chat_id {
        return (callback_id, UpdateAction::Deny { chat_id });
    }

    let location = if is_callback {
        None
    } else {
        msg.location.as_ref().map(|l| GeoPoint {
            latitude: l.latitude,
            longitude: l.longitude,
        })
    };

    if text.is_empty() && location.is_none() {
        debug!("telegram: ignoring update without text or location");
        return (callback_id, UpdateAction::Ignore);
    }

    let event = InboundEvent {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender_id: sender.unwrap_or(chat_id).to_string(),
        text,
        location,
        message_id: Some(msg.message_id),
        is_callback,
        timestamp: chrono::Utc::now(),
        reply_target: Some(chat_id.to_string()),
    };
    (callback_id, UpdateAction::Forward(event))
}

fn parse_chat_id(target: &str) -> Result<i64, CheckinError> {
    target
        .parse()
        .map_err(|e| CheckinError::Channel(format!("invalid telegram chat_id '{target}': {e}")))
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, CheckinError> {
        self.api.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let api = self.api.clone();
        let owner_chat_id = self.config.chat_id;
        let poll_timeout = self.config.poll_timeout_secs;
        let deny_message = self.deny_message.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{}?timeout={poll_timeout}", api.url("getUpdates"));
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match api
                    .client()
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(poll_timeout + 5))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let (callback_id, action) = classify_update(update, owner_chat_id);
                    if let Some(id) = callback_id {
                        api.answer_callback(&id).await;
                    }

                    match action {
                        UpdateAction::Forward(event) => {
                            if tx.send(event).await.is_err() {
                                info!("telegram channel receiver dropped, stopping poll");
                                return;
                            }
                        }
                        UpdateAction::Deny { chat_id } => {
                            warn!("refusing message from unauthorized chat {chat_id}");
                            if let Err(e) = api
                                .send_text(chat_id, &deny_message, &ReplyMarkup::None, None)
                                .await
                            {
                                warn!("telegram deny reply failed: {e}");
                            }
                        }
                        UpdateAction::Ignore => {}
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), CheckinError> {
        let chat_id_str = message
            .reply_target
            .as_deref()
            .ok_or_else(|| CheckinError::Channel("no reply_target on outgoing message".into()))?;
        let chat_id = parse_chat_id(chat_id_str)?;

        self.api
            .send_text(chat_id, &message.text, &message.markup, message.reply_to)
            .await
    }

    async fn send_image_url(&self, target: &str, url: &str) -> Result<(), CheckinError> {
        let chat_id = parse_chat_id(target)?;
        self.api.send_photo_url(chat_id, url).await
    }

    async fn stop(&self) -> Result<(), CheckinError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}
