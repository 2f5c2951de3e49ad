use crate::catalog::{Question, QuestionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized inbound event from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Raw text, or the callback value of a pressed button.
    pub text: String,
    /// Shared location, if the message carried one.
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Platform message ID, used to thread canned replies.
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Whether this event came from an inline button press.
    #[serde(default)]
    pub is_callback: bool,
    pub timestamp: DateTime<Utc>,
    /// Platform-specific target for routing the response (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// An inline button: the label shown to the user and the value sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub value: String,
}

impl Button {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Input affordance attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ReplyMarkup {
    /// Leave the client keyboard untouched.
    #[default]
    None,
    /// One inline button per row.
    Inline(Vec<Button>),
    /// A one-time keyboard with a single "share location" button.
    RequestLocation { label: String },
    /// Hide any custom keyboard left over from a previous question.
    Remove,
}

/// An outgoing message to send through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(default)]
    pub markup: ReplyMarkup,
    /// Platform message ID this message replies to.
    #[serde(default)]
    pub reply_to: Option<i64>,
    /// Platform-specific target for routing (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl OutgoingMessage {
    /// A plain text message that also clears any custom keyboard.
    pub fn text(target: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: ReplyMarkup::Remove,
            reply_to: None,
            reply_target: Some(target.to_string()),
        }
    }

    /// Render a catalog question with the affordance its type calls for.
    ///
    /// Boolean questions get Yes/No buttons and location questions a
    /// share-location keyboard; these override any configured buttons.
    pub fn question(target: &str, question: &Question) -> Self {
        let markup = match question.kind {
            QuestionKind::Boolean => ReplyMarkup::Inline(vec![
                Button::new("Yes", "true"),
                Button::new("No", "false"),
            ]),
            QuestionKind::Location => ReplyMarkup::RequestLocation {
                label: "Provide your location".to_string(),
            },
            _ if !question.buttons.is_empty() => ReplyMarkup::Inline(
                question
                    .buttons
                    .iter()
                    .map(|(value, label)| Button::new(label, value))
                    .collect(),
            ),
            _ => ReplyMarkup::None,
        };
        Self {
            text: question.text.clone(),
            markup,
            reply_to: None,
            reply_target: Some(target.to_string()),
        }
    }

    /// Thread this message as a reply to a platform message.
    pub fn replying_to(mut self, message_id: Option<i64>) -> Self {
        self.reply_to = message_id;
        self
    }
}
