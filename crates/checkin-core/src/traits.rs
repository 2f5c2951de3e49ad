use crate::{
    answer::{Answer, NewAnswer, ValueSeries},
    error::CheckinError,
    message::{InboundEvent, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging channel trait, the conversation gateway.
///
/// A messaging platform implements this trait to deliver inbound events
/// and send questions, messages, and images back to the owner.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for inbound events.
    /// Returns a receiver that yields events from the authorized owner only.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<InboundEvent>, CheckinError>;

    /// Send a message (question or plain text) through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), CheckinError>;

    /// Send an image hosted at `url`.
    async fn send_image_url(&self, target: &str, url: &str) -> Result<(), CheckinError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), CheckinError>;
}

/// Answer persistence sink.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Store a completed answer, deriving its calendar fields.
    async fn save_answer(&self, answer: NewAnswer) -> Result<Answer, CheckinError>;

    /// Most recent numeric values for `key`, oldest first.
    async fn get_values(&self, key: &str) -> Result<ValueSeries, CheckinError>;

    /// Total number of stored answers.
    async fn answer_count(&self) -> Result<i64, CheckinError>;
}
