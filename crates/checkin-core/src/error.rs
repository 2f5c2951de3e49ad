use thiserror::Error;

/// Top-level error type for checkin.
#[derive(Debug, Error)]
pub enum CheckinError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid or unreadable question catalog.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Answer storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// A message or stored value that does not fit the conversation state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
