//! Error types for Parley.

use thiserror::Error;

use crate::providers::GenerationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Wrong recipient or malformed message construction input.
    #[error("Communication error: {0}")]
    Communication(String),

    /// The receiving agent's mailbox is at capacity.
    #[error("Message queue full for agent {agent_id} (capacity {capacity})")]
    QueueFull { agent_id: String, capacity: usize },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A role without behavior was asked to handle a message.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn communication(s: impl Into<String>) -> Self {
        Error::Communication(s.into())
    }

    /// True for conditions a caller may retry after backing off.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::QueueFull { .. } | Error::Generation(_))
    }
}
