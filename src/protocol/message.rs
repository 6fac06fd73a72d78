//! Immutable messages exchanged between agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::MessageType;
use crate::error::{Error, Result};

/// One unit of inter-agent communication.
///
/// Fields are private: a message is built once through [`Message::new`] or
/// [`MessageBuilder`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    sender_id: String,
    receiver_id: String,
    content: String,
    message_type: MessageType,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message of the given type, stamped with the current time.
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Result<Self> {
        MessageBuilder::from(sender_id)
            .to(receiver_id)
            .content(content)
            .message_type(message_type)
            .build()
    }

    /// Create a `general` message.
    pub fn general(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self> {
        Self::new(sender_id, receiver_id, content, MessageType::General)
    }

    /// Unique message ID (ULID).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Wall-clock creation time. Audit only.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check if this message is addressed to a specific agent.
    pub fn is_for(&self, agent_id: &str) -> bool {
        self.receiver_id == agent_id
    }
}

/// Builder for creating messages with fluent API.
pub struct MessageBuilder {
    sender_id: String,
    receiver_id: String,
    content: String,
    message_type: MessageType,
}

impl MessageBuilder {
    /// Start building a message from an agent.
    pub fn from(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: String::new(),
            content: String::new(),
            message_type: MessageType::default(),
        }
    }

    /// Address to a single agent.
    pub fn to(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = receiver_id.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Build the message. Both identifiers must be non-empty.
    pub fn build(self) -> Result<Message> {
        if self.sender_id.trim().is_empty() {
            return Err(Error::communication("sender_id must not be empty"));
        }
        if self.receiver_id.trim().is_empty() {
            return Err(Error::communication("receiver_id must not be empty"));
        }

        Ok(Message {
            id: ulid::Ulid::new().to_string(),
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            message_type: self.message_type,
            timestamp: Utc::now(),
        })
    }
}
