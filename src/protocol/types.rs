//! Message types for agent communication protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Message type classification. Drives role dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain message, no role reacts to it
    #[default]
    General,
    /// A question expecting an answer
    Question,
    /// Answer to a question
    Answer,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::General => "general",
            MessageType::Question => "question",
            MessageType::Answer => "answer",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(MessageType::General),
            "question" => Ok(MessageType::Question),
            "answer" => Ok(MessageType::Answer),
            other => Err(Error::communication(format!(
                "unknown message type '{}'",
                other
            ))),
        }
    }
}
