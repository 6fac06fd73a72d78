//! Persistence for agents and the messages they exchange.
//!
//! The messaging core only talks to the [`Store`] trait; [`SqliteStore`] is
//! the default implementation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Free-form agent state, stored as a JSON object.
pub type AgentState = Map<String, Value>;

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub agent_type: String,
    pub model: String,
    pub state: AgentState,
    /// Unix ms
    pub created_at: i64,
    /// Unix ms
    pub last_active: i64,
}

/// A message as recorded by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: String,
    /// Unix ms
    pub timestamp: i64,
    pub processed: bool,
}

/// Durable record of agents, their state and their messages.
///
/// Implementations must be safe for concurrent use from several agents.
pub trait Store: Send + Sync {
    /// Register a new agent. Fails if the id is taken.
    fn create_agent(&self, agent_id: &str, agent_type: &str, model: &str) -> Result<()>;

    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>>;

    /// Replace an agent's state and refresh its activity time.
    fn update_agent_state(&self, agent_id: &str, state: &AgentState) -> Result<()>;

    /// Record a message, returning its row id.
    fn store_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        message_type: &str,
    ) -> Result<i64>;

    /// Messages sent or received by an agent, most recent first.
    fn get_agent_messages(&self, agent_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;

    fn mark_message_processed(&self, message_id: i64) -> Result<()>;

    /// Agents active within the last `minutes`, most recent first.
    fn get_active_agents(&self, minutes: u32) -> Result<Vec<AgentRecord>>;

    /// Delete messages older than `days`, returning how many were removed.
    fn cleanup_old_messages(&self, days: u32) -> Result<usize>;
}
