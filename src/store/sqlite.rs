//! SQLite-backed store for agents and messages.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::{AgentRecord, AgentState, Store, StoredMessage};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS agents (
        agent_id TEXT PRIMARY KEY,
        agent_type TEXT NOT NULL,
        model TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        last_active INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        content TEXT NOT NULL,
        message_type TEXT NOT NULL DEFAULT 'general',
        timestamp INTEGER NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, timestamp);
    CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id, timestamp);
    CREATE INDEX IF NOT EXISTS idx_agents_last_active ON agents(last_active);
"#;

const AGENT_COLUMNS: &str = "agent_id, agent_type, model, state, created_at, last_active";
const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, message_type, timestamp, processed";

/// Opens a fresh connection per call, so the store is `Send + Sync` and
/// never holds a connection across an await point.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        store
            .connect()?
            .execute_batch(SCHEMA)
            .map_err(|e| Error::Store(format!("sqlite init: {}", e)))?;

        tracing::debug!("Opened store at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|e| Error::Store(format!("sqlite open: {}", e)))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn agent_row(row: &Row<'_>) -> rusqlite::Result<(AgentRecord, String)> {
    Ok((
        AgentRecord {
            agent_id: row.get(0)?,
            agent_type: row.get(1)?,
            model: row.get(2)?,
            state: AgentState::new(),
            created_at: row.get(4)?,
            last_active: row.get(5)?,
        },
        row.get(3)?,
    ))
}

fn with_state((mut record, state): (AgentRecord, String)) -> Result<AgentRecord> {
    record.state = serde_json::from_str(&state)?;
    Ok(record)
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        message_type: row.get(4)?,
        timestamp: row.get(5)?,
        processed: row.get(6)?,
    })
}

impl Store for SqliteStore {
    fn create_agent(&self, agent_id: &str, agent_type: &str, model: &str) -> Result<()> {
        let now = now_millis();
        self.connect()?
            .execute(
                "INSERT INTO agents (agent_id, agent_type, model, state, created_at, last_active) VALUES (?1, ?2, ?3, '{}', ?4, ?4)",
                params![agent_id, agent_type, model, now],
            )
            .map_err(|e| Error::Store(format!("sqlite insert agent {}: {}", agent_id, e)))?;
        Ok(())
    }

    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE agent_id = ?1", AGENT_COLUMNS),
                params![agent_id],
                agent_row,
            )
            .optional()
            .map_err(|e| Error::Store(format!("sqlite get agent: {}", e)))?;

        row.map(with_state).transpose()
    }

    fn update_agent_state(&self, agent_id: &str, state: &AgentState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        let changed = self
            .connect()?
            .execute(
                "UPDATE agents SET state = ?1, last_active = ?2 WHERE agent_id = ?3",
                params![json, now_millis(), agent_id],
            )
            .map_err(|e| Error::Store(format!("sqlite update agent state: {}", e)))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("agent {}", agent_id)));
        }
        Ok(())
    }

    fn store_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        message_type: &str,
    ) -> Result<i64> {
        let now = now_millis();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO messages (sender_id, receiver_id, content, message_type, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![sender_id, receiver_id, content, message_type, now],
        )
        .map_err(|e| Error::Store(format!("sqlite insert message: {}", e)))?;
        let id = conn.last_insert_rowid();

        conn.execute(
            "UPDATE agents SET last_active = ?1 WHERE agent_id IN (?2, ?3)",
            params![now, sender_id, receiver_id],
        )
        .map_err(|e| Error::Store(format!("sqlite touch agents: {}", e)))?;

        Ok(id)
    }

    fn get_agent_messages(&self, agent_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM messages WHERE sender_id = ?1 OR receiver_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
                MESSAGE_COLUMNS
            ))
            .map_err(|e| Error::Store(format!("sqlite prepare messages: {}", e)))?;

        let rows = stmt
            .query_map(params![agent_id, limit as i64], message_row)
            .map_err(|e| Error::Store(format!("sqlite query messages: {}", e)))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(format!("sqlite read messages: {}", e)))
    }

    fn mark_message_processed(&self, message_id: i64) -> Result<()> {
        let changed = self
            .connect()?
            .execute(
                "UPDATE messages SET processed = 1 WHERE id = ?1",
                params![message_id],
            )
            .map_err(|e| Error::Store(format!("sqlite mark processed: {}", e)))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("message {}", message_id)));
        }
        Ok(())
    }

    fn get_active_agents(&self, minutes: u32) -> Result<Vec<AgentRecord>> {
        let since = now_millis() - i64::from(minutes) * 60_000;
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM agents WHERE last_active >= ?1 ORDER BY last_active DESC",
                AGENT_COLUMNS
            ))
            .map_err(|e| Error::Store(format!("sqlite prepare agents: {}", e)))?;

        let rows = stmt
            .query_map(params![since], agent_row)
            .map_err(|e| Error::Store(format!("sqlite query agents: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(format!("sqlite read agents: {}", e)))?;

        rows.into_iter().map(with_state).collect()
    }

    fn cleanup_old_messages(&self, days: u32) -> Result<usize> {
        let cutoff = now_millis() - i64::from(days) * 86_400_000;
        let removed = self
            .connect()?
            .execute("DELETE FROM messages WHERE timestamp < ?1", params![cutoff])
            .map_err(|e| Error::Store(format!("sqlite cleanup messages: {}", e)))?;

        tracing::info!("Removed {} messages older than {} days", removed, days);
        Ok(removed)
    }
}
