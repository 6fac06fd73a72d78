//! Agents: a named identity, one bounded mailbox, and a role.
//!
//! `send` only builds a message; delivery into the peer's mailbox is the
//! caller's job (see [`crate::core::Router`]). `receive` is the single
//! admission point into a mailbox and `process_messages` its single consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::{Error, Result};
use crate::protocol::{Mailbox, MailboxFull, Message, MessageType};
use crate::providers::{Generator, OllamaClient};
use crate::store::{AgentState, Store};

pub mod role;

pub use role::{AnswerRole, QuestionRole, Role};

pub const DEFAULT_MODEL: &str = "mistral";

pub struct Agent {
    id: String,
    model: String,
    role: Role,
    mailbox: Mailbox,
    generator: Arc<dyn Generator>,
    store: Option<Arc<dyn Store>>,
    /// Held for the whole of a drain so one agent never runs two handlers at once.
    drain: Mutex<()>,
    processed: AtomicU64,
}

/// A message whose handler returned an error during a drain.
#[derive(Debug)]
pub struct HandlerFailure {
    pub message: Message,
    pub error: Error,
}

/// Outcome of one `process_messages` drain.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Number of messages whose handler completed.
    pub handled: usize,
    /// Reply messages produced by handlers, in dispatch order.
    pub replies: Vec<Message>,
    pub failures: Vec<HandlerFailure>,
}

impl DrainReport {
    /// Turn the first failure into an error, keeping the replies otherwise.
    pub fn into_result(self) -> Result<Vec<Message>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(self.replies),
        }
    }
}

impl Agent {
    pub fn builder(id: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Messages admitted by `receive` and not yet dispatched.
    pub fn queued(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_idle(&self) -> bool {
        self.mailbox.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// Messages handled successfully over the agent's lifetime.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Build a message from this agent. Does not deliver it.
    pub fn send(
        &self,
        to: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Result<Message> {
        let message = Message::new(self.id.as_str(), to, content, message_type)?;
        tracing::debug!(
            agent = %self.id,
            to = %message.receiver_id(),
            kind = %message.message_type(),
            "Sending message"
        );
        Ok(message)
    }

    /// Admit a message into this agent's mailbox.
    pub fn receive(&self, message: Message) -> Result<()> {
        if !message.is_for(&self.id) {
            return Err(Error::communication(format!(
                "message intended for {}, not {}",
                message.receiver_id(),
                self.id
            )));
        }

        let record = self.store.as_ref().map(|store| (store, message.clone()));

        self.mailbox
            .try_enqueue(message)
            .map_err(|MailboxFull { capacity, .. }| {
                tracing::warn!(agent = %self.id, capacity, "Mailbox full, rejecting message");
                Error::QueueFull {
                    agent_id: self.id.clone(),
                    capacity,
                }
            })?;

        tracing::debug!(agent = %self.id, queued = self.mailbox.len(), "Received message");

        if let Some((store, message)) = record {
            if let Err(e) = store.store_message(
                message.sender_id(),
                message.receiver_id(),
                message.content(),
                message.message_type().as_str(),
            ) {
                tracing::warn!(agent = %self.id, "Failed to record message: {}", e);
            }
        }

        Ok(())
    }

    /// Drain the mailbox once, handling each message to completion in FIFO
    /// order. Returns as soon as the mailbox is empty.
    pub async fn process_messages(&self) -> DrainReport {
        let _guard = self.drain.lock().await;
        let mut report = DrainReport::default();

        while let Some(message) = self.mailbox.dequeue() {
            match self.handle(&message).await {
                Ok(reply) => {
                    report.handled += 1;
                    self.processed.fetch_add(1, Ordering::Relaxed);
                    self.record_state(&message);
                    report.replies.extend(reply);
                }
                Err(error) => {
                    tracing::warn!(
                        agent = %self.id,
                        message = %message.id(),
                        "Handler failed: {}",
                        error
                    );
                    report.failures.push(HandlerFailure { message, error });
                }
            }
        }

        report
    }

    /// Dispatch one message to the role.
    pub async fn handle(&self, message: &Message) -> Result<Option<Message>> {
        self.role.handle(self, message).await
    }

    /// Run until `shutdown` flips to true, draining whenever messages arrive
    /// and forwarding replies to `outbound`. Stops early if `outbound` closes.
    pub async fn serve(&self, outbound: mpsc::Sender<Message>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(agent = %self.id, role = self.role.name(), "Agent serving");

        loop {
            let report = self.process_messages().await;
            for reply in report.replies {
                if outbound.send(reply).await.is_err() {
                    tracing::debug!(agent = %self.id, "Outbound channel closed");
                    return;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.mailbox.arrival() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(agent = %self.id, "Agent stopped");
    }

    /// Ask the generation backend for text using this agent's model.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(self.generator.generate(prompt, &self.model).await?)
    }

    pub async fn generate_question(&self, topic: &str) -> Result<String> {
        match &self.role {
            Role::Question(role) => role.generate_question(self, topic).await,
            other => Err(Error::NotImplemented(format!(
                "{} role cannot generate questions",
                other.name()
            ))),
        }
    }

    pub async fn generate_answer(&self, question: &str) -> Result<String> {
        match &self.role {
            Role::Answer(role) => role.generate_answer(self, question).await,
            other => Err(Error::NotImplemented(format!(
                "{} role cannot generate answers",
                other.name()
            ))),
        }
    }

    /// Make sure the store knows this agent. No-op without a store.
    pub fn register(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if store.get_agent(&self.id)?.is_none() {
            store.create_agent(&self.id, self.role.name(), &self.model)?;
            tracing::info!(agent = %self.id, "Registered agent");
        }
        Ok(())
    }

    fn record_state(&self, message: &Message) {
        let Some(store) = &self.store else {
            return;
        };

        let mut state = AgentState::new();
        state.insert("role".to_string(), json!(self.role.name()));
        state.insert("processed_count".to_string(), json!(self.processed_count()));
        state.insert("last_message_id".to_string(), json!(message.id()));
        state.insert("last_message_type".to_string(), json!(message.message_type()));
        state.insert("last_sender".to_string(), json!(message.sender_id()));
        state.insert(
            "last_processed_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        if let Err(e) = store.update_agent_state(&self.id, &state) {
            tracing::warn!(agent = %self.id, "Failed to update agent state: {}", e);
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("role", &self.role)
            .field("queued", &self.mailbox.len())
            .field("generator", &self.generator.name())
            .finish()
    }
}

/// Builder for agents. Defaults: base role, `mistral`, capacity 100, a local
/// Ollama client and no store.
pub struct AgentBuilder {
    id: String,
    model: String,
    role: Role,
    capacity: usize,
    generator: Option<Arc<dyn Generator>>,
    store: Option<Arc<dyn Store>>,
}

impl AgentBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: DEFAULT_MODEL.to_string(),
            role: Role::Base,
            capacity: crate::protocol::mailbox::DEFAULT_CAPACITY,
            generator: None,
            store: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Agent> {
        if self.id.trim().is_empty() {
            return Err(Error::communication("agent_id must not be empty"));
        }
        let mailbox = Mailbox::new(self.capacity).ok_or_else(|| {
            Error::Config(format!("mailbox capacity for {} must be greater than zero", self.id))
        })?;

        Ok(Agent {
            id: self.id,
            model: self.model,
            role: self.role,
            mailbox,
            generator: self
                .generator
                .unwrap_or_else(|| Arc::new(OllamaClient::default()) as Arc<dyn Generator>),
            store: self.store,
            drain: Mutex::new(()),
            processed: AtomicU64::new(0),
        })
    }
}
