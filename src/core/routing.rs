//! Message routing for Parley.
//!
//! Handles:
//! - Agent registry (one agent per id)
//! - Delivery of built messages into the receiver's mailbox
//! - Running every registered agent as a long-lived task

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::protocol::Message;

/// Outbound buffer shared by served agents before the dispatcher picks up.
const OUTBOUND_BUFFER: usize = 64;

/// A reply the dispatcher could not hand to its receiver.
#[derive(Debug)]
pub struct Undelivered {
    pub message: Message,
    pub error: Error,
}

/// Handles returned by [`Router::serve_all`].
pub struct Serving {
    pub tasks: JoinSet<()>,
    /// Failed reply deliveries. Closes once the dispatcher ends.
    pub undelivered: mpsc::UnboundedReceiver<Undelivered>,
}

#[derive(Debug, Default)]
pub struct Router {
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

impl Router {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an agent. Ids are unique per router.
    pub fn register(&self, agent: Arc<Agent>) -> Result<()> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.contains_key(agent.id()) {
            return Err(Error::communication(format!(
                "agent {} is already registered",
                agent.id()
            )));
        }
        tracing::debug!(agent = %agent.id(), "Registered agent with router");
        agents.insert(agent.id().to_string(), agent);
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent_id)
            .cloned()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Hand a message to its receiver's `receive`.
    pub fn deliver(&self, message: Message) -> Result<()> {
        let agent = self.get(message.receiver_id()).ok_or_else(|| {
            Error::communication(format!("no agent registered as {}", message.receiver_id()))
        })?;
        agent.receive(message)
    }

    /// Spawn a `serve` loop per registered agent plus a dispatcher that
    /// delivers their replies. Every task ends once `shutdown` is set.
    pub fn serve_all(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Serving {
        let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
        let (failed_tx, undelivered) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        let agents: Vec<Arc<Agent>> = self
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for agent in agents {
            let tx = tx.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move { agent.serve(tx, shutdown).await });
        }
        drop(tx);

        let router = Arc::clone(self);
        tasks.spawn(async move {
            // Ends when every serve loop has dropped its sender.
            while let Some(message) = rx.recv().await {
                if let Err(error) = router.deliver(message.clone()) {
                    tracing::warn!(message = %message.id(), "Reply delivery failed: {}", error);
                    // Nobody listening; the warning above is all that is left.
                    let _ = failed_tx.send(Undelivered { message, error });
                }
            }
        });

        Serving { tasks, undelivered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::protocol::MessageType;
    use crate::providers::scripted::ScriptedGenerator;
    use std::time::Duration;

    fn agent(id: &str, role: Role) -> Arc<Agent> {
        let generator = Arc::new(ScriptedGenerator::new().reply("Please answer", "Because."));
        Arc::new(
            Agent::builder(id)
                .role(role)
                .capacity(2)
                .generator(generator)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let router = Router::new();
        router.register(agent("a", Role::Base)).unwrap();
        assert!(matches!(
            router.register(agent("a", Role::answer())),
            Err(Error::Communication(_))
        ));
        assert_eq!(router.agent_ids(), vec!["a".to_string()]);
    }

    #[test]
    fn test_deliver_to_unknown_agent() {
        let router = Router::new();
        let msg = Message::general("a", "ghost", "boo").unwrap();
        assert!(matches!(router.deliver(msg), Err(Error::Communication(_))));
    }

    #[test]
    fn test_deliver_propagates_queue_full() {
        let router = Router::new();
        router.register(agent("b", Role::Base)).unwrap();

        for _ in 0..2 {
            router.deliver(Message::general("a", "b", "x").unwrap()).unwrap();
        }
        assert!(matches!(
            router.deliver(Message::general("a", "b", "x").unwrap()),
            Err(Error::QueueFull { .. })
        ));
    }

    #[tokio::test]
    async fn test_serve_all_routes_replies_back() {
        let router = Router::new();
        let questioner = agent("Q", Role::question());
        let answerer = agent("A", Role::answer());
        router.register(Arc::clone(&questioner)).unwrap();
        router.register(Arc::clone(&answerer)).unwrap();

        let (stop_tx, stop_rx) = watch::channel(false);
        let Serving { mut tasks, mut undelivered } = router.serve_all(stop_rx);

        let question = questioner.send("A", "Why?", MessageType::Question).unwrap();
        router.deliver(question).unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while questioner.processed_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(answerer.processed_count(), 1);

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(joined) = tasks.join_next().await {
                joined.unwrap();
            }
        })
        .await
        .unwrap();
        assert!(undelivered.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_serve_all_reports_undeliverable_replies() {
        crate::logging::init_test();
        let router = Router::new();
        let answerer = agent("A", Role::answer());
        router.register(Arc::clone(&answerer)).unwrap();

        let (stop_tx, stop_rx) = watch::channel(false);
        let Serving { mut tasks, mut undelivered } = router.serve_all(stop_rx);

        // The asker never registered, so the answer has nowhere to go.
        let question = Message::new("ghost", "A", "Why?", MessageType::Question).unwrap();
        router.deliver(question).unwrap();

        let failed = tokio::time::timeout(Duration::from_secs(2), undelivered.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.message.sender_id(), "A");
        assert_eq!(failed.message.receiver_id(), "ghost");
        assert_eq!(failed.message.message_type(), MessageType::Answer);
        assert!(matches!(failed.error, Error::Communication(_)));

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(joined) = tasks.join_next().await {
                joined.unwrap();
            }
        })
        .await
        .unwrap();
    }
}
