//! Question/answer conversations between two agents.
//!
//! Handles:
//! - Building the questioner/answerer pair from settings
//! - Driving one exchange: generate, send, deliver, process, observe

use std::sync::Arc;

use serde::Serialize;

use super::routing::Router;
use crate::agent::{Agent, Role};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::protocol::{Message, MessageType};
use crate::providers::Generator;
use crate::store::Store;

/// One completed question/answer round.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub topic: String,
    pub question: Message,
    pub answer: Message,
}

pub struct Conversation {
    router: Arc<Router>,
    questioner: Arc<Agent>,
    answerer: Arc<Agent>,
}

impl Conversation {
    /// Pair two agents. The questioner must have the question role and the
    /// answerer the answer role.
    pub fn new(questioner: Arc<Agent>, answerer: Arc<Agent>) -> Result<Self> {
        if !matches!(questioner.role(), Role::Question(_)) {
            return Err(Error::Config(format!(
                "{} must have the question role",
                questioner.id()
            )));
        }
        if !matches!(answerer.role(), Role::Answer(_)) {
            return Err(Error::Config(format!(
                "{} must have the answer role",
                answerer.id()
            )));
        }

        let router = Router::new();
        router.register(Arc::clone(&questioner))?;
        router.register(Arc::clone(&answerer))?;

        for agent in [&questioner, &answerer] {
            if let Err(e) = agent.register() {
                tracing::warn!(agent = %agent.id(), "Failed to register agent in store: {}", e);
            }
        }

        Ok(Self {
            router,
            questioner,
            answerer,
        })
    }

    /// Build both agents from settings, sharing one generator and store.
    pub fn from_settings(
        settings: &Settings,
        generator: Arc<dyn Generator>,
        store: Option<Arc<dyn Store>>,
    ) -> Result<Self> {
        let build = |id: &str, role: Role| {
            let mut builder = Agent::builder(id)
                .role(role)
                .model(settings.agents.model.clone())
                .capacity(settings.agents.mailbox_capacity)
                .generator(Arc::clone(&generator));
            if let Some(store) = &store {
                builder = builder.store(Arc::clone(store));
            }
            builder.build().map(Arc::new)
        };

        Self::new(
            build(&settings.agents.questioner_id, Role::question())?,
            build(&settings.agents.answerer_id, Role::answer())?,
        )
    }

    pub fn questioner(&self) -> &Arc<Agent> {
        &self.questioner
    }

    pub fn answerer(&self) -> &Arc<Agent> {
        &self.answerer
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Run one exchange about `topic`. Fails on the first error; nothing is
    /// retried.
    pub async fn run(&self, topic: &str) -> Result<Exchange> {
        tracing::info!(topic, "Starting conversation");

        let question_text = self.questioner.generate_question(topic).await?;
        let question = self.questioner.send(
            self.answerer.id(),
            question_text,
            MessageType::Question,
        )?;
        self.router.deliver(question.clone())?;

        let replies = self.answerer.process_messages().await.into_result()?;
        let answer = replies
            .into_iter()
            .find(|m| m.message_type() == MessageType::Answer && m.is_for(self.questioner.id()))
            .ok_or_else(|| {
                Error::communication(format!("{} produced no answer", self.answerer.id()))
            })?;
        self.router.deliver(answer.clone())?;

        self.questioner.process_messages().await.into_result()?;

        tracing::info!(topic, "Conversation complete");
        Ok(Exchange {
            topic: topic.to_string(),
            question,
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedGenerator;
    use crate::store::SqliteStore;

    fn generator() -> Arc<ScriptedGenerator> {
        Arc::new(
            ScriptedGenerator::new()
                .reply("Generate a thought-provoking question", " Is Python slow? ")
                .reply("Please answer this question", "It depends.\n"),
        )
    }

    #[tokio::test]
    async fn test_full_exchange() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(dir.path().join("c.db")).unwrap());
        let generator = generator();

        let conversation =
            Conversation::from_settings(&Settings::default(), generator.clone(), Some(store.clone()))
                .unwrap();
        let exchange = conversation.run("python programming").await.unwrap();

        assert_eq!(exchange.question.content(), "Is Python slow?");
        assert_eq!(exchange.question.sender_id(), "questioner");
        assert_eq!(exchange.question.receiver_id(), "answerer");
        assert_eq!(exchange.answer.content(), "It depends.");
        assert_eq!(exchange.answer.receiver_id(), "questioner");
        assert_eq!(exchange.answer.message_type(), MessageType::Answer);

        assert_eq!(
            generator.prompts()[1].0,
            "Please answer this question: Is Python slow?"
        );
        assert_eq!(conversation.questioner().processed_count(), 1);
        assert!(conversation.answerer().is_idle());

        let history = store.get_agent_messages("questioner", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message_type, "answer");
        assert_eq!(history[1].message_type, "question");
        assert!(store.get_agent("answerer").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let generator = Arc::new(ScriptedGenerator::new().fail_on("thought-provoking"));
        let conversation =
            Conversation::from_settings(&Settings::default(), generator, None).unwrap();

        assert!(matches!(
            conversation.run("anything").await,
            Err(Error::Generation(_))
        ));
        assert!(conversation.answerer().is_idle());
    }

    #[test]
    fn test_roles_are_checked() {
        let generator: Arc<dyn Generator> = generator();
        let a = Arc::new(Agent::builder("a").role(Role::answer()).generator(generator.clone()).build().unwrap());
        let b = Arc::new(Agent::builder("b").role(Role::answer()).generator(generator).build().unwrap());
        assert!(matches!(Conversation::new(a, b), Err(Error::Config(_))));
    }
}
