//! Role behaviors: how an agent reacts to each message type.

use super::Agent;
use crate::error::{Error, Result};
use crate::protocol::{Message, MessageType};

/// The closed set of agent behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No behavior; handling any message is a contract violation.
    Base,
    Question(QuestionRole),
    Answer(AnswerRole),
}

impl Role {
    pub fn question() -> Self {
        Role::Question(QuestionRole)
    }

    pub fn answer() -> Self {
        Role::Answer(AnswerRole)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Base => "base",
            Role::Question(_) => "question",
            Role::Answer(_) => "answer",
        }
    }

    pub(crate) async fn handle(&self, agent: &Agent, message: &Message) -> Result<Option<Message>> {
        match self {
            Role::Base => Err(Error::NotImplemented(format!(
                "agent {} has no role to handle {} messages",
                agent.id(),
                message.message_type()
            ))),
            Role::Question(role) => role.handle(agent, message).await,
            Role::Answer(role) => role.handle(agent, message).await,
        }
    }
}

/// Turns topics into questions. Terminal on answers: it observes them and
/// does not reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuestionRole;

impl QuestionRole {
    pub fn prompt(topic: &str) -> String {
        format!("Generate a thought-provoking question about: {}", topic)
    }

    pub async fn generate_question(&self, agent: &Agent, topic: &str) -> Result<String> {
        let question = agent.generate(&Self::prompt(topic)).await?;
        Ok(question.trim().to_string())
    }

    async fn handle(&self, agent: &Agent, message: &Message) -> Result<Option<Message>> {
        if message.message_type() == MessageType::Answer {
            tracing::info!(
                agent = %agent.id(),
                from = %message.sender_id(),
                "Question agent received answer: {}",
                message.content()
            );
        } else {
            tracing::debug!(
                agent = %agent.id(),
                kind = %message.message_type(),
                "Ignoring message"
            );
        }
        Ok(None)
    }
}

/// Answers questions and replies to whoever asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnswerRole;

impl AnswerRole {
    pub fn prompt(question: &str) -> String {
        format!("Please answer this question: {}", question)
    }

    pub async fn generate_answer(&self, agent: &Agent, question: &str) -> Result<String> {
        let answer = agent.generate(&Self::prompt(question)).await?;
        Ok(answer.trim().to_string())
    }

    /// Only `question` messages get a reply; anything else is ignored.
    async fn handle(&self, agent: &Agent, message: &Message) -> Result<Option<Message>> {
        if message.message_type() != MessageType::Question {
            tracing::debug!(
                agent = %agent.id(),
                kind = %message.message_type(),
                "Ignoring message"
            );
            return Ok(None);
        }

        let answer = self.generate_answer(agent, message.content()).await?;
        let reply = agent.send(message.sender_id(), answer, MessageType::Answer)?;
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedGenerator;
    use std::sync::Arc;

    fn agent_with(role: Role, generator: Arc<ScriptedGenerator>) -> Agent {
        Agent::builder("agent")
            .role(role)
            .model("llama3.2")
            .generator(generator)
            .build()
            .unwrap()
    }

    #[test]
    fn test_prompts() {
        assert_eq!(
            QuestionRole::prompt("python programming"),
            "Generate a thought-provoking question about: python programming"
        );
        assert_eq!(
            AnswerRole::prompt("Why?"),
            "Please answer this question: Why?"
        );
    }

    #[tokio::test]
    async fn test_answer_role_ignores_general() {
        let generator = Arc::new(ScriptedGenerator::new().reply("Please", "unused"));
        let agent = agent_with(Role::answer(), generator.clone());
        let msg = Message::general("Q", "agent", "just saying hi").unwrap();

        assert!(agent.handle(&msg).await.unwrap().is_none());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_answer_role_replies_to_sender() {
        let generator = Arc::new(ScriptedGenerator::new().reply("Please answer", "  42  "));
        let agent = agent_with(Role::answer(), generator.clone());
        let msg = Message::new("Q", "agent", "Meaning of life?", MessageType::Question).unwrap();

        let reply = agent.handle(&msg).await.unwrap().unwrap();
        assert_eq!(reply.content(), "42");
        assert_eq!(reply.receiver_id(), "Q");
        assert_eq!(reply.message_type(), MessageType::Answer);
        assert_eq!(
            generator.prompts(),
            vec![(
                "Please answer this question: Meaning of life?".to_string(),
                "llama3.2".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_answer_role_surfaces_generation_error() {
        let generator = Arc::new(ScriptedGenerator::new().fail_on("Please"));
        let agent = agent_with(Role::answer(), generator);
        let msg = Message::new("Q", "agent", "?", MessageType::Question).unwrap();

        assert!(matches!(agent.handle(&msg).await, Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_question_role_is_terminal() {
        let generator = Arc::new(ScriptedGenerator::new());
        let agent = agent_with(Role::question(), generator.clone());

        let answer = Message::new("A", "agent", "42", MessageType::Answer).unwrap();
        assert!(agent.handle(&answer).await.unwrap().is_none());

        let question = Message::new("A", "agent", "?", MessageType::Question).unwrap();
        assert!(agent.handle(&question).await.unwrap().is_none());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_base_role_not_implemented() {
        let agent = agent_with(Role::Base, Arc::new(ScriptedGenerator::new()));
        let msg = Message::general("Q", "agent", "hi").unwrap();
        assert!(matches!(
            agent.handle(&msg).await,
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Base.name(), "base");
        assert_eq!(Role::question().name(), "question");
        assert_eq!(Role::answer().name(), "answer");
    }
}
