//! In-memory generator for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::provider::{GenerationError, Generator, Result};

/// Replies by prompt prefix and records every prompt it sees.
#[derive(Default)]
pub struct ScriptedGenerator {
    rules: Vec<(String, String)>,
    fail_on: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts starting with `prefix` with `reply`.
    pub fn reply(mut self, prefix: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((prefix.into(), reply.into()));
        self
    }

    /// Fail prompts containing `needle` with a backend error.
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `(prompt, model)` seen, in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(needle) = &self.fail_on {
            if prompt.contains(needle.as_str()) {
                return Err(GenerationError::Backend(format!("scripted failure: {}", needle)));
            }
        }

        Ok(self
            .rules
            .iter()
            .find(|(prefix, _)| prompt.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_default())
    }
}
