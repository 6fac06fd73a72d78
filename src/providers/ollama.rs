//! Ollama HTTP generation client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::provider::{GenerationError, Generator, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn request(&self, prompt: &str, model: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest { model, prompt })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        assemble_response(&body)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Generator for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        tracing::debug!(model, prompt_len = prompt.len(), "Requesting generation");

        // Dropping the request future on timeout abandons the call along with
        // whatever fragments were read so far.
        match tokio::time::timeout(self.timeout, self.request(prompt, model)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Generation exceeded timeout of {:?}", self.timeout);
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

/// Concatenate the `response` fragments of a newline-delimited JSON body.
///
/// Blank lines and records without a string `response` field are skipped. A
/// line that is not JSON fails the whole body, as does a record carrying an
/// `error` field.
pub fn assemble_response(body: &str) -> Result<String> {
    let mut text = String::new();

    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Value =
            serde_json::from_str(line).map_err(|e| GenerationError::Malformed {
                line: index + 1,
                reason: e.to_string(),
            })?;

        if let Some(error) = record.get("error").and_then(Value::as_str) {
            return Err(GenerationError::Backend(error.to_string()));
        }

        if let Some(fragment) = record.get("response").and_then(Value::as_str) {
            text.push_str(fragment);
        }
    }

    Ok(text)
}
