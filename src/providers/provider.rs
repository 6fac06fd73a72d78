//! Text generation trait for Parley.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

/// A text-generation backend.
///
/// Implementations must be safe to share across agents; every call is
/// independent and carries no state from earlier calls.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Generate text for `prompt` with `model`, returning the whole output.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String>;
}
