//! Text generation providers.

use std::sync::Arc;

pub mod ollama;
pub mod provider;
#[cfg(test)]
pub mod scripted;

pub use ollama::OllamaClient;
pub use provider::{GenerationError, Generator};

use crate::config::Settings;

/// Build the generation client described by the settings.
pub fn create_generator(settings: &Settings) -> Arc<dyn Generator> {
    Arc::new(OllamaClient::new(
        settings.ollama.base_url.clone(),
        settings.ollama.timeout(),
    ))
}
