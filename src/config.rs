//! Configuration loading for Parley.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the Parley home directory (~/.parley).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".parley"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.parley/settings.json
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load settings from a file. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let settings = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        settings
    } else {
        tracing::debug!("No settings at {}, using defaults", path.display());
        Settings::default()
    };

    validate_settings(&settings)?;
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.ollama.base_url.trim().is_empty() {
        return Err(Error::Config("ollama.base_url must not be empty".to_string()));
    }
    if settings.ollama.timeout_seconds == 0 {
        return Err(Error::Config(
            "ollama.timeout_seconds must be greater than zero".to_string(),
        ));
    }
    if settings.agents.mailbox_capacity == 0 {
        return Err(Error::Config(
            "agents.mailbox_capacity must be greater than zero".to_string(),
        ));
    }
    if settings.agents.questioner_id == settings.agents.answerer_id {
        return Err(Error::Config(format!(
            "agents.questioner_id and agents.answerer_id are both '{}'",
            settings.agents.questioner_id
        )));
    }
    Ok(())
}

/// Load settings or return default if invalid.
pub fn load_settings_or_default() -> Settings {
    or_default(load_settings())
}

fn or_default(loaded: Result<Settings>) -> Settings {
    loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
        Settings::default()
    })
}

/// Generation backend configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    crate::providers::ollama::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Agent defaults.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    #[serde(default = "default_questioner_id")]
    pub questioner_id: String,
    #[serde(default = "default_answerer_id")]
    pub answerer_id: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            mailbox_capacity: default_mailbox_capacity(),
            questioner_id: default_questioner_id(),
            answerer_id: default_answerer_id(),
        }
    }
}

fn default_model() -> String {
    "mistral".to_string()
}

fn default_mailbox_capacity() -> usize {
    crate::protocol::mailbox::DEFAULT_CAPACITY
}

fn default_questioner_id() -> String {
    "questioner".to_string()
}

fn default_answerer_id() -> String {
    "answerer".to_string()
}

/// Persistence configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StoreConfig {
    /// SQLite database file; defaults to ~/.parley/parley.db
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_home_dir()?.join("parley.db")),
        }
    }
}

/// Parley settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub agents: AgentDefaults,

    #[serde(default)]
    pub store: StoreConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.ollama.base_url, "http://localhost:11434");
        assert_eq!(settings.ollama.timeout(), Duration::from_secs(30));
        assert_eq!(settings.agents.model, "mistral");
        assert_eq!(settings.agents.mailbox_capacity, 100);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"agents": {"model": "llama3.2", "mailbox_capacity": 4}}"#)
            .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.agents.model, "llama3.2");
        assert_eq!(settings.agents.mailbox_capacity, 4);
        assert_eq!(settings.agents.questioner_id, "questioner");
        assert_eq!(settings.ollama.timeout_seconds, 30);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"agents": {"mailbox_capacity": 0}}"#).unwrap();

        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_agent_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"agents": {"questioner_id": "same", "answerer_id": "same"}}"#,
        )
        .unwrap();

        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"ollama": {"timeout_seconds": 0}}"#).unwrap();

        let settings = or_default(load_settings_from(&path));
        assert_eq!(settings.ollama.timeout_seconds, 30);
        assert_eq!(settings.agents.mailbox_capacity, 100);
    }
}
