//! CLI commands for Parley using clap.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{load_settings_from, load_settings_or_default, Settings};
use crate::core::Conversation;
use crate::providers::create_generator;
use crate::store::{SqliteStore, Store};

/// Parley - question and answer agents over a local Ollama backend.
#[derive(Parser)]
#[command(name = "parley")]
#[command(version = "0.1.0")]
#[command(about = "Parley - agents that ask and answer", long_about = None)]
pub struct Commands {
    /// Settings file (defaults to ~/.parley/settings.json)
    #[arg(long, global = true, env = "PARLEY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log debug output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a question about a topic and have it answered
    Ask {
        /// Topic for the question
        topic: String,

        /// Model for both agents
        #[arg(long)]
        model: Option<String>,

        /// Generation backend URL
        #[arg(long, env = "PARLEY_BASE_URL")]
        base_url: Option<String>,

        /// Do not record the conversation
        #[arg(long)]
        no_store: bool,

        /// Print the exchange as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored messages for an agent, newest first
    History {
        agent_id: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List agents active recently
    Agents {
        #[arg(short, long, default_value_t = 60)]
        minutes: u32,
    },

    /// Delete stored messages older than a number of days
    Cleanup {
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },

    /// Print the effective settings
    Config,
}

impl Commands {
    pub async fn run(&self) -> Result<()> {
        let settings = self.load_settings()?;

        match &self.command {
            Command::Ask {
                topic,
                model,
                base_url,
                no_store,
                json,
            } => cmd_ask(settings, topic, model, base_url, *no_store, *json).await,
            Command::History { agent_id, limit } => cmd_history(&settings, agent_id, *limit),
            Command::Agents { minutes } => cmd_agents(&settings, *minutes),
            Command::Cleanup { days } => cmd_cleanup(&settings, *days),
            Command::Config => cmd_config(&settings),
        }
    }

    /// An explicit settings file must load; the default location falls
    /// back to built-in settings.
    fn load_settings(&self) -> Result<Settings> {
        let settings = match &self.settings {
            Some(path) => load_settings_from(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => load_settings_or_default(),
        };
        Ok(settings)
    }
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let path = settings.store.resolve_path()?;
    SqliteStore::open(&path).with_context(|| format!("opening store at {}", path.display()))
}

async fn cmd_ask(
    mut settings: Settings,
    topic: &str,
    model: &Option<String>,
    base_url: &Option<String>,
    no_store: bool,
    json: bool,
) -> Result<()> {
    if let Some(model) = model {
        settings.agents.model = model.clone();
    }
    if let Some(url) = base_url {
        settings.ollama.base_url = url.clone();
    }

    let store: Option<Arc<dyn Store>> = if no_store {
        None
    } else {
        Some(Arc::new(open_store(&settings)?))
    };

    let conversation = Conversation::from_settings(&settings, create_generator(&settings), store)?;
    let exchange = conversation.run(topic).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exchange)?);
    } else {
        println!("Question ({}):", exchange.question.sender_id());
        println!("  {}", exchange.question.content());
        println!();
        println!("Answer ({}):", exchange.answer.sender_id());
        println!("  {}", exchange.answer.content());
    }
    Ok(())
}

fn cmd_history(settings: &Settings, agent_id: &str, limit: usize) -> Result<()> {
    let store = open_store(settings)?;
    let messages = store.get_agent_messages(agent_id, limit)?;

    if messages.is_empty() {
        println!("No messages for {}", agent_id);
        return Ok(());
    }

    for msg in messages {
        let when = chrono::DateTime::from_timestamp_millis(msg.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| msg.timestamp.to_string());
        println!(
            "[{}] #{} {} -> {} ({}{}): {}",
            when,
            msg.id,
            msg.sender_id,
            msg.receiver_id,
            msg.message_type,
            if msg.processed { ", processed" } else { "" },
            msg.content
        );
    }
    Ok(())
}

fn cmd_agents(settings: &Settings, minutes: u32) -> Result<()> {
    let store = open_store(settings)?;
    let agents = store.get_active_agents(minutes)?;

    if agents.is_empty() {
        println!("No agents active in the last {} minutes", minutes);
        return Ok(());
    }

    for agent in agents {
        println!(
            "{} ({}, {}) last active {}",
            agent.agent_id,
            agent.agent_type,
            agent.model,
            chrono::DateTime::from_timestamp_millis(agent.last_active)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_cleanup(settings: &Settings, days: u32) -> Result<()> {
    let store = open_store(settings)?;
    let removed = store.cleanup_old_messages(days)?;
    println!("Removed {} messages older than {} days", removed, days);
    Ok(())
}

fn cmd_config(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Commands::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let args = Commands::parse_from(["parley", "ask", "rust lifetimes", "--model", "llama3.2"]);
        match args.command {
            Command::Ask { topic, model, no_store, .. } => {
                assert_eq!(topic, "rust lifetimes");
                assert_eq!(model.as_deref(), Some("llama3.2"));
                assert!(!no_store);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_history_defaults() {
        let args = Commands::parse_from(["parley", "history", "questioner"]);
        assert!(matches!(
            args.command,
            Command::History { ref agent_id, limit: 10 } if agent_id == "questioner"
        ));
    }
}
