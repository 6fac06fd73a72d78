//! Parley library root.

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod providers;
pub mod store;

pub use agent::{Agent, AgentBuilder, DrainReport, Role};
pub use config::{load_settings, Settings};
pub use core::{Conversation, Exchange, Router};
pub use error::{Error, Result};
pub use protocol::{Mailbox, Message, MessageType};
pub use providers::{GenerationError, Generator, OllamaClient};
pub use store::{SqliteStore, Store};
