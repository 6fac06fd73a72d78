//! Agent Communication Protocol for Parley.
//!
//! This module defines the messaging primitives shared by every agent:
//! - Immutable messages with a type tag
//! - Bounded per-agent mailboxes with backpressure

pub mod mailbox;
pub mod message;
pub mod types;

pub use mailbox::{Mailbox, MailboxFull};
pub use message::{Message, MessageBuilder};
pub use types::MessageType;
