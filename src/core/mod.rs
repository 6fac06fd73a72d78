//! Core module - routing and conversation driving.
//!
//! This module wires agents together:
//! - Agent registry and message delivery
//! - Question/answer conversation driver

pub mod conversation;
pub mod routing;

pub use conversation::{Conversation, Exchange};
pub use routing::{Router, Serving, Undelivered};
