//! Bounded agent mailboxes for inter-agent communication.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

use super::message::Message;

/// Default number of messages a mailbox holds.
pub const DEFAULT_CAPACITY: usize = 100;

/// Rejected enqueue. Carries the message back so the caller can retry it.
#[derive(Error, Debug)]
#[error("mailbox full (capacity {capacity})")]
pub struct MailboxFull {
    pub capacity: usize,
    pub message: Box<Message>,
}

/// A fixed-capacity FIFO of messages owned by one agent.
///
/// All state sits behind one lock so the length check and the push are a
/// single step: when producers race for the last slot exactly one wins.
#[derive(Debug)]
pub struct Mailbox {
    capacity: usize,
    items: Mutex<VecDeque<Message>>,
    arrivals: Notify,
}

impl Mailbox {
    /// Create a mailbox. Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            arrivals: Notify::new(),
        })
    }

    /// Append to the tail, or fail without touching the queue. Never blocks.
    pub(crate) fn try_enqueue(&self, message: Message) -> Result<(), MailboxFull> {
        {
            let mut items = self.lock();
            if items.len() >= self.capacity {
                return Err(MailboxFull {
                    capacity: self.capacity,
                    message: Box::new(message),
                });
            }
            items.push_back(message);
        }
        self.arrivals.notify_one();
        Ok(())
    }

    /// Remove and return the head, if any. Never blocks.
    pub(crate) fn dequeue(&self) -> Option<Message> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resolves after the next successful enqueue (or immediately if one
    /// happened since the last wait).
    pub async fn arrival(&self) {
        self.arrivals.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
