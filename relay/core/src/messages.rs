//! Conversation Messages
//!
//! The records a conversation is made of. A message is created either when a
//! user submits input or when a reply stream begins (as an empty placeholder),
//! and only its text and status change afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message identifier
///
/// Ordinals are drawn from a process-wide counter, so ids are unique and
/// increase in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg_{}", self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// User input
    User,
    /// Reply from the inference backend
    Bot,
}

/// Lifecycle of a message's text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Text is final
    #[default]
    Complete,
    /// A reply stream is still writing into this message
    Streaming,
    /// The reply stream failed or was cancelled
    Failed,
}

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    sender: Sender,
    /// Message content
    pub text: String,
    /// Whether the text is still being written
    pub status: MessageStatus,
}

impl Message {
    /// Create a complete message from the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::User,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    /// Create a complete message from the bot
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Bot,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    /// Create an empty bot message that a reply stream will fill in
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Bot,
            text: String::new(),
            status: MessageStatus::Streaming,
        }
    }

    /// Unique message ID
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Who sent this message
    #[must_use]
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Check if a reply stream is still writing into this message
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}
