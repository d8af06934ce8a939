//! Conversation State
//!
//! An ordered log of messages keyed by id. The log is append-only, except
//! that a message's text and status can be replaced in place by id lookup
//! while its reply stream is open.
//!
//! A conversation is owned by the surface that created it. Mutation goes
//! through `&mut self`, so at most one turn writes into it at a time.

use crate::messages::{Message, MessageId, MessageStatus};

/// Greeting shown at the top of a fresh chat
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// An ordered sequence of messages
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation that opens with the bot greeting
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.append(Message::bot(GREETING));
        conversation
    }

    /// Append a message at the end
    ///
    /// Appending an id that is already present is a programming error. Debug
    /// builds panic; release builds keep the existing record and drop the new
    /// one.
    pub fn append(&mut self, message: Message) -> MessageId {
        let id = message.id();
        if self.position(id).is_some() {
            if cfg!(debug_assertions) {
                panic!("duplicate message id {id}");
            }
            tracing::warn!(message_id = %id, "Ignoring append of duplicate message id");
            return id;
        }
        self.messages.push(message);
        id
    }

    /// Replace the text of the message with `id`
    ///
    /// Returns `false` without touching anything when no message matches,
    /// which is what happens to fragments arriving after the record is gone.
    pub fn update_text(&mut self, id: MessageId, text: &str) -> bool {
        match self.get_mut(id) {
            Some(msg) => {
                msg.text.clear();
                msg.text.push_str(text);
                true
            }
            None => {
                tracing::debug!(message_id = %id, "Dropping text update for unknown message");
                false
            }
        }
    }

    /// Set the status of the message with `id`
    pub fn set_status(&mut self, id: MessageId, status: MessageStatus) -> bool {
        match self.get_mut(id) {
            Some(msg) => {
                msg.status = status;
                true
            }
            None => false,
        }
    }

    /// All messages in insertion order
    #[must_use]
    pub fn get(&self) -> &[Message] {
        &self.messages
    }

    /// Get message by ID
    #[must_use]
    pub fn get_message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the conversation has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id() == id)
    }
}
