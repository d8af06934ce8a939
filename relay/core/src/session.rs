//! Stream Sessions
//!
//! One `StreamSession` exists per outstanding reply request. It owns the
//! accumulator for the reply text and knows which conversation record the
//! text belongs to, so fragment callbacks never need to capture mutable
//! state implicitly.

use crate::messages::MessageId;

/// How a stream session ended
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Stream is still open
    #[default]
    Open,
    /// Source signalled completion
    Completed,
    /// Request or transport failed
    Failed,
    /// Caller cancelled the stream
    Cancelled,
}

/// Per-request accumulator for a streaming reply
#[derive(Debug)]
pub struct StreamSession {
    /// Placeholder message the reply is written into
    message_id: MessageId,
    /// Text received so far
    accumulated: String,
    /// Fragments received so far
    fragments: u32,
    /// Completion/error flag
    outcome: StreamOutcome,
}

impl StreamSession {
    /// Start a session that writes into `message_id`
    #[must_use]
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            accumulated: String::new(),
            fragments: 0,
            outcome: StreamOutcome::Open,
        }
    }

    /// Destination message
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Append a fragment and return the text accumulated so far
    ///
    /// Fragments pushed after the session ended are ignored.
    pub fn push(&mut self, fragment: &str) -> &str {
        if self.outcome == StreamOutcome::Open {
            self.accumulated.push_str(fragment);
            self.fragments += 1;
        }
        &self.accumulated
    }

    /// Text accumulated so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.accumulated
    }

    /// Number of fragments received
    #[must_use]
    pub fn fragment_count(&self) -> u32 {
        self.fragments
    }

    /// Current outcome
    #[must_use]
    pub fn outcome(&self) -> StreamOutcome {
        self.outcome
    }

    /// Close the session; the first terminal outcome wins
    pub fn close(&mut self, outcome: StreamOutcome) {
        if self.outcome == StreamOutcome::Open {
            self.outcome = outcome;
        }
    }
}
